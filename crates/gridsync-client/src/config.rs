use std::path::Path;
use std::time::Duration;

use gridsync_sync::SessionConfig;
use gridsync_types::GridBounds;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Which color channels the mutator randomizes; the others stay 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMask {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
}

impl ChannelMask {
    pub const fn new(red: bool, green: bool, blue: bool) -> Self {
        Self { red, green, blue }
    }

    /// Short name for window titles and logs; the last kept channel wins.
    pub fn label(&self) -> &'static str {
        if self.blue {
            "blue"
        } else if self.green {
            "green"
        } else if self.red {
            "red"
        } else {
            ""
        }
    }
}

/// Startup configuration of one replica.
///
/// Parsed once, from TOML and/or command-line flags, and handed to the
/// client as plain values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// `host:port` of the collaboration server. Handed to network-backed
    /// transports; the in-process [`InMemoryHub`](gridsync_sync::InMemoryHub)
    /// ignores it and it is only reported in logs.
    pub host: String,
    pub object_id: String,
    pub log_level: String,
    /// Generate random local edits.
    pub send: bool,
    pub keep: ChannelMask,
    /// Local edits per second.
    pub rps: u32,
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// Rendered size of one cell.
    pub cell_size: u32,
    pub reconnect_delay_ms: u64,
    pub retry_base_ms: u64,
    pub retry_max_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1:50051".into(),
            object_id: "graphical".into(),
            log_level: "info".into(),
            send: false,
            keep: ChannelMask::default(),
            rps: 10,
            width: 10,
            height: 10,
            cell_size: 50,
            reconnect_delay_ms: 100,
            retry_base_ms: 250,
            retry_max_ms: 10_000,
        }
    }
}

impl ClientConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> ClientResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> ClientResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> ClientResult<()> {
        if self.object_id.is_empty() {
            return Err(ClientError::InvalidConfig("object_id must not be empty".into()));
        }
        if self.rps == 0 {
            return Err(ClientError::InvalidConfig("rps must be at least 1".into()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ClientError::InvalidConfig(format!(
                "grid must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    pub fn bounds(&self) -> GridBounds {
        GridBounds::new(self.width, self.height)
    }

    /// Period between two local edits.
    pub fn edit_interval(&self) -> Duration {
        Duration::from_secs(1) / self.rps.max(1)
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            retry_base: Duration::from_millis(self.retry_base_ms),
            retry_max: Duration::from_millis(self.retry_max_ms),
        }
    }
}
