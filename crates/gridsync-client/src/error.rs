use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sync error: {0}")]
    Sync(#[from] gridsync_sync::SyncError),
}

pub type ClientResult<T> = Result<T, ClientError>;
