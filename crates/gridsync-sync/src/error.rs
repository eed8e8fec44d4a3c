use gridsync_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("register to object {object_id} failed: {reason}")]
    Register { object_id: String, reason: String },

    #[error("baseline fetch failed: {0}")]
    Fetch(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("connection ended: {0}")]
    Disconnected(String),

    #[error("not registered to an object")]
    NotRegistered,

    #[error("unknown object: {0}")]
    UnknownObject(String),

    #[error("decode error: {0}")]
    Decode(#[from] TypeError),
}

impl SyncError {
    /// Whether the session should go back to connecting and try again.
    ///
    /// Every collaborator failure is recoverable; a decode error only ever
    /// concerns a single update and is dropped where it happens.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Decode(_))
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
