use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// A property key is not of the form `"<x>-<y>"`.
    #[error("malformed property key: {0:?}")]
    MalformedKey(String),

    /// A cell payload does not have exactly four bytes.
    #[error("invalid cell length: expected {expected}, got {actual}")]
    InvalidCellLength { expected: usize, actual: usize },
}
