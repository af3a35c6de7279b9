use thiserror::Error;

use super::StoreKey;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(String),
    #[error("Store serialization error: {0}")]
    Serialization(String),
    #[error("Append-only record cannot be rewritten: {0}")]
    AppendOnly(StoreKey),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}
