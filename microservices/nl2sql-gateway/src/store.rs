//! Storage errors shared by the cache and history stores

use tabula_core::TabulaError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for TabulaError {
    fn from(err: StoreError) -> Self {
        TabulaError::Storage(err.to_string())
    }
}
