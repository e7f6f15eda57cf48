//! Database Error Types

use tabula_core::TabulaError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SqlDbError>;

#[derive(Debug, Error)]
pub enum SqlDbError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("{0}")]
    Query(String),

    #[error("Pool error: {0}")]
    Pool(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Query timed out after {0}s")]
    Timeout(u64),
}

impl SqlDbError {
    /// Classify a driver error, keeping the server's own message when there is one
    pub fn from_driver(err: tokio_postgres::Error) -> Self {
        if err.is_closed() {
            return Self::Connection(err.to_string());
        }
        match err.as_db_error() {
            Some(db) => Self::Query(db.message().to_string()),
            None => Self::Connection(err.to_string()),
        }
    }
}

impl From<SqlDbError> for TabulaError {
    fn from(err: SqlDbError) -> Self {
        match err {
            SqlDbError::Connection(msg) | SqlDbError::Pool(msg) => TabulaError::Connectivity(msg),
            SqlDbError::Query(msg) => TabulaError::Execution(msg),
            SqlDbError::Timeout(secs) => {
                TabulaError::Execution(format!("Query timed out after {}s", secs))
            }
            SqlDbError::Configuration(msg) => TabulaError::Config(msg),
        }
    }
}
