//! Error types for Tabula services

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TabulaError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TabulaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database connectivity error: {0}")]
    Connectivity(String),

    #[error("Text generator unavailable: {0}")]
    GeneratorUnavailable(String),

    #[error("Text generator returned no candidate text")]
    GeneratorEmpty,

    #[error("SECURITY_ERROR: {0}")]
    Security(String),

    #[error("Query execution failed: {0}")]
    Execution(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TabulaError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Security(_) => 403,
            Self::Execution(_) => 422,
            Self::Connectivity(_) | Self::GeneratorUnavailable(_) => 503,
            Self::GeneratorEmpty => 502,
            _ => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Connectivity(_) => "CONNECTIVITY_ERROR",
            Self::GeneratorUnavailable(_) => "GENERATOR_UNAVAILABLE",
            Self::GeneratorEmpty => "GENERATOR_EMPTY",
            Self::Security(_) => "SECURITY_ERROR",
            Self::Execution(_) => "EXECUTION_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Generator failures are recovered by the fallback path; everything else ends the request.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::GeneratorUnavailable(_) | Self::GeneratorEmpty)
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.error_code(),
            message: self.to_string(),
        }
    }
}

/// Serializable error payload returned to API callers
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl From<std::io::Error> for TabulaError {
    fn from(err: std::io::Error) -> Self {
        TabulaError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for TabulaError {
    fn from(err: serde_json::Error) -> Self {
        TabulaError::Storage(err.to_string())
    }
}
