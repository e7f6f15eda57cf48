//! Configuration management for microservices

use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub service_name: String,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self {
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| "unknown".to_string()),
        }
    }
}

/// Read an optional numeric environment variable, failing on unparsable values
pub fn env_parse<T>(key: &str, default: T) -> crate::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| crate::TabulaError::Config(format!("Invalid {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}
