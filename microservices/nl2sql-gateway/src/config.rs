//! Gateway Configuration

use std::path::PathBuf;
use std::time::Duration;

use tabula_core::config::env_parse;
use tabula_core::Result;
use tabula_sqldb::PoolConfig;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub http_bind: String,
    pub pool: PoolConfig,
    pub db_schema: String,
    /// Bound on each statement round trip; `None` leaves it unbounded
    pub query_timeout: Option<Duration>,
    /// Text generator settings; `None` when no API key is configured
    pub generator: Option<GeminiConfig>,
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
    pub history_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl GeminiConfig {
    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        let query_timeout_secs: u64 = env_parse("QUERY_TIMEOUT_SECS", 0)?;
        let cache_ttl_secs: u64 = env_parse("CACHE_TTL_SECS", 3600)?;

        let generator = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(|api_key| GeminiConfig {
                api_key,
                base_url: std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| {
                    "https://generativelanguage.googleapis.com/v1beta".to_string()
                }),
                model: std::env::var("GEMINI_MODEL")
                    .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            });

        Ok(Self {
            http_bind: std::env::var("HTTP_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            pool: PoolConfig::from_env()?,
            db_schema: std::env::var("DB_SCHEMA").unwrap_or_else(|_| "public".to_string()),
            query_timeout: (query_timeout_secs > 0).then(|| Duration::from_secs(query_timeout_secs)),
            generator,
            cache_dir: std::env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("response_cache")),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            history_path: std::env::var("HISTORY_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("query_history.jsonl")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_endpoint() {
        let config = GeminiConfig {
            api_key: "k".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/".to_string(),
            model: "gemini-2.0-flash".to_string(),
        };
        assert_eq!(
            config.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_invalid_numeric_env_is_a_config_error() {
        std::env::set_var("CACHE_TTL_SECS", "an hour");
        let err = GatewayConfig::from_env().unwrap_err();
        std::env::remove_var("CACHE_TTL_SECS");
        assert!(matches!(err, tabula_core::TabulaError::Config(ref m) if m.contains("CACHE_TTL_SECS")));
    }
}
