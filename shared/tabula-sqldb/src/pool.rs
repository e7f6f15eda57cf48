//! Connection Pool

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tabula_core::config::env_parse;
use tokio_postgres::NoTls;
use tracing::{debug, info};

use crate::{Result, SqlDbError};

/// Pool configuration.
///
/// `url` wins when set; otherwise the connection is assembled from the
/// individual host/port/user/password/database fields.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            database: "company_db".to_string(),
            max_size: 16,
        }
    }
}

impl PoolConfig {
    /// Invalid `DB_PORT` or `DB_POOL_SIZE` values are configuration errors
    pub fn from_env() -> tabula_core::Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            host: std::env::var("DB_HOST").unwrap_or(defaults.host),
            port: env_parse("DB_PORT", defaults.port)?,
            user: std::env::var("DB_USER").unwrap_or(defaults.user),
            password: std::env::var("DB_PASSWORD").unwrap_or(defaults.password),
            database: std::env::var("DB_NAME").unwrap_or(defaults.database),
            max_size: env_parse("DB_POOL_SIZE", defaults.max_size)?,
        })
    }

    pub fn pg_config(&self) -> Result<tokio_postgres::Config> {
        if let Some(url) = &self.url {
            return url
                .parse()
                .map_err(|e| SqlDbError::Configuration(format!("Invalid URL: {}", e)));
        }

        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .user(&self.user)
            .dbname(&self.database);
        if !self.password.is_empty() {
            config.password(&self.password);
        }
        Ok(config)
    }
}

/// PostgreSQL connection pool
#[derive(Clone)]
pub struct SqlDbPool {
    pool: Pool,
}

impl SqlDbPool {
    /// Create a new connection pool. Connections are opened lazily.
    pub fn new(config: &PoolConfig) -> Result<Self> {
        info!(
            max_size = config.max_size,
            host = %config.host,
            database = %config.database,
            "Creating database connection pool"
        );

        let pg_config = config.pg_config()?;

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let manager = Manager::from_config(pg_config, NoTls, manager_config);

        let pool = Pool::builder(manager)
            .max_size(config.max_size)
            .build()
            .map_err(|e| SqlDbError::Pool(e.to_string()))?;

        debug!("Database pool created successfully");

        Ok(Self { pool })
    }

    /// Get a connection from the pool
    pub async fn get(&self) -> Result<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| SqlDbError::Pool(e.to_string()))
    }

    /// Check pool health
    pub async fn is_healthy(&self) -> bool {
        match self.pool.get().await {
            Ok(conn) => conn.simple_query("SELECT 1").await.is_ok(),
            Err(_) => false,
        }
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        let status = self.pool.status();
        PoolStats {
            size: status.size,
            available: status.available as usize,
            waiting: status.waiting,
        }
    }
}

/// Pool statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolStats {
    pub size: usize,
    pub available: usize,
    pub waiting: usize,
}
