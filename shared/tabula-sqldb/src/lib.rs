//! Tabula SQL database access
//!
//! PostgreSQL wire-protocol access for the query gateway.
//! Provides connection pooling, catalog introspection, and SELECT execution
//! with display-safe value coercion.

mod coerce;
mod database;
mod error;
mod introspect;
mod pool;

pub use coerce::{row_values, CellKind};
pub use database::{Database, PgDatabase};
pub use error::{Result, SqlDbError};
pub use introspect::quote_ident;
pub use pool::{PoolConfig, PoolStats, SqlDbPool};

/// Re-export tokio-postgres types for convenience
pub use tokio_postgres::{types::Type, Row};
