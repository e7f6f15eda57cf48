//! Database capability used by the gateway

use async_trait::async_trait;
use std::time::Duration;
use tabula_core::{ApprovedSql, ColumnDescriptor, KeyRole, ResultSet};
use tracing::{debug, instrument};

use crate::coerce::row_values;
use crate::introspect::{DESCRIBE_TABLE_SQL, LIST_TABLES_SQL, PING_SQL};
use crate::{Result, SqlDbError, SqlDbPool};

/// What the query pipeline needs from a database.
///
/// `fetch` only accepts [`ApprovedSql`], so statements reach the database
/// through the security guard or not at all.
#[async_trait]
pub trait Database: Send + Sync {
    /// Connection test
    async fn ping(&self) -> Result<()>;

    /// Table names in a stable order
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Columns of one table in declaration order
    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnDescriptor>>;

    /// Run an approved SELECT and materialize every row
    async fn fetch(&self, sql: &ApprovedSql) -> Result<ResultSet>;
}

/// PostgreSQL implementation over the shared pool
#[derive(Clone)]
pub struct PgDatabase {
    pool: SqlDbPool,
    schema: String,
    query_timeout: Option<Duration>,
}

impl PgDatabase {
    pub fn new(pool: SqlDbPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
            query_timeout: None,
        }
    }

    /// Bound each `fetch` round trip. Unbounded when never set.
    pub fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn pool(&self) -> &SqlDbPool {
        &self.pool
    }

    async fn fetch_inner(&self, sql: &str) -> Result<ResultSet> {
        let conn = self.pool.get().await?;
        let statement = conn.prepare(sql).await.map_err(SqlDbError::from_driver)?;
        let columns = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let rows = conn
            .query(&statement, &[])
            .await
            .map_err(SqlDbError::from_driver)?;

        Ok(ResultSet::new(columns, rows.iter().map(row_values).collect()))
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn ping(&self) -> Result<()> {
        let conn = self.pool.get().await?;
        conn.simple_query(PING_SQL)
            .await
            .map_err(|e| SqlDbError::Connection(e.to_string()))?;
        Ok(())
    }

    #[instrument(skip(self), fields(schema = %self.schema))]
    async fn list_tables(&self) -> Result<Vec<String>> {
        let conn = self.pool.get().await?;
        let rows = conn
            .query(LIST_TABLES_SQL, &[&self.schema])
            .await
            .map_err(SqlDbError::from_driver)?;

        rows.iter()
            .map(|row| row.try_get::<_, String>(0).map_err(SqlDbError::from_driver))
            .collect()
    }

    #[instrument(skip(self), fields(schema = %self.schema))]
    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let conn = self.pool.get().await?;
        let rows = conn
            .query(DESCRIBE_TABLE_SQL, &[&self.schema, &table])
            .await
            .map_err(SqlDbError::from_driver)?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.try_get(0).map_err(SqlDbError::from_driver)?;
            let declared_type: String = row.try_get(1).map_err(SqlDbError::from_driver)?;
            let key: String = row.try_get(2).map_err(SqlDbError::from_driver)?;
            columns.push(ColumnDescriptor::new(name, declared_type, KeyRole::from_key_flag(&key)));
        }

        debug!(table, columns = columns.len(), "Described table");
        Ok(columns)
    }

    #[instrument(skip(self, sql))]
    async fn fetch(&self, sql: &ApprovedSql) -> Result<ResultSet> {
        match self.query_timeout {
            Some(limit) => tokio::time::timeout(limit, self.fetch_inner(sql.as_str()))
                .await
                .map_err(|_| SqlDbError::Timeout(limit.as_secs()))?,
            None => self.fetch_inner(sql.as_str()).await,
        }
    }
}
