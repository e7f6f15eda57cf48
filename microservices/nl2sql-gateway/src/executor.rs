//! Gate-then-run query execution

use std::sync::Arc;
use tabula_core::{ApprovedSql, ResultSet, Result};
use tabula_sqldb::Database;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct QueryExecutor {
    db: Arc<dyn Database>,
}

impl QueryExecutor {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Approve `sql` at the security gate, then fetch every row.
    ///
    /// A rejected statement never reaches the database.
    #[instrument(skip(self), fields(sql_len = sql.len()))]
    pub async fn execute(&self, sql: &str) -> Result<ResultSet> {
        let approved = ApprovedSql::approve(sql)?;
        let result = self.db.fetch(&approved).await?;
        info!(rows = result.row_count(), columns = result.column_count(), "Query executed");
        Ok(result)
    }
}
