//! In-memory collaborators for tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tabula_core::{
    ApprovedSql, ColumnDescriptor, KeyRole, ResultSet, ScalarValue, TableDescriptor,
};
use tabula_sqldb::{Database, SqlDbError};

use crate::client::{GeneratorError, TextGenerator};

/// Database double with a fixed catalog and canned results per statement
pub struct FakeDatabase {
    tables: Vec<TableDescriptor>,
    results: HashMap<String, ResultSet>,
    reachable: bool,
    executed: Mutex<Vec<String>>,
}

impl FakeDatabase {
    pub fn new(tables: Vec<TableDescriptor>) -> Self {
        Self {
            tables,
            results: HashMap::new(),
            reachable: true,
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::new(Vec::new())
        }
    }

    /// The classic sales schema used across the tests
    pub fn company() -> Self {
        let col = ColumnDescriptor::new;
        Self::new(vec![
            TableDescriptor::new(
                "customers",
                vec![
                    col("customerNumber", "integer", KeyRole::Primary),
                    col("customerName", "character varying(50)", KeyRole::None),
                    col("phone", "character varying(50)", KeyRole::None),
                    col("country", "character varying(50)", KeyRole::None),
                    col("salesRepEmployeeNumber", "integer", KeyRole::ForeignOrIndexed),
                    col("creditLimit", "numeric(10,2)", KeyRole::None),
                ],
            ),
            TableDescriptor::new(
                "employees",
                vec![
                    col("employeeNumber", "integer", KeyRole::Primary),
                    col("lastName", "character varying(50)", KeyRole::None),
                    col("firstName", "character varying(50)", KeyRole::None),
                    col("email", "character varying(100)", KeyRole::None),
                    col("officeCode", "character varying(10)", KeyRole::ForeignOrIndexed),
                    col("jobTitle", "character varying(50)", KeyRole::None),
                ],
            ),
            TableDescriptor::new(
                "offices",
                vec![
                    col("officeCode", "character varying(10)", KeyRole::Primary),
                    col("city", "character varying(50)", KeyRole::None),
                ],
            ),
            TableDescriptor::new(
                "orders",
                vec![
                    col("orderNumber", "integer", KeyRole::Primary),
                    col("orderDate", "date", KeyRole::None),
                    col("status", "character varying(15)", KeyRole::None),
                    col("customerNumber", "integer", KeyRole::ForeignOrIndexed),
                ],
            ),
            TableDescriptor::new(
                "products",
                vec![
                    col("productCode", "character varying(15)", KeyRole::Primary),
                    col("productName", "character varying(70)", KeyRole::None),
                    col("productLine", "character varying(50)", KeyRole::ForeignOrIndexed),
                    col("quantityInStock", "smallint", KeyRole::None),
                    col("buyPrice", "numeric(10,2)", KeyRole::None),
                ],
            ),
        ])
    }

    pub fn with_result(mut self, sql: &str, result: ResultSet) -> Self {
        self.results.insert(sql.to_string(), result);
        self
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    fn check_reachable(&self) -> tabula_sqldb::Result<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(SqlDbError::Connection("connection refused".to_string()))
        }
    }
}

#[async_trait]
impl Database for FakeDatabase {
    async fn ping(&self) -> tabula_sqldb::Result<()> {
        self.check_reachable()
    }

    async fn list_tables(&self) -> tabula_sqldb::Result<Vec<String>> {
        self.check_reachable()?;
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    async fn describe_table(&self, table: &str) -> tabula_sqldb::Result<Vec<ColumnDescriptor>> {
        self.check_reachable()?;
        self.tables
            .iter()
            .find(|t| t.name == table)
            .map(|t| t.columns.clone())
            .ok_or_else(|| SqlDbError::Query(format!("relation \"{}\" does not exist", table)))
    }

    async fn fetch(&self, sql: &ApprovedSql) -> tabula_sqldb::Result<ResultSet> {
        self.check_reachable()?;
        self.executed.lock().push(sql.as_str().to_string());
        self.results
            .get(sql.as_str())
            .cloned()
            .ok_or_else(|| SqlDbError::Query(format!("syntax error at or near \"{}\"", sql)))
    }
}

/// Generator double replaying one scripted reply
pub struct FakeGenerator {
    reply: Result<String, GeneratorError>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn replying(text: &str) -> Self {
        Self::scripted(Ok(text.to_string()))
    }

    pub fn failing(err: GeneratorError) -> Self {
        Self::scripted(Err(err))
    }

    fn scripted(reply: Result<String, GeneratorError>) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        self.reply.clone()
    }

    fn name(&self) -> &str {
        "fake"
    }
}

pub fn text(s: &str) -> ScalarValue {
    ScalarValue::Text(s.to_string())
}

pub fn int(v: i64) -> ScalarValue {
    ScalarValue::Integer(v)
}
