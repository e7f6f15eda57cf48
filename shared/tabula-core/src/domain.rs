//! Core domain types shared by the database layer and the gateway

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a column is a primary key, a foreign/indexed key, or neither
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyRole {
    None,
    Primary,
    ForeignOrIndexed,
}

impl KeyRole {
    /// Map the `PRI` / `MUL` key flags reported by catalog queries
    pub fn from_key_flag(flag: &str) -> Self {
        match flag.trim() {
            "PRI" => Self::Primary,
            "MUL" => Self::ForeignOrIndexed,
            _ => Self::None,
        }
    }
}

impl Default for KeyRole {
    fn default() -> Self {
        Self::None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub declared_type: String,
    pub key_role: KeyRole,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, key_role: KeyRole) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            key_role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn primary_key(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.key_role == KeyRole::Primary)
    }
}

/// Introspected tables in introspection order.
///
/// The catalog is built in one piece and swapped as a whole on reconnect;
/// there is no API for mutating a table once it is in the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    tables: Vec<TableDescriptor>,
}

impl SchemaCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a catalog, keeping the first descriptor seen for a repeated table name
    pub fn from_tables(tables: impl IntoIterator<Item = TableDescriptor>) -> Self {
        let mut out: Vec<TableDescriptor> = Vec::new();
        for table in tables {
            if !out.iter().any(|t| t.name == table.name) {
                out.push(table);
            }
        }
        Self { tables: out }
    }

    pub fn get(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Display-safe cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Null,
}

impl ScalarValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{}", v),
            Self::Null => write!(f, "NULL"),
        }
    }
}

impl From<Option<i64>> for ScalarValue {
    fn from(v: Option<i64>) -> Self {
        v.map(Self::Integer).unwrap_or(Self::Null)
    }
}

impl From<Option<f64>> for ScalarValue {
    fn from(v: Option<f64>) -> Self {
        v.map(Self::Float).unwrap_or(Self::Null)
    }
}

impl From<Option<String>> for ScalarValue {
    fn from(v: Option<String>) -> Self {
        v.map(Self::Text).unwrap_or(Self::Null)
    }
}

/// Fully materialized query result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<ScalarValue>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<ScalarValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column, top to bottom
    pub fn column(&self, name: &str) -> Option<Vec<&ScalarValue>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().filter_map(|row| row.get(idx)).collect())
    }

    /// First cell of the first row, as produced by `SELECT COUNT(*) ...`
    pub fn scalar(&self) -> Option<&ScalarValue> {
        self.rows.first().and_then(|row| row.first())
    }
}

/// One executed question, as kept by the history collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub question: String,
    pub sql: String,
    pub timestamp: String,
}

impl QueryRecord {
    pub const TIMESTAMP_FORMAT: &'static str = "%Y-%m-%d %H:%M";

    pub fn new(question: impl Into<String>, sql: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            question: question.into(),
            sql: sql.into(),
            timestamp: at.format(Self::TIMESTAMP_FORMAT).to_string(),
        }
    }
}
