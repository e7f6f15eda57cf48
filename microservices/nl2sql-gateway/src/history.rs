//! Query history
//!
//! Every executed question is appended as a [`QueryRecord`]. Order is append
//! order; "recent" means the tail.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use tabula_core::QueryRecord;

use crate::store::StoreResult;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, record: &QueryRecord) -> StoreResult<()>;
    async fn load_all(&self) -> StoreResult<Vec<QueryRecord>>;
    async fn clear(&self) -> StoreResult<()>;
}

/// JSON-lines file, one record per line
pub struct FileHistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn append(&self, record: &QueryRecord) -> StoreResult<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn load_all(&self) -> StoreResult<Vec<QueryRecord>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (lineno, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<QueryRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(line = lineno + 1, error = %e, "Skipping malformed history line"),
            }
        }
        Ok(records)
    }

    async fn clear(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::write(&self.path, b"").await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Default)]
pub struct MemoryHistoryStore {
    records: RwLock<Vec<QueryRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, record: &QueryRecord) -> StoreResult<()> {
        self.records.write().push(record.clone());
        Ok(())
    }

    async fn load_all(&self) -> StoreResult<Vec<QueryRecord>> {
        Ok(self.records.read().clone())
    }

    async fn clear(&self) -> StoreResult<()> {
        self.records.write().clear();
        Ok(())
    }
}

pub struct QueryHistory {
    store: Arc<dyn HistoryStore>,
}

impl QueryHistory {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, sql))]
    pub async fn record(&self, question: &str, sql: &str) -> StoreResult<QueryRecord> {
        let record = QueryRecord::new(question, sql, Utc::now());
        self.store.append(&record).await?;
        Ok(record)
    }

    /// Last `n` records, oldest first
    pub async fn recent(&self, n: usize) -> StoreResult<Vec<QueryRecord>> {
        let mut all = self.store.load_all().await?;
        let skip = all.len().saturating_sub(n);
        Ok(all.split_off(skip))
    }

    pub async fn clear(&self) -> StoreResult<()> {
        self.store.clear().await?;
        info!("Query history cleared");
        Ok(())
    }
}
