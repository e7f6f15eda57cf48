//! Response cache for raw generator replies
//!
//! Entries are keyed by a digest of the question and the serialized schema,
//! so a schema change naturally misses. Expiry is lazy: stale entries stay
//! in the store and are simply ignored on read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::store::{StoreError, StoreResult};

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// One cached generator reply.
///
/// Serialized with the field names of the on-disk cache format; the digest
/// key is the file name and is not repeated in the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(skip)]
    pub digest_key: String,
    pub question: String,
    #[serde(rename = "schema_info")]
    pub schema_text: String,
    #[serde(rename = "response")]
    pub raw_response: String,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn load(&self, key: &str) -> StoreResult<Option<CacheEntry>>;

    /// Replace whatever is stored under `entry.digest_key`
    async fn store(&self, entry: CacheEntry) -> StoreResult<()>;
}

/// One JSON file per key under a cache directory
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn load(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        let raw = match tokio::fs::read(self.path_for(key)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut entry: CacheEntry = serde_json::from_slice(&raw)?;
        entry.digest_key = key.to_string();
        Ok(Some(entry))
    }

    async fn store(&self, entry: CacheEntry) -> StoreResult<()> {
        if entry.digest_key.is_empty() {
            return Err(StoreError::Corrupt("cache entry without a key".to_string()));
        }

        tokio::fs::create_dir_all(&self.dir).await?;

        // Readers only ever see a complete file: write aside, then rename over.
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", entry.digest_key, uuid::Uuid::new_v4()));
        let body = serde_json::to_vec(&entry)?;
        tokio::fs::write(&tmp, body).await?;

        if let Err(e) = tokio::fs::rename(&tmp, self.path_for(&entry.digest_key)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

/// Concurrent in-process store
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn load(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        Ok(self.entries.get(key).map(|e| e.value().clone()))
    }

    async fn store(&self, entry: CacheEntry) -> StoreResult<()> {
        self.entries.insert(entry.digest_key.clone(), entry);
        Ok(())
    }
}

pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// SHA-256 over `<byte length of question>:` + question + schema text, hex encoded
    pub fn key(question: &str, schema_text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(question.len().to_string().as_bytes());
        hasher.update(b":");
        hasher.update(question.as_bytes());
        hasher.update(schema_text.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Fresh cached reply for `key`, if any.
    ///
    /// A store failure is logged and reported as a miss.
    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Option<String> {
        self.get_at(key, Utc::now()).await
    }

    pub async fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<String> {
        let entry = match self.store.load(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        let fresh = match now.signed_duration_since(entry.created_at).to_std() {
            Ok(age) => age < self.ttl,
            // Written "in the future" by a skewed clock; still counts as fresh
            Err(_) => true,
        };

        if fresh {
            debug!("Cache hit");
            Some(entry.raw_response)
        } else {
            debug!("Cache entry expired");
            None
        }
    }

    #[instrument(skip(self, question, schema_text, raw_response))]
    pub async fn put(
        &self,
        key: &str,
        question: &str,
        schema_text: &str,
        raw_response: &str,
    ) -> StoreResult<()> {
        self.store
            .store(CacheEntry {
                digest_key: key.to_string(),
                question: question.to_string(),
                schema_text: schema_text.to_string(),
                raw_response: raw_response.to_string(),
                created_at: Utc::now(),
            })
            .await
    }
}
