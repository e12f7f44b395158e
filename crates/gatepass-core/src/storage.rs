//! Persistent storage for visitor passes.
//!
//! The issuer and the scan processor only see the [`PassStore`] trait. Two
//! backends are provided:
//!
//! - [`MemoryPassStore`]: a process-local map, for tests and throwaway runs.
//! - [`JsonFilePassStore`]: the whole collection in one pretty-printed JSON
//!   file, rewritten atomically on every mutation.
//!
//! Both maintain `created_at`/`updated_at`, enforce `pass_id` uniqueness and
//! implement [`PassStore::save`] as a compare-and-swap on the pass status.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;
use crate::pass::{NewVisitorPass, PassStatus, VisitorPass};

/// File name of the JSON collection inside the data directory.
pub const VISITORS_FILE: &str = "visitors.json";

/// Errors raised by pass stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another pass already carries this id.
    #[error("A pass with id '{0}' already exists")]
    DuplicatePassId(String),

    /// `save` was called for a record the store does not hold.
    #[error("No stored record {id} for pass '{pass_id}'")]
    UnknownRecord {
        /// Internal key that was looked up.
        id: Uuid,
        /// Pass id carried by the rejected record.
        pass_id: String,
    },

    /// The stored status changed since the caller read the record.
    #[error("Pass '{pass_id}' is {actual}, expected {expected}")]
    StatusMismatch {
        /// Pass being saved.
        pass_id: String,
        /// Status the caller observed.
        expected: PassStatus,
        /// Status currently stored.
        actual: PassStatus,
    },

    /// The collection file could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    ReadError {
        /// Path to the collection file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The collection file could not be written.
    #[error("Failed to write {}: {source}", .path.display())]
    WriteError {
        /// Path being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The collection file is not valid JSON.
    #[error("Failed to parse {}: {source}", .path.display())]
    ParseError {
        /// Path to the collection file.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Loaded records repeat a pass id or an internal id.
    #[error("{origin} holds more than one record for {key}")]
    DuplicateRecord {
        /// Where the records came from.
        origin: String,
        /// The repeated pass id or internal id.
        key: String,
    },

    /// The collection could not be serialized.
    #[error("Failed to serialize passes: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// The data directory could not be created.
    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDirError {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Record store collaborator used by the issuer and the scan processor.
#[async_trait]
pub trait PassStore: Send + Sync {
    /// Insert a new pass, assigning its id, timestamps and initial state.
    ///
    /// Fails with [`StoreError::DuplicatePassId`] if the pass id is taken.
    async fn create(&self, pass: NewVisitorPass) -> StoreResult<VisitorPass>;

    /// Fetch a pass by its human-facing id.
    async fn find_by_pass_id(&self, pass_id: &str) -> StoreResult<Option<VisitorPass>>;

    /// All passes, newest `created_at` first.
    async fn list_newest_first(&self) -> StoreResult<Vec<VisitorPass>>;

    /// Replace a stored pass, keyed by its internal id.
    ///
    /// The write only happens if the stored status still equals `expected`;
    /// otherwise [`StoreError::StatusMismatch`] is returned and nothing
    /// changes. `pass_id` and `created_at` are never overwritten. Returns the
    /// record as stored, with a fresh `updated_at`.
    async fn save(&self, pass: VisitorPass, expected: PassStatus) -> StoreResult<VisitorPass>;

    /// Short backend name for health reporting.
    fn backend_name(&self) -> &'static str;
}

/// Read every pass, newest first, converting store failures.
pub async fn list_all(store: &dyn PassStore) -> Result<Vec<VisitorPass>> {
    Ok(store.list_newest_first().await?)
}

/// Open the store selected by `config`.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn PassStore>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryPassStore::new())),
        StorageBackend::Json => {
            Ok(Arc::new(JsonFilePassStore::open(config.effective_data_dir()).await?))
        }
    }
}

/// Get the default data directory.
///
/// On Linux: `/var/lib/gatepass/`
/// Elsewhere: the platform data directory for `gatepass`.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/var/lib/gatepass")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "gatepass")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("./data"))
    }
}

// ============================================================================
// Shared collection logic
// ============================================================================

/// Passes keyed by internal id, with a unique index on pass id.
#[derive(Debug, Clone, Default)]
struct PassCollection {
    by_id: HashMap<Uuid, VisitorPass>,
    by_pass_id: HashMap<String, Uuid>,
}

impl PassCollection {
    /// Build the indexes, refusing records that repeat either key.
    fn from_records(records: Vec<VisitorPass>, origin: &str) -> StoreResult<Self> {
        let mut collection = Self::default();
        for pass in records {
            let key = if collection.by_pass_id.contains_key(&pass.pass_id) {
                format!("pass id '{}'", pass.pass_id)
            } else if collection.by_id.contains_key(&pass.id) {
                format!("id {}", pass.id)
            } else {
                collection.by_pass_id.insert(pass.pass_id.clone(), pass.id);
                collection.by_id.insert(pass.id, pass);
                continue;
            };
            warn!(origin, %key, "Stored passes repeat a key");
            return Err(StoreError::DuplicateRecord {
                origin: origin.to_string(),
                key,
            });
        }
        Ok(collection)
    }

    fn insert(&mut self, new_pass: NewVisitorPass) -> StoreResult<VisitorPass> {
        if self.by_pass_id.contains_key(&new_pass.pass_id) {
            return Err(StoreError::DuplicatePassId(new_pass.pass_id));
        }
        let pass = new_pass.into_pass(Uuid::now_v7(), Utc::now());
        self.by_pass_id.insert(pass.pass_id.clone(), pass.id);
        self.by_id.insert(pass.id, pass.clone());
        Ok(pass)
    }

    fn find(&self, pass_id: &str) -> Option<VisitorPass> {
        self.by_pass_id
            .get(pass_id)
            .and_then(|id| self.by_id.get(id))
            .cloned()
    }

    fn newest_first(&self) -> Vec<VisitorPass> {
        let mut passes: Vec<VisitorPass> = self.by_id.values().cloned().collect();
        passes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        passes
    }

    fn replace(&mut self, mut pass: VisitorPass, expected: PassStatus) -> StoreResult<VisitorPass> {
        let Some(stored) = self.by_id.get_mut(&pass.id) else {
            return Err(StoreError::UnknownRecord {
                id: pass.id,
                pass_id: pass.pass_id,
            });
        };
        if stored.status() != expected {
            return Err(StoreError::StatusMismatch {
                pass_id: stored.pass_id.clone(),
                expected,
                actual: stored.status(),
            });
        }
        pass.pass_id.clone_from(&stored.pass_id);
        pass.created_at = stored.created_at;
        pass.updated_at = Utc::now();
        *stored = pass.clone();
        Ok(pass)
    }

    fn to_records(&self) -> Vec<VisitorPass> {
        let mut records: Vec<VisitorPass> = self.by_id.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        records
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Process-local store. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryPassStore {
    inner: RwLock<PassCollection>,
}

impl MemoryPassStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `records`.
    ///
    /// Fails with [`StoreError::DuplicateRecord`] if two records share a
    /// pass id or an internal id.
    pub fn with_records(records: Vec<VisitorPass>) -> StoreResult<Self> {
        Ok(Self {
            inner: RwLock::new(PassCollection::from_records(records, "memory store")?),
        })
    }
}

#[async_trait]
impl PassStore for MemoryPassStore {
    async fn create(&self, pass: NewVisitorPass) -> StoreResult<VisitorPass> {
        self.inner.write().await.insert(pass)
    }

    async fn find_by_pass_id(&self, pass_id: &str) -> StoreResult<Option<VisitorPass>> {
        Ok(self.inner.read().await.find(pass_id))
    }

    async fn list_newest_first(&self) -> StoreResult<Vec<VisitorPass>> {
        Ok(self.inner.read().await.newest_first())
    }

    async fn save(&self, pass: VisitorPass, expected: PassStatus) -> StoreResult<VisitorPass> {
        self.inner.write().await.replace(pass, expected)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

// ============================================================================
// JSON file backend
// ============================================================================

/// Store backed by a single JSON file.
///
/// The file is loaded once at open. Each mutation is applied to a copy of the
/// collection, written to `<file>.tmp` and renamed over the original; the
/// in-memory view only changes once the rename succeeds.
#[derive(Debug)]
pub struct JsonFilePassStore {
    path: PathBuf,
    inner: Mutex<PassCollection>,
}

impl JsonFilePassStore {
    /// Open (or create) the collection in `data_dir`.
    ///
    /// A file that is not valid JSON, or that repeats a pass id or internal
    /// id, is refused and left as it is.
    pub async fn open(data_dir: PathBuf) -> StoreResult<Self> {
        tokio::fs::create_dir_all(&data_dir)
            .await
            .map_err(|source| StoreError::CreateDirError {
                path: data_dir.clone(),
                source,
            })?;

        let path = data_dir.join(VISITORS_FILE);
        let collection = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => PassCollection::default(),
            Ok(content) => {
                let records: Vec<VisitorPass> = serde_json::from_str(&content)
                    .map_err(|source| StoreError::ParseError {
                        path: path.clone(),
                        source,
                    })?;
                PassCollection::from_records(records, &path.display().to_string())?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PassCollection::default(),
            Err(source) => return Err(StoreError::ReadError { path, source }),
        };

        debug!(path = %path.display(), passes = collection.by_id.len(), "Opened JSON pass store");

        Ok(Self {
            path,
            inner: Mutex::new(collection),
        })
    }

    /// Path of the collection file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, collection: &PassCollection) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(&collection.to_records())?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|source| StoreError::WriteError {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| StoreError::WriteError {
                path: self.path.clone(),
                source,
            })
    }

    async fn mutate<F>(&self, apply: F) -> StoreResult<VisitorPass>
    where
        F: FnOnce(&mut PassCollection) -> StoreResult<VisitorPass> + Send,
    {
        let mut guard = self.inner.lock().await;
        let mut next = guard.clone();
        let pass = apply(&mut next)?;
        self.persist(&next).await?;
        *guard = next;
        Ok(pass)
    }
}

#[async_trait]
impl PassStore for JsonFilePassStore {
    async fn create(&self, pass: NewVisitorPass) -> StoreResult<VisitorPass> {
        self.mutate(move |collection| collection.insert(pass)).await
    }

    async fn find_by_pass_id(&self, pass_id: &str) -> StoreResult<Option<VisitorPass>> {
        Ok(self.inner.lock().await.find(pass_id))
    }

    async fn list_newest_first(&self) -> StoreResult<Vec<VisitorPass>> {
        Ok(self.inner.lock().await.newest_first())
    }

    async fn save(&self, pass: VisitorPass, expected: PassStatus) -> StoreResult<VisitorPass> {
        self.mutate(move |collection| collection.replace(pass, expected))
            .await
    }

    fn backend_name(&self) -> &'static str {
        "json"
    }
}
