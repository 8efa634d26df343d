//! Asset store facade
//!
//! Combines the index tree, the bounded lookup cache, and on-disk index
//! persistence. All tree and cache access is serialized behind one
//! async guard; the tree alone is not safe for concurrent structural
//! mutation, so every caller goes through this facade.
//!
//! Persistence runs synchronously after each mutation and rewrites the
//! whole index document (write-to-temp, then atomic rename). An I/O
//! failure during a checkpoint is logged and non-fatal: the in-memory
//! index keeps serving, and anything not yet persisted is lost on
//! restart. Operators must treat a persist warning as data at risk.

use crate::library::cache::BoundedCache;
use crate::library::record::{AssetMetadata, AssetRecord, HistoryEntry};
use crate::library::tree::IndexTree;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use wavecell_common::{time, Error, Result, Settings};

/// Aggregate store statistics
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub file_count: usize,
    pub total_size: u64,
    pub tree_height: u32,
    pub average_file_size: f64,
    pub cache_entries: usize,
    pub storage_dir: PathBuf,
    pub index_path: PathBuf,
}

/// Statistics block embedded in the index document
#[derive(Debug, Serialize)]
struct IndexStatistics {
    file_count: usize,
    total_size: u64,
    tree_height: u32,
    average_file_size: f64,
    cache_entries: usize,
}

/// On-disk index document: `{ files, statistics, last_updated }`
#[derive(Serialize)]
struct IndexDocument {
    files: Vec<AssetRecord>,
    statistics: IndexStatistics,
    last_updated: DateTime<Utc>,
}

/// Tree + cache guarded together: structural mutation of either is
/// only valid while holding the store lock
struct Inner {
    tree: IndexTree,
    cache: BoundedCache,
}

/// Queryable, persistent index of uploaded audio assets
///
/// Constructed once at process start and handed to whatever serves
/// requests; there is no module-level instance.
pub struct AssetStore {
    storage_dir: PathBuf,
    index_path: PathBuf,
    max_search_results: usize,
    inner: RwLock<Inner>,
}

impl AssetStore {
    /// Create the store, ensuring the storage directory exists and
    /// loading any index document found there
    pub fn new(settings: &Settings) -> Result<Self> {
        fs::create_dir_all(&settings.storage_dir)?;

        let index_path = settings.index_path();
        let mut tree = IndexTree::new();
        load_index(&index_path, &mut tree);

        info!(
            "Asset store initialized: storage={}, {} records indexed",
            settings.storage_dir.display(),
            tree.len()
        );

        Ok(Self {
            storage_dir: settings.storage_dir.clone(),
            index_path,
            max_search_results: settings.max_search_results,
            inner: RwLock::new(Inner {
                tree,
                cache: BoundedCache::new(settings.cache_capacity),
            }),
        })
    }

    /// Ingest an audio file that the upload handler already placed on disk
    ///
    /// Fails with [`Error::AssetNotFound`] when the source path does not
    /// exist. The identifier is a truncated hash of filename, size, and
    /// ingestion time. Returns a snapshot of the stored record.
    pub async fn add_asset(&self, path: impl AsRef<Path>, metadata: AssetMetadata) -> Result<AssetRecord> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::AssetNotFound(format!("File not found: {}", path.display())));
        }

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| Error::InvalidInput(format!("Not a file path: {}", path.display())))?;
        let file_size = fs::metadata(path)?.len();
        let file_id = generate_file_id(&filename, file_size);

        let record = AssetRecord::from_ingestion(
            file_id.clone(),
            filename.clone(),
            path.to_path_buf(),
            file_size,
            &metadata,
        );

        let mut inner = self.inner.write().await;
        inner.tree.insert(record);
        let handle = inner
            .tree
            .peek(&file_id)
            .ok_or_else(|| Error::Internal(format!("record {} vanished after insert", file_id)))?;
        inner.cache.insert(&file_id, &handle);
        self.persist(&inner);

        info!("Added audio file: {} - {}", file_id, filename);
        let snapshot = handle.read().unwrap().clone();
        Ok(snapshot)
    }

    /// Fetch a record by identifier
    ///
    /// A cache hit returns immediately and still counts as an access; a
    /// miss falls through to the tree and populates the cache.
    pub async fn get_asset(&self, file_id: &str) -> Option<AssetRecord> {
        let mut inner = self.inner.write().await;

        if let Some(handle) = inner.cache.get(file_id) {
            let mut record = handle.write().unwrap();
            record.touch();
            return Some(record.clone());
        }

        let handle = inner.tree.find(file_id)?;
        inner.cache.insert(file_id, &handle);
        let snapshot = handle.read().unwrap().clone();
        Some(snapshot)
    }

    /// Delete an asset: backing file, cache entry, tree node
    ///
    /// Returns whether anything was removed. A missing backing file is
    /// not an error; a failed file removal is logged and the index
    /// entry is removed regardless.
    pub async fn delete_asset(&self, file_id: &str) -> bool {
        let mut inner = self.inner.write().await;

        let file_path = match inner.tree.peek(file_id) {
            Some(handle) => handle.read().unwrap().file_path.clone(),
            None => return false,
        };

        if file_path.exists() {
            if let Err(e) = fs::remove_file(&file_path) {
                warn!("Could not remove backing file {}: {}", file_path.display(), e);
            }
        }

        inner.cache.remove(file_id);
        let removed = inner.tree.remove(file_id);
        if removed {
            self.persist(&inner);
            info!("Deleted audio file: {}", file_id);
        }
        removed
    }

    /// Append a processing-history entry to a record
    ///
    /// Returns whether the record was found. Finding it counts as an
    /// access, like any other lookup.
    pub async fn update_history(
        &self,
        file_id: &str,
        effect: &str,
        parameters: Value,
        result: Value,
    ) -> bool {
        let inner = self.inner.write().await;

        let Some(handle) = inner.tree.find(file_id) else {
            return false;
        };
        handle.write().unwrap().processing_history.push(HistoryEntry {
            timestamp: time::now(),
            effect: effect.to_string(),
            parameters,
            result,
        });
        self.persist(&inner);
        true
    }

    /// Search by filename substring and/or tag intersection
    ///
    /// A record matches when `query` is empty or a case-insensitive
    /// substring of its filename, and no tags were given or at least
    /// one intersects the record's tag set. The scan is linear over the
    /// in-order sequence and stops once `limit` matches are collected
    /// (clamped to the configured ceiling).
    pub async fn search(&self, query: &str, tags: &[String], limit: usize) -> Vec<AssetRecord> {
        let limit = limit.min(self.max_search_results);
        let query = query.to_lowercase();
        let inner = self.inner.read().await;

        let mut results = Vec::new();
        for handle in inner.tree.in_order() {
            if results.len() >= limit {
                break;
            }
            let record = handle.read().unwrap();
            if !query.is_empty() && !record.filename.to_lowercase().contains(&query) {
                continue;
            }
            if !tags.is_empty() && !tags.iter().any(|tag| record.tags.contains(tag)) {
                continue;
            }
            results.push(record.clone());
        }
        results
    }

    /// Most-accessed records, descending by access count
    pub async fn popular(&self, limit: usize) -> Vec<AssetRecord> {
        let mut records = self.all_records().await;
        records.sort_by(|a, b| b.access_count.cmp(&a.access_count));
        records.truncate(limit);
        records
    }

    /// Most recently uploaded records, descending by upload time
    pub async fn recent(&self, limit: usize) -> Vec<AssetRecord> {
        let mut records = self.all_records().await;
        records.sort_by(|a, b| b.upload_time.cmp(&a.upload_time));
        records.truncate(limit);
        records
    }

    /// Aggregate statistics over tree, cache, and storage paths
    pub async fn statistics(&self) -> StoreStats {
        let inner = self.inner.read().await;
        let tree = inner.tree.statistics();
        StoreStats {
            file_count: tree.file_count,
            total_size: tree.total_size,
            tree_height: tree.tree_height,
            average_file_size: tree.average_file_size,
            cache_entries: inner.cache.len(),
            storage_dir: self.storage_dir.clone(),
            index_path: self.index_path.clone(),
        }
    }

    /// Directory holding uploaded files and the index document
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Path of the on-disk index document
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    async fn all_records(&self) -> Vec<AssetRecord> {
        let inner = self.inner.read().await;
        inner
            .tree
            .in_order()
            .iter()
            .map(|handle| handle.read().unwrap().clone())
            .collect()
    }

    /// Checkpoint the full index; failure is logged, never propagated
    fn persist(&self, inner: &Inner) {
        if let Err(e) = self.write_index(inner) {
            warn!(
                "Failed to persist index {} (in-memory index still serves, unsaved changes are lost on restart): {}",
                self.index_path.display(),
                e
            );
        }
    }

    /// Serialize every record plus statistics and overwrite the index
    /// document wholesale, via temp file + rename so a crash mid-write
    /// cannot corrupt the previous checkpoint
    fn write_index(&self, inner: &Inner) -> Result<()> {
        let files: Vec<AssetRecord> = inner
            .tree
            .in_order()
            .iter()
            .map(|handle| handle.read().unwrap().clone())
            .collect();
        let tree = inner.tree.statistics();
        let document = IndexDocument {
            statistics: IndexStatistics {
                file_count: tree.file_count,
                total_size: tree.total_size,
                tree_height: tree.tree_height,
                average_file_size: tree.average_file_size,
                cache_entries: inner.cache.len(),
            },
            last_updated: time::now(),
            files,
        };

        let json = serde_json::to_string_pretty(&document)
            .map_err(|e| Error::Persistence(e.to_string()))?;
        let tmp = self.index_path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.index_path)?;

        debug!("Saved index with {} files", document.files.len());
        Ok(())
    }
}

/// Rebuild the tree from the index document, if one exists
///
/// Individually malformed entries are skipped with a warning; an
/// unreadable or unparseable document logs and leaves the tree empty.
/// Startup never fails because of index content.
fn load_index(path: &Path, tree: &mut IndexTree) {
    if !path.exists() {
        debug!("No index document at {}, starting empty", path.display());
        return;
    }

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!("Cannot read index {}: {}", path.display(), e);
            return;
        }
    };
    let document: Value = match serde_json::from_str(&contents) {
        Ok(value) => value,
        Err(e) => {
            warn!("Index {} is not valid JSON: {}", path.display(), e);
            return;
        }
    };
    let Some(files) = document.get("files").and_then(Value::as_array) else {
        warn!("Index {} has no files array", path.display());
        return;
    };

    let mut loaded = 0usize;
    for entry in files {
        match serde_json::from_value::<AssetRecord>(entry.clone()) {
            Ok(record) => {
                tree.insert(record);
                loaded += 1;
            }
            Err(e) => warn!("Skipping malformed index entry: {}", e),
        }
    }
    info!("Loaded {} audio files from index", loaded);
}

/// Derive a unique identifier from filename, size, and the current
/// time: first 16 hex characters of a SHA-256 digest
fn generate_file_id(filename: &str, file_size: u64) -> String {
    let seed = format!("{}_{}_{}", filename, file_size, time::now().to_rfc3339());
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_file_id_shape() {
        let id = generate_file_id("kick.wav", 1024);
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_file_id_differs_per_file() {
        let a = generate_file_id("kick.wav", 1024);
        let b = generate_file_id("snare.wav", 1024);
        assert_ne!(a, b);
    }
}
