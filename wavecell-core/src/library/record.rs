//! Asset record types
//!
//! [`AssetRecord`] is the tree node payload and the unit of the on-disk
//! index document. Every field carries a serde default so that a
//! partially-populated index entry loads with substitution defaults
//! instead of failing the whole document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use wavecell_common::time;

/// One entry in a record's processing history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryEntry {
    /// When the effect was applied
    pub timestamp: DateTime<Utc>,

    /// Effect name (reverb, filter, ...)
    pub effect: String,

    /// Effect parameters as supplied by the caller
    pub parameters: Value,

    /// Processing outcome report
    pub result: Value,
}

impl Default for HistoryEntry {
    fn default() -> Self {
        Self {
            timestamp: time::now(),
            effect: String::new(),
            parameters: Value::Null,
            result: Value::Null,
        }
    }
}

/// Metadata supplied by the upload handler on ingestion
///
/// Missing fields take the ingestion defaults; unrecognized keys are
/// preserved in `extra` and carried into the record's free-form
/// metadata map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetMetadata {
    /// Audio duration in seconds
    pub duration: f64,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Channel count
    pub channels: u16,

    /// Bits per sample
    pub bit_depth: u16,

    /// Container/format tag ("wav", "flac", ...)
    pub format: String,

    /// Free-form tag set
    pub tags: Vec<String>,

    /// Any additional metadata keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for AssetMetadata {
    fn default() -> Self {
        Self {
            duration: 0.0,
            sample_rate: 44_100,
            channels: 2,
            bit_depth: 16,
            format: "wav".to_string(),
            tags: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl AssetMetadata {
    /// Render the full metadata as the record's free-form map
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// Indexed audio asset
///
/// Owned exclusively by the index tree; the lookup cache holds weak
/// back-references only. Serializes one-for-one into the `files` array
/// of the index document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetRecord {
    /// Unique identifier (truncated content hash), the tree sort key
    pub file_id: String,

    /// Original filename
    pub filename: String,

    /// Storage path of the backing file
    pub file_path: PathBuf,

    /// Size of the backing file in bytes
    pub file_size: u64,

    /// Audio duration in seconds
    pub duration: f64,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Channel count
    pub channels: u16,

    /// Bits per sample
    pub bit_depth: u16,

    /// Container/format tag
    pub format: String,

    /// Ingestion timestamp
    pub upload_time: DateTime<Utc>,

    /// Last access timestamp, bumped on every lookup
    pub last_accessed: DateTime<Utc>,

    /// Number of times the record was accessed
    pub access_count: u64,

    /// Free-form tag set
    pub tags: Vec<String>,

    /// Free-form metadata map as supplied on ingestion
    pub metadata: Map<String, Value>,

    /// Ordered processing-history entries
    pub processing_history: Vec<HistoryEntry>,
}

impl Default for AssetRecord {
    /// Substitution defaults used when loading a sparse index entry
    fn default() -> Self {
        let now = time::now();
        Self {
            file_id: String::new(),
            filename: String::new(),
            file_path: PathBuf::new(),
            file_size: 0,
            duration: 0.0,
            sample_rate: 44_100,
            channels: 1,
            bit_depth: 16,
            format: "wav".to_string(),
            upload_time: now,
            last_accessed: now,
            access_count: 0,
            tags: Vec::new(),
            metadata: Map::new(),
            processing_history: Vec::new(),
        }
    }
}

impl AssetRecord {
    /// Build a fresh record from an ingested file and its metadata
    ///
    /// The access count starts at 1: ingestion itself counts.
    pub fn from_ingestion(
        file_id: String,
        filename: String,
        file_path: PathBuf,
        file_size: u64,
        metadata: &AssetMetadata,
    ) -> Self {
        let now = time::now();
        Self {
            file_id,
            filename,
            file_path,
            file_size,
            duration: metadata.duration,
            sample_rate: metadata.sample_rate,
            channels: metadata.channels,
            bit_depth: metadata.bit_depth,
            format: metadata.format.clone(),
            upload_time: now,
            last_accessed: now,
            access_count: 1,
            tags: metadata.tags.clone(),
            metadata: metadata.to_map(),
            processing_history: Vec::new(),
        }
    }

    /// Record an access: bump the counter and the last-access timestamp
    pub fn touch(&mut self) {
        self.last_accessed = time::now();
        self.access_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_entry_loads_with_defaults() {
        let record: AssetRecord =
            serde_json::from_str(r#"{"file_id": "abc123", "filename": "kick.wav"}"#).unwrap();

        assert_eq!(record.file_id, "abc123");
        assert_eq!(record.filename, "kick.wav");
        assert_eq!(record.sample_rate, 44_100);
        assert_eq!(record.channels, 1);
        assert_eq!(record.bit_depth, 16);
        assert_eq!(record.format, "wav");
        assert_eq!(record.access_count, 0);
        assert!(record.tags.is_empty());
        assert!(record.processing_history.is_empty());
    }

    #[test]
    fn test_record_round_trips() {
        let meta = AssetMetadata {
            duration: 2.5,
            tags: vec!["drums".to_string(), "loop".to_string()],
            ..AssetMetadata::default()
        };
        let mut record = AssetRecord::from_ingestion(
            "deadbeef00112233".to_string(),
            "loop.wav".to_string(),
            PathBuf::from("uploads/loop.wav"),
            4096,
            &meta,
        );
        record.processing_history.push(HistoryEntry {
            effect: "reverb".to_string(),
            parameters: serde_json::json!({"room_size": 0.8}),
            result: serde_json::json!({"status": "ok"}),
            ..HistoryEntry::default()
        });

        let json = serde_json::to_string(&record).unwrap();
        let back: AssetRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.file_id, record.file_id);
        assert_eq!(back.file_size, 4096);
        assert_eq!(back.duration, 2.5);
        assert_eq!(back.tags, record.tags);
        assert_eq!(back.access_count, 1);
        assert_eq!(back.processing_history.len(), 1);
        assert_eq!(back.processing_history[0].effect, "reverb");
    }

    #[test]
    fn test_metadata_extra_keys_preserved() {
        let meta: AssetMetadata = serde_json::from_str(
            r#"{"duration": 1.0, "artist": "test", "bpm": 120}"#,
        )
        .unwrap();
        assert_eq!(meta.duration, 1.0);
        assert_eq!(meta.sample_rate, 44_100);
        assert_eq!(meta.channels, 2);

        let map = meta.to_map();
        assert_eq!(map["artist"], serde_json::json!("test"));
        assert_eq!(map["bpm"], serde_json::json!(120));
        assert_eq!(map["duration"], serde_json::json!(1.0));
    }

    #[test]
    fn test_touch_bumps_access_metadata() {
        let mut record = AssetRecord::default();
        let before = record.last_accessed;
        record.touch();
        assert_eq!(record.access_count, 1);
        assert!(record.last_accessed >= before);
    }
}
