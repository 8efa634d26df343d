//! Uploaded asset index
//!
//! A self-balancing search tree keyed by asset identifier owns every
//! [`AssetRecord`]; a bounded cache accelerates identifier lookups with
//! non-owning back-references; the [`AssetStore`] facade combines both
//! with an on-disk index checkpoint.

pub mod cache;
pub mod record;
pub mod store;
pub mod tree;

pub use cache::BoundedCache;
pub use record::{AssetMetadata, AssetRecord, HistoryEntry};
pub use store::{AssetStore, StoreStats};
pub use tree::{IndexTree, TreeStats};
