//! # Wavecell Core Library
//!
//! Resource engines for the wavecell real-time audio service:
//!
//! - [`audio`] — fixed-capacity per-session sample buffers with a
//!   thread-safe registry keyed by session.
//! - [`library`] — persistent, queryable index of uploaded audio assets:
//!   a self-balancing search tree, a bounded lookup cache, and a facade
//!   that checkpoints the index to disk.
//!
//! The HTTP/WebSocket layer, relational persistence, and the upload
//! decoder are external collaborators; they interact with these engines
//! through session keys, sample slices, and `(path, metadata)` pairs.

pub mod audio;
pub mod library;

pub use wavecell_common::{Error, Result, Settings};
