//! # Wavecell Common Library
//!
//! Shared code for the wavecell audio service crates:
//! - Error types
//! - Configuration loading
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod time;

pub use config::Settings;
pub use error::{Error, Result};
