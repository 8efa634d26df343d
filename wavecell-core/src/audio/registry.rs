//! Session buffer registry
//!
//! Thread-safe map of session key to [`RingBuffer`]. The registry lock
//! protects only the map's structural mutations; callers receive an
//! `Arc` handle and perform sample I/O without holding it, so registry
//! contention never blocks unrelated sample transfers.

use crate::audio::ring_buffer::{BufferStatus, RingBuffer};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use wavecell_common::Settings;

/// Aggregate statistics over all registered buffers
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    /// Number of registered buffers
    pub buffer_count: usize,

    /// Sum of available samples across all buffers
    pub total_samples_available: usize,

    /// Mean fill ratio across all buffers (0.0 when none exist)
    pub average_utilization: f64,

    /// Session keys with an active buffer
    pub active_sessions: Vec<String>,
}

/// Registry of per-session sample buffers
///
/// Constructed once at process start and passed by handle into whatever
/// serves requests; there is no module-level instance.
pub struct BufferRegistry {
    buffers: Mutex<HashMap<String, Arc<RingBuffer>>>,
    default_size: usize,
    default_sample_rate: u32,
}

impl BufferRegistry {
    /// Create a registry with explicit buffer defaults
    pub fn new(default_size: usize, default_sample_rate: u32) -> Self {
        info!(
            "Buffer registry initialized: default_size={}, default_sample_rate={}",
            default_size, default_sample_rate
        );
        Self {
            buffers: Mutex::new(HashMap::new()),
            default_size,
            default_sample_rate,
        }
    }

    /// Create a registry with defaults taken from settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.default_buffer_size, settings.default_sample_rate)
    }

    /// Create a buffer for a session, or return the existing one
    ///
    /// Idempotent: a second creation for the same key logs a conflict
    /// and returns the buffer already registered, never overwriting it.
    /// `size` and `sample_rate` default to the registry's configured
    /// values when omitted.
    pub fn create_buffer(
        &self,
        session_key: &str,
        size: Option<usize>,
        sample_rate: Option<u32>,
    ) -> Arc<RingBuffer> {
        let mut buffers = self.buffers.lock().unwrap();

        if let Some(existing) = buffers.get(session_key) {
            warn!("Buffer for session {} already exists", session_key);
            return Arc::clone(existing);
        }

        let size = size.unwrap_or(self.default_size);
        let sample_rate = sample_rate.unwrap_or(self.default_sample_rate);
        let buffer = Arc::new(RingBuffer::new(size, sample_rate));
        buffers.insert(session_key.to_string(), Arc::clone(&buffer));

        info!(
            "Created buffer for session {}: size={}, sample_rate={}",
            session_key, size, sample_rate
        );
        buffer
    }

    /// Look up the buffer for a session
    pub fn get_buffer(&self, session_key: &str) -> Option<Arc<RingBuffer>> {
        self.buffers.lock().unwrap().get(session_key).map(Arc::clone)
    }

    /// Remove a session's buffer; returns whether one existed
    pub fn delete_buffer(&self, session_key: &str) -> bool {
        let removed = self.buffers.lock().unwrap().remove(session_key).is_some();
        if removed {
            info!("Deleted buffer for session {}", session_key);
        }
        removed
    }

    /// Write samples into a session's buffer
    ///
    /// Returns the count actually written, or `None` when the session
    /// has no buffer. The registry lock is released before the sample
    /// transfer happens.
    pub fn write(&self, session_key: &str, samples: &[f32]) -> Option<usize> {
        self.get_buffer(session_key).map(|buffer| buffer.write(samples))
    }

    /// Read samples from a session's buffer with gain applied
    ///
    /// Returns `None` when the session has no buffer; otherwise however
    /// many samples were available, up to `count`.
    pub fn read(&self, session_key: &str, count: usize, gain: f32) -> Option<Vec<f32>> {
        self.get_buffer(session_key).map(|buffer| buffer.read(count, gain))
    }

    /// Status snapshot of every registered buffer
    pub fn statuses(&self) -> HashMap<String, BufferStatus> {
        let snapshot = self.snapshot();
        snapshot
            .into_iter()
            .map(|(session, buffer)| (session, buffer.status()))
            .collect()
    }

    /// Aggregate statistics across all buffers
    pub fn aggregate_stats(&self) -> RegistryStats {
        let snapshot = self.snapshot();
        let buffer_count = snapshot.len();
        let mut total_samples_available = 0;
        let mut total_utilization = 0.0;
        let mut active_sessions = Vec::with_capacity(buffer_count);

        for (session, buffer) in snapshot {
            let status = buffer.status();
            total_samples_available += status.available;
            total_utilization += status.utilization;
            active_sessions.push(session);
        }

        RegistryStats {
            buffer_count,
            total_samples_available,
            average_utilization: if buffer_count > 0 {
                total_utilization / buffer_count as f64
            } else {
                0.0
            },
            active_sessions,
        }
    }

    /// Clear every registered buffer (buffers stay registered)
    pub fn clear_all(&self) {
        let snapshot = self.snapshot();
        for buffer in snapshot.values() {
            buffer.clear();
        }
        debug!("Cleared all {} buffers", snapshot.len());
    }

    /// Clone the map contents so per-buffer work happens off the lock
    fn snapshot(&self) -> HashMap<String, Arc<RingBuffer>> {
        self.buffers.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> BufferRegistry {
        BufferRegistry::new(1000, 44_100)
    }

    #[test]
    fn test_create_buffer_uses_defaults() {
        let registry = registry();
        let buffer = registry.create_buffer("session-1", None, None);
        assert_eq!(buffer.capacity(), 1000);
        assert_eq!(buffer.sample_rate(), 44_100);
    }

    #[test]
    fn test_create_buffer_is_idempotent() {
        let registry = registry();
        let first = registry.create_buffer("session-1", Some(500), None);
        first.write(&[0.5; 100]);

        // Second creation returns the existing buffer, never overwrites
        let second = registry.create_buffer("session-1", Some(9999), None);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.capacity(), 500);
        assert_eq!(second.available(), 100);
        assert_eq!(registry.aggregate_stats().buffer_count, 1);
    }

    #[test]
    fn test_get_and_delete_buffer() {
        let registry = registry();
        assert!(registry.get_buffer("missing").is_none());
        assert!(!registry.delete_buffer("missing"));

        registry.create_buffer("session-1", None, None);
        assert!(registry.get_buffer("session-1").is_some());
        assert!(registry.delete_buffer("session-1"));
        assert!(registry.get_buffer("session-1").is_none());
    }

    #[test]
    fn test_sample_io_surface() {
        let registry = registry();
        assert!(registry.write("missing", &[0.1; 4]).is_none());
        assert!(registry.read("missing", 4, 1.0).is_none());

        registry.create_buffer("session-1", None, None);
        assert_eq!(registry.write("session-1", &[0.1; 4]), Some(4));
        let out = registry.read("session-1", 4, 2.0).unwrap();
        assert_eq!(out.len(), 4);
        for sample in &out {
            assert!((sample - 0.2).abs() < 1e-6);
        }
    }

    #[test]
    fn test_statuses_and_aggregate_stats() {
        let registry = registry();
        let stats = registry.aggregate_stats();
        assert_eq!(stats.buffer_count, 0);
        assert_eq!(stats.average_utilization, 0.0);

        registry.create_buffer("a", Some(100), None);
        registry.create_buffer("b", Some(100), None);
        registry.write("a", &[0.1; 50]);
        registry.write("b", &[0.1; 100]);

        let statuses = registry.statuses();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses["a"].available, 50);
        assert_eq!(statuses["b"].available, 100);

        let stats = registry.aggregate_stats();
        assert_eq!(stats.buffer_count, 2);
        assert_eq!(stats.total_samples_available, 150);
        assert!((stats.average_utilization - 0.75).abs() < 1e-9);
        let mut sessions = stats.active_sessions;
        sessions.sort();
        assert_eq!(sessions, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_clear_all() {
        let registry = registry();
        registry.create_buffer("a", None, None);
        registry.create_buffer("b", None, None);
        registry.write("a", &[0.1; 10]);
        registry.write("b", &[0.1; 20]);

        registry.clear_all();
        assert_eq!(registry.aggregate_stats().total_samples_available, 0);
        // Buffers themselves survive
        assert!(registry.get_buffer("a").is_some());
        assert!(registry.get_buffer("b").is_some());
    }

    #[test]
    fn test_concurrent_sessions_do_not_interfere() {
        let registry = Arc::new(registry());
        for i in 0..4 {
            registry.create_buffer(&format!("session-{}", i), Some(2048), None);
        }

        let mut handles = Vec::new();
        for i in 0..4 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                let key = format!("session-{}", i);
                let value = i as f32;
                for _ in 0..100 {
                    registry.write(&key, &[value; 16]);
                    let out = registry.read(&key, 16, 1.0).unwrap();
                    for sample in &out {
                        assert_eq!(*sample, value);
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = registry.aggregate_stats();
        assert_eq!(stats.buffer_count, 4);
        assert_eq!(stats.total_samples_available, 0);
    }
}
