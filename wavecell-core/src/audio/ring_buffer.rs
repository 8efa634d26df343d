//! Ring buffer for PCM sample storage
//!
//! Fixed-capacity circular store of mono f32 samples with wrap-around
//! read/write. One exclusive lock per buffer guards the backing store,
//! both pointers, the available count, and the cumulative counters, so
//! all of them change atomically together.
//!
//! Capacity violations are not errors: `write` stores as much as fits
//! and returns the count, `read` returns as much as is available.
//! Callers inspect the returned count/length.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;
use tracing::{debug, trace, warn};
use wavecell_common::time;

/// Snapshot of a buffer's state for monitoring
///
/// Serialized as-is onto the buffer-status reporting surface.
#[derive(Debug, Clone, Serialize)]
pub struct BufferStatus {
    /// Buffer capacity in samples
    pub size: usize,

    /// Samples currently available for reading
    pub available: usize,

    /// Read pointer position
    pub read_ptr: usize,

    /// Write pointer position
    pub write_ptr: usize,

    /// Fill ratio, `available / size` (0.0 - 1.0)
    pub utilization: f64,

    /// Total samples written since creation (lifetime counter)
    pub total_written: u64,

    /// Total samples read since creation (lifetime counter)
    pub total_read: u64,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Buffered audio duration, `available / sample_rate`
    pub duration_seconds: f64,
}

/// Mutable buffer state; every field changes under the one lock
struct BufferState {
    samples: Vec<f32>,
    read_ptr: usize,
    write_ptr: usize,
    available: usize,
    total_written: u64,
    total_read: u64,
}

/// Thread-safe circular sample buffer for one session
///
/// Read and write serialize against each other on the buffer's own
/// lock; there are no separate reader/writer paths. Invariants held
/// after every operation:
/// - `0 <= available <= capacity`
/// - `read_ptr, write_ptr` in `[0, capacity)`
pub struct RingBuffer {
    /// Capacity in samples, immutable after creation
    capacity: usize,

    /// Sample rate in Hz, immutable after creation
    sample_rate: u32,

    /// Creation timestamp
    created_at: DateTime<Utc>,

    /// Pointers, store, and counters (see [`BufferState`])
    state: Mutex<BufferState>,
}

impl RingBuffer {
    /// Create a new empty buffer with both pointers at 0
    pub fn new(capacity: usize, sample_rate: u32) -> Self {
        debug!("Creating ring buffer: capacity={}, sample_rate={}", capacity, sample_rate);

        Self {
            capacity,
            sample_rate,
            created_at: time::now(),
            state: Mutex::new(BufferState {
                samples: vec![0.0; capacity],
                read_ptr: 0,
                write_ptr: 0,
                available: 0,
                total_written: 0,
                total_read: 0,
            }),
        }
    }

    /// Write samples into the buffer
    ///
    /// Stores `min(samples.len(), capacity - available)` samples starting
    /// at the write pointer, split into two contiguous segments when the
    /// write wraps past the physical end. Returns the count actually
    /// written; 0 when the buffer is full. Never blocks.
    pub fn write(&self, samples: &[f32]) -> usize {
        if samples.is_empty() {
            return 0;
        }

        let mut state = self.state.lock().unwrap();

        let writable = samples.len().min(self.capacity - state.available);
        if writable == 0 {
            warn!("Buffer full, dropping {} samples", samples.len());
            return 0;
        }

        let write_ptr = state.write_ptr;
        let first = writable.min(self.capacity - write_ptr);
        state.samples[write_ptr..write_ptr + first].copy_from_slice(&samples[..first]);
        if writable > first {
            // Wrap past the physical end
            state.samples[..writable - first].copy_from_slice(&samples[first..writable]);
        }

        state.write_ptr = (write_ptr + writable) % self.capacity;
        state.available += writable;
        state.total_written += writable as u64;

        trace!("Wrote {} samples (available={})", writable, state.available);
        writable
    }

    /// Read samples from the buffer with gain applied
    ///
    /// Takes `min(count, available)` samples from the read pointer,
    /// split across the wrap boundary when needed, each multiplied by
    /// `gain`. Returns an empty vec when nothing is available.
    pub fn read(&self, count: usize, gain: f32) -> Vec<f32> {
        let mut state = self.state.lock().unwrap();

        let readable = count.min(state.available);
        if readable == 0 {
            trace!("No samples available for reading");
            return Vec::new();
        }

        let mut out = Vec::with_capacity(readable);
        let read_ptr = state.read_ptr;
        let first = readable.min(self.capacity - read_ptr);
        out.extend_from_slice(&state.samples[read_ptr..read_ptr + first]);
        if readable > first {
            out.extend_from_slice(&state.samples[..readable - first]);
        }

        for sample in &mut out {
            *sample *= gain;
        }

        state.read_ptr = (read_ptr + readable) % self.capacity;
        state.available -= readable;
        state.total_read += readable as u64;

        trace!("Read {} samples (available={})", readable, state.available);
        out
    }

    /// Zero the backing store and reset pointers and available to 0
    ///
    /// Lifetime counters are preserved.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.samples.fill(0.0);
        state.read_ptr = 0;
        state.write_ptr = 0;
        state.available = 0;
        debug!("Buffer cleared");
    }

    /// Snapshot the buffer state for monitoring
    pub fn status(&self) -> BufferStatus {
        let state = self.state.lock().unwrap();
        BufferStatus {
            size: self.capacity,
            available: state.available,
            read_ptr: state.read_ptr,
            write_ptr: state.write_ptr,
            utilization: utilization(state.available, self.capacity),
            total_written: state.total_written,
            total_read: state.total_read,
            sample_rate: self.sample_rate,
            created_at: self.created_at,
            duration_seconds: if self.sample_rate > 0 {
                state.available as f64 / self.sample_rate as f64
            } else {
                0.0
            },
        }
    }

    /// Buffer capacity in samples
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples currently available for reading
    pub fn available(&self) -> usize {
        self.state.lock().unwrap().available
    }

    /// Check if the buffer is full
    pub fn is_full(&self) -> bool {
        self.available() >= self.capacity
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    /// Fill ratio (0.0 - 1.0)
    pub fn utilization(&self) -> f64 {
        utilization(self.available(), self.capacity)
    }
}

fn utilization(available: usize, capacity: usize) -> f64 {
    if capacity == 0 {
        0.0
    } else {
        available as f64 / capacity as f64
    }
}
