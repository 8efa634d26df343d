//! Per-session sample buffering
//!
//! Each active session owns one fixed-capacity [`RingBuffer`]; the
//! [`BufferRegistry`] maps session keys to buffers and exposes the
//! sample I/O surface used by the transport layer.

pub mod registry;
pub mod ring_buffer;

pub use registry::{BufferRegistry, RegistryStats};
pub use ring_buffer::{BufferStatus, RingBuffer};
