//! Buffer pool management for Brindle.
//!
//! This crate provides in-memory page caching with:
//! - Fixed-size buffer pool with configurable frame count
//! - Clock eviction policy for cache management
//! - Pin counting with per-file pinned-page accounting
//! - Dirty page tracking for write-back

mod frame;
mod pool;
mod replacer;

pub use frame::{BufferFrame, FrameId};
pub use pool::{BufferPool, BufferPoolStats, EvictedPage};
pub use replacer::ClockReplacer;
