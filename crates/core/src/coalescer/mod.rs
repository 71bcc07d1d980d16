//! Invalidation coalescer module.
//!
//! Accumulates changed collections in a pending set, debounces them behind
//! a single shared timer, expands the batch through the fan-out table and
//! emits one deduplicated invalidation sweep per window.

mod config;
mod service;

pub use config::CoalescerConfig;
pub use service::{InvalidationCoalescer, SweepFailure, SweepSummary};
