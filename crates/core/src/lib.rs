//! Change-notification coalescing for the CRM backend.
//!
//! Turns the noisy at-least-once stream of per-record change events into
//! one batched, deduplicated cache-invalidation sweep per debounce window:
//! subscription manager -> coalescer -> fan-out table -> invalidation sink.

pub mod coalescer;
pub mod constants;
pub mod errors;
pub mod events;
pub mod fanout;
pub mod subscription;

pub use coalescer::{CoalescerConfig, InvalidationCoalescer, SweepSummary};
pub use errors::{Error, Result};
