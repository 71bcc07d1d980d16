//! Source subscription module.
//!
//! Owns the lifecycle of the single change-event subscription and the
//! transport seam it is established through.

mod manager;
mod source;

pub use manager::SubscriptionManager;
pub use source::{ChangeEventSource, MockChangeSource, TransportError};
