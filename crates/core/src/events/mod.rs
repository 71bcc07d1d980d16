//! Change events module.
//!
//! Provides the change-event model received from the change-event source
//! and the sink trait through which coalesced invalidations reach the
//! downstream cache layer.

mod change_event;
mod sink;

pub use change_event::*;
pub use sink::*;
