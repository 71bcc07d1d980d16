//! Fan-out table module.

mod table;

pub use table::*;
