use thiserror::Error;

use crate::events::{CollectionId, SinkError};
use crate::subscription::TransportError;

// Create a type alias for Result using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the realtime-sync subsystem.
///
/// Only `Config` is fatal, and only at construction time. Transport and
/// sink failures are recovered from where they occur and never terminate
/// the host; they appear here so callers of `flush` and friends have one
/// error surface.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration failed: {0}")]
    Config(#[from] ConfigError),

    #[error("Change subscription failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Cache invalidation failed: {0}")]
    Sink(#[from] SinkError),
}

/// Construction-time configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Watched collection '{0}' has no fan-out entry")]
    MissingFanout(CollectionId),

    #[error("Fan-out entry for collection '{0}' is empty")]
    EmptyFanout(CollectionId),

    #[error("Debounce window must be non-zero")]
    ZeroDebounceWindow,
}
