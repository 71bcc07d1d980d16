//! Invalidation sink trait and test implementations.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

use super::Namespace;

/// Errors returned by the downstream cache when an invalidation fails.
///
/// Recoverable by design: the coalescer logs the failure and continues
/// with the rest of the batch. A later sweep touching the same namespace
/// retries implicitly.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The cache rejected the invalidation request.
    #[error("Invalidation rejected for namespace '{namespace}': {message}")]
    Rejected { namespace: String, message: String },

    /// The cache backend could not be reached.
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Trait for the downstream cache's invalidation surface.
///
/// Implementations mark every cached result keyed under `namespace` as
/// stale. Calls are fire-and-forget-with-result: the coalescer never
/// retries within a sweep and never aborts a batch on failure.
///
/// # Design Rules
///
/// - `invalidate()` is called outside the coalescer's lock, so a slow
///   cache cannot block event ingestion
/// - at most one call per namespace per sweep
/// - implementations must be safe under concurrent cache readers; readers
///   observing stale state mid-sweep is acceptable
#[async_trait]
pub trait InvalidationSink: Send + Sync {
    /// Invalidate all cached state keyed under the given namespace.
    async fn invalidate(&self, namespace: &Namespace) -> Result<(), SinkError>;
}

/// No-op implementation for tests or contexts that have no cache attached.
#[derive(Clone, Default)]
pub struct NoopInvalidationSink;

#[async_trait]
impl InvalidationSink for NoopInvalidationSink {
    async fn invalidate(&self, _namespace: &Namespace) -> Result<(), SinkError> {
        // Intentionally empty - invalidations are discarded
        Ok(())
    }
}

/// Mock sink for testing - records every invalidation attempt.
///
/// Namespaces armed via [`fail_on`](Self::fail_on) return a `SinkError`
/// while still being recorded, so tests can assert that a failing
/// namespace does not abort the rest of a sweep.
#[derive(Clone, Default)]
pub struct RecordingInvalidationSink {
    calls: Arc<Mutex<Vec<Namespace>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl RecordingInvalidationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the sink to fail every invalidation of the given namespace.
    pub fn fail_on(&self, namespace: impl Into<String>) {
        self.failing.lock().unwrap().insert(namespace.into());
    }

    /// Returns all recorded invalidation attempts, in call order.
    pub fn calls(&self) -> Vec<Namespace> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns the number of recorded invalidation attempts.
    pub fn len(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Returns true if no invalidation has been attempted.
    pub fn is_empty(&self) -> bool {
        self.calls.lock().unwrap().is_empty()
    }

    /// Clears recorded attempts.
    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl InvalidationSink for RecordingInvalidationSink {
    async fn invalidate(&self, namespace: &Namespace) -> Result<(), SinkError> {
        self.calls.lock().unwrap().push(namespace.clone());
        if self.failing.lock().unwrap().contains(namespace.as_str()) {
            return Err(SinkError::Rejected {
                namespace: namespace.to_string(),
                message: "armed to fail".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_sink_accepts_everything() {
        let sink = NoopInvalidationSink;
        assert!(sink.invalidate(&Namespace::from("contacts_view")).await.is_ok());
    }

    #[tokio::test]
    async fn test_recording_sink_collects_calls() {
        let sink = RecordingInvalidationSink::new();
        assert!(sink.is_empty());

        sink.invalidate(&Namespace::from("accounts_view")).await.unwrap();
        sink.invalidate(&Namespace::from("contacts_view")).await.unwrap();
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.calls()[0].as_str(), "accounts_view");

        sink.clear();
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_recording_sink_records_armed_failures() {
        let sink = RecordingInvalidationSink::new();
        sink.fail_on("accounts_view");

        let err = sink.invalidate(&Namespace::from("accounts_view")).await;
        assert!(err.is_err());
        // The attempt is still recorded.
        assert_eq!(sink.len(), 1);
    }
}
