//! Source subscription manager.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::task::JoinHandle;

use super::ChangeEventSource;
use crate::coalescer::InvalidationCoalescer;
use crate::constants::{RESUBSCRIBE_MAX_BACKOFF_SECS, RESUBSCRIBE_MIN_BACKOFF_SECS};
use crate::events::CollectionId;

/// Owns the lifecycle of one logical subscription to the change-event
/// source and forwards every received event to the coalescer.
///
/// Presence-based: operation type and payload are discarded, only the
/// collection identity reaches [`InvalidationCoalescer::schedule`]. On a
/// transport drop the manager resubscribes with exponential backoff (floor
/// one second, capped, never giving up); the coalescer keeps its state
/// across the outage and no events are owed for the gap.
///
/// `start` and `stop` are tied to session start/end by the caller and are
/// both idempotent, so at most one subscription exists per session and
/// teardown is guaranteed.
pub struct SubscriptionManager {
    source: Arc<dyn ChangeEventSource>,
    coalescer: InvalidationCoalescer,
    watched: Vec<CollectionId>,
    connected: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SubscriptionManager {
    pub fn new(
        source: Arc<dyn ChangeEventSource>,
        coalescer: InvalidationCoalescer,
        watched: Vec<CollectionId>,
    ) -> Self {
        Self {
            source,
            coalescer,
            watched,
            connected: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    /// Opens the subscription and starts forwarding events. No-op if
    /// already running.
    pub fn start(&self) {
        let mut task = self.task.lock().unwrap();
        if task.is_some() {
            info!("Subscription manager already running");
            return;
        }

        info!(
            "Starting change subscription for {} collections",
            self.watched.len()
        );
        let source = self.source.clone();
        let coalescer = self.coalescer.clone();
        let watched = self.watched.clone();
        let connected = self.connected.clone();
        *task = Some(tokio::spawn(run_loop(source, coalescer, watched, connected)));
    }

    /// Cancels the subscription. Idempotent; safe to call whether or not
    /// the manager ever started.
    pub fn stop(&self) {
        let task = self.task.lock().unwrap().take();
        if let Some(task) = task {
            task.abort();
            self.connected.store(false, Ordering::SeqCst);
            info!("Change subscription stopped");
        }
    }

    /// True between `start` and `stop`.
    pub fn is_running(&self) -> bool {
        self.task.lock().unwrap().is_some()
    }

    /// Transport-health signal: false while disconnected, during which
    /// sweeps cannot observe new changes and caches may be stale.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

async fn run_loop(
    source: Arc<dyn ChangeEventSource>,
    coalescer: InvalidationCoalescer,
    watched: Vec<CollectionId>,
    connected: Arc<AtomicBool>,
) {
    let mut backoff_secs = RESUBSCRIBE_MIN_BACKOFF_SECS;

    loop {
        match source.subscribe(&watched).await {
            Ok(mut events) => {
                info!(
                    "Change subscription established for {} collections",
                    watched.len()
                );
                connected.store(true, Ordering::SeqCst);
                backoff_secs = RESUBSCRIBE_MIN_BACKOFF_SECS;

                while let Some(event) = events.recv().await {
                    debug!(
                        "Change event: {} {:?}",
                        event.collection, event.operation
                    );
                    coalescer.schedule(event.collection);
                }

                connected.store(false, Ordering::SeqCst);
                warn!("Change subscription dropped, reconnecting in {backoff_secs}s");
            }
            Err(e) => {
                connected.store(false, Ordering::SeqCst);
                warn!("Failed to establish change subscription: {e}, retrying in {backoff_secs}s");
            }
        }

        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
        backoff_secs = (backoff_secs * 2).min(RESUBSCRIBE_MAX_BACKOFF_SECS);
    }
}
