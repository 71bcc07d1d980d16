//! The invalidation coalescer.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::task::JoinHandle;

use super::CoalescerConfig;
use crate::errors::ConfigError;
use crate::events::{CollectionId, InvalidationSink, Namespace};
use crate::fanout::FanoutTable;

/// Outcome of one sweep: which collections were taken, which namespaces
/// were invalidated, and which invalidations the cache rejected.
///
/// Failures are not retried within the sweep; any later sweep touching an
/// affected collection (or an explicit `flush`) retries implicitly.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SweepSummary {
    pub collections: Vec<CollectionId>,
    pub invalidated: Vec<Namespace>,
    pub failures: Vec<SweepFailure>,
}

/// A single failed invalidation within a sweep.
#[derive(Clone, Debug, Serialize)]
pub struct SweepFailure {
    pub namespace: Namespace,
    pub message: String,
}

impl SweepSummary {
    /// True if the sweep took an empty batch and called nothing.
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

/// State guarded by the coalescer's lock.
///
/// The lock is held only for set/flag updates, never across sink calls, so
/// a slow cache cannot block event ingestion.
struct SweepState {
    pending: HashSet<CollectionId>,
    timer: Option<JoinHandle<()>>,
    /// Bumped whenever the pending timer is cancelled or superseded. A
    /// timer task that wakes with a stale generation lost the race to a
    /// `flush` or `close` and must not sweep.
    timer_gen: u64,
    closed: bool,
}

struct Inner {
    state: Mutex<SweepState>,
    fanout: FanoutTable,
    sink: Arc<dyn InvalidationSink>,
    watched: HashSet<CollectionId>,
    window: Duration,
}

/// Coalesces bursts of per-record change notifications into one batched
/// cache invalidation per debounce window.
///
/// A single shared timer per instance bounds sweeps to one per window no
/// matter how many collections mutate: N events across K collections
/// inside one window produce exactly one sweep touching at most the
/// namespaces those K collections fan out to.
///
/// One coalescer is built per authenticated session and torn down with
/// [`close`](Self::close) when the session ends. Cloning is cheap and
/// shares the same instance.
///
/// `schedule` must be called from within a tokio runtime (it spawns the
/// debounce timer).
#[derive(Clone)]
pub struct InvalidationCoalescer {
    inner: Arc<Inner>,
}

impl InvalidationCoalescer {
    /// Builds a coalescer, validating the fan-out table against the
    /// watched set. A watched collection without a fan-out entry is a
    /// configuration error and the coalescer must not start.
    pub fn new(
        config: CoalescerConfig,
        sink: Arc<dyn InvalidationSink>,
    ) -> Result<Self, ConfigError> {
        if config.debounce_window.is_zero() {
            return Err(ConfigError::ZeroDebounceWindow);
        }
        let fanout = FanoutTable::new(&config.watched_collections, config.fanout)?;

        Ok(Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SweepState {
                    pending: HashSet::new(),
                    timer: None,
                    timer_gen: 0,
                    closed: false,
                }),
                fanout,
                sink,
                watched: config.watched_collections,
                window: config.debounce_window,
            }),
        })
    }

    /// Records that `collection` has changed and arms the debounce timer
    /// if none is pending.
    ///
    /// Non-blocking beyond the critical section. After [`close`](Self::close)
    /// this is a no-op; events for unwatched collections are likewise
    /// dropped.
    pub fn schedule(&self, collection: CollectionId) {
        let mut state = self.inner.state.lock().unwrap();
        if state.closed {
            debug!("schedule({collection}) ignored: coalescer is closed");
            return;
        }
        if !self.inner.watched.contains(&collection) {
            debug!("schedule({collection}) ignored: collection is not watched");
            return;
        }

        state.pending.insert(collection);

        // At most one timer per instance. If one is already pending this
        // call's only effect was the insertion above.
        if state.timer.is_none() {
            state.timer_gen += 1;
            let generation = state.timer_gen;
            let this = self.clone();
            state.timer = Some(tokio::spawn(async move {
                this.run_timer(generation).await;
            }));
        }
    }

    /// Forces an immediate sweep, cancelling any pending timer.
    ///
    /// Used by "refresh now" actions and by callers that just wrote a
    /// record and do not want to wait out the debounce window for their
    /// own change. No-op (zero sink calls) on an empty pending set.
    ///
    /// Completion of the returned future means every sink call of this
    /// sweep has returned, so `flush().await` is the point after which a
    /// read-back observes invalidated caches.
    pub async fn flush(&self) -> SweepSummary {
        let batch = {
            let mut state = self.inner.state.lock().unwrap();
            state.timer_gen += 1;
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            std::mem::take(&mut state.pending)
        };
        self.invalidate_batch(batch).await
    }

    /// Tears the coalescer down: cancels any pending timer and discards
    /// the pending set without flushing.
    ///
    /// Dropping pending work is deliberate: invalidation is not durable,
    /// and the cache rebuilds from the record store on next access. A
    /// sweep already past its swap completes its sink calls; no timer
    /// fires after `close` returns. Idempotent, safe from any task.
    pub async fn close(&self) {
        let timer = {
            let mut state = self.inner.state.lock().unwrap();
            if state.closed {
                return;
            }
            state.closed = true;
            state.timer_gen += 1;
            state.pending.clear();
            state.timer.take()
        };

        if let Some(timer) = timer {
            timer.abort();
            // Wait the handle out so no timer outlives close().
            let _ = timer.await;
        }
        info!("Invalidation coalescer closed");
    }

    /// True once [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().unwrap().closed
    }

    async fn run_timer(self, generation: u64) {
        tokio::time::sleep(self.inner.window).await;

        let batch = {
            let mut state = self.inner.state.lock().unwrap();
            // A flush or close that raced this wake-up already took (or
            // discarded) the batch; it owns this generation's sweep.
            if state.closed || state.timer_gen != generation {
                return;
            }
            state.timer = None;
            std::mem::take(&mut state.pending)
        };

        let summary = self.invalidate_batch(batch).await;
        if !summary.is_empty() {
            debug!(
                "Debounce sweep done: {} collections, {} namespaces invalidated, {} failed",
                summary.collections.len(),
                summary.invalidated.len(),
                summary.failures.len()
            );
        }
    }

    /// Expands a batch through the fan-out table and invalidates each
    /// namespace of the union exactly once, in lexicographic order.
    /// Runs entirely outside the lock.
    async fn invalidate_batch(&self, batch: HashSet<CollectionId>) -> SweepSummary {
        if batch.is_empty() {
            return SweepSummary::default();
        }

        let namespaces = self.inner.fanout.union_for(batch.iter());
        let mut collections: Vec<CollectionId> = batch.into_iter().collect();
        collections.sort();

        info!(
            "Sweeping {} changed collections into {} namespaces",
            collections.len(),
            namespaces.len()
        );

        let mut summary = SweepSummary {
            collections,
            ..Default::default()
        };

        for namespace in namespaces {
            match self.inner.sink.invalidate(&namespace).await {
                Ok(()) => summary.invalidated.push(namespace),
                Err(e) => {
                    // Per-namespace failures never abort the batch; a
                    // later sweep on an affected collection retries.
                    warn!("Failed to invalidate namespace '{namespace}': {e}");
                    summary.failures.push(SweepFailure {
                        namespace,
                        message: e.to_string(),
                    });
                }
            }
        }
        summary
    }
}
