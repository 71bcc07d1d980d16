//! Change-event source trait and test implementation.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::events::{ChangeEvent, CollectionId};

/// Transport-level failures of the change-event source.
///
/// Always recoverable: the subscription manager retries with backoff and
/// never propagates these to the coalescer. Staleness during an outage is
/// an accepted consistency gap, not a crash condition.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to establish change subscription: {0}")]
    SubscribeFailed(String),

    #[error("Change subscription dropped: {0}")]
    Disconnected(String),
}

/// The transport seam through which change notifications arrive.
///
/// One call to `subscribe` opens a single underlying subscription spanning
/// all watched collections (never one per collection), bounding transport
/// resource usage. Events are delivered at-least-once and unordered across
/// collections; the returned channel closing means the transport dropped.
#[async_trait]
pub trait ChangeEventSource: Send + Sync {
    async fn subscribe(
        &self,
        collections: &[CollectionId],
    ) -> Result<mpsc::Receiver<ChangeEvent>, TransportError>;
}

enum ScriptedSubscribe {
    Channel(mpsc::Receiver<ChangeEvent>),
    Failure(TransportError),
}

/// Mock source for testing - hands out scripted subscription outcomes.
///
/// Each queued channel or failure answers one `subscribe` call, in order.
/// With the queue exhausted, `subscribe` fails, which exercises the
/// manager's retry path.
#[derive(Default)]
pub struct MockChangeSource {
    scripted: Mutex<VecDeque<ScriptedSubscribe>>,
    subscribe_count: AtomicUsize,
}

impl MockChangeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful subscription and returns its sender side.
    pub fn push_channel(&self) -> mpsc::Sender<ChangeEvent> {
        let (sender, receiver) = mpsc::channel(64);
        self.scripted
            .lock()
            .unwrap()
            .push_back(ScriptedSubscribe::Channel(receiver));
        sender
    }

    /// Queues a failed subscription attempt.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.scripted
            .lock()
            .unwrap()
            .push_back(ScriptedSubscribe::Failure(TransportError::SubscribeFailed(
                message.into(),
            )));
    }

    /// Number of `subscribe` calls observed so far.
    pub fn subscribe_count(&self) -> usize {
        self.subscribe_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChangeEventSource for MockChangeSource {
    async fn subscribe(
        &self,
        _collections: &[CollectionId],
    ) -> Result<mpsc::Receiver<ChangeEvent>, TransportError> {
        self.subscribe_count.fetch_add(1, Ordering::SeqCst);
        match self.scripted.lock().unwrap().pop_front() {
            Some(ScriptedSubscribe::Channel(receiver)) => Ok(receiver),
            Some(ScriptedSubscribe::Failure(error)) => Err(error),
            None => Err(TransportError::SubscribeFailed(
                "no scripted subscription".to_string(),
            )),
        }
    }
}
