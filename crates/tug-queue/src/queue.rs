//! Queue abstraction and the in-process implementation.

use crate::message::Message;
use crate::receiver::{QueueReceiver, ReceiveReport, Receivers};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use tracing::{debug, trace};
use tug_core::{BoxFuture, Result};

/// A job bus.
///
/// `send` and `send_batch` return once the jobs are accepted; execution happens
/// later through `receive`.
pub trait MessageQueue: Send + Sync + std::fmt::Debug {
    /// Register a receiver; earlier receivers take precedence.
    fn subscribe(&self, receiver: Arc<dyn QueueReceiver>);

    /// Queue one message, optionally delayed.
    ///
    /// # Errors
    /// Returns error if the queue cannot accept the message.
    fn send(&self, message: Message, delay: Option<Duration>) -> BoxFuture<'_, Result<()>> {
        self.send_batch(vec![message], delay)
    }

    /// Queue messages as one batch, optionally delayed.
    ///
    /// # Errors
    /// Returns error if the queue cannot accept the batch.
    fn send_batch(
        &self,
        messages: Vec<Message>,
        delay: Option<Duration>,
    ) -> BoxFuture<'_, Result<()>>;

    /// Deliver messages to receivers now.
    fn receive(&self, messages: Vec<Message>) -> BoxFuture<'_, ReceiveReport>;
}

#[derive(Debug, Default)]
struct Inner {
    receivers: Receivers,
    tracker: TaskTracker,
    totals: Mutex<ReceiveReport>,
}

/// Queue running jobs as tasks on the current tokio runtime.
///
/// Cloning yields another handle to the same queue.
#[derive(Debug, Clone, Default)]
pub struct LocalMessageQueue {
    inner: Arc<Inner>,
}

impl LocalMessageQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until every scheduled job has run, including jobs scheduled by
    /// jobs, and return the totals so far.
    pub async fn idle(&self) -> ReceiveReport {
        let tracker = &self.inner.tracker;
        tracker.close();
        tracker.wait().await;
        tracker.reopen();
        self.totals()
    }

    /// Jobs scheduled and not finished.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.tracker.len()
    }

    /// Totals of every batch delivered so far.
    #[must_use]
    pub fn totals(&self) -> ReceiveReport {
        *self.inner.totals.lock()
    }

    /// Drop every receiver.
    ///
    /// Receivers usually hold a handle back to the queue, so this releases
    /// both once the caller is done.
    pub fn shutdown(&self) {
        self.inner.receivers.clear();
    }
}

impl MessageQueue for LocalMessageQueue {
    fn subscribe(&self, receiver: Arc<dyn QueueReceiver>) {
        trace!(?receiver, "subscribed receiver");
        self.inner.receivers.push(receiver);
    }

    fn send_batch(
        &self,
        messages: Vec<Message>,
        delay: Option<Duration>,
    ) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if messages.is_empty() {
                return Ok(());
            }

            debug!(count = messages.len(), ?delay, "scheduling batch");
            let queue = self.clone();
            self.inner.tracker.spawn(async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                queue.receive(messages).await;
            });
            Ok(())
        })
    }

    fn receive(&self, messages: Vec<Message>) -> BoxFuture<'_, ReceiveReport> {
        Box::pin(async move {
            let report = self.inner.receivers.dispatch(messages).await;
            self.inner.totals.lock().merge(report);
            debug!(
                processed = report.processed,
                failed = report.failed,
                dropped = report.dropped,
                "batch delivered"
            );
            report
        })
    }
}
