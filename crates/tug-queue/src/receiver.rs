//! Receivers and capability-based dispatch.

use crate::message::Message;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};
use tug_core::{BoxFuture, Result};

/// A job handler.
pub trait QueueReceiver: Send + Sync + std::fmt::Debug {
    /// Whether this receiver handles `message`.
    fn supports(&self, message: &Message) -> bool;

    /// Execute the job.
    ///
    /// # Errors
    /// Returns error if the job failed; the queue logs it and moves on.
    fn execute(&self, message: Message) -> BoxFuture<'_, Result<()>>;
}

/// Outcome of delivering a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveReport {
    /// Messages executed successfully.
    pub processed: usize,
    /// Messages whose receiver failed.
    pub failed: usize,
    /// Messages no receiver supports.
    pub dropped: usize,
}

impl ReceiveReport {
    /// Fold another report into this one.
    pub fn merge(&mut self, other: Self) {
        self.processed += other.processed;
        self.failed += other.failed;
        self.dropped += other.dropped;
    }

    /// Messages seen.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.processed + self.failed + self.dropped
    }
}

/// Ordered receiver list; the first receiver supporting a message gets it.
#[derive(Debug, Default)]
pub struct Receivers {
    receivers: RwLock<Vec<Arc<dyn QueueReceiver>>>,
}

impl Receivers {
    /// Append a receiver.
    pub fn push(&self, receiver: Arc<dyn QueueReceiver>) {
        self.receivers.write().push(receiver);
    }

    /// Remove every receiver.
    pub fn clear(&self) {
        self.receivers.write().clear();
    }

    /// Number of receivers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receivers.read().len()
    }

    /// Whether no receiver is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receivers.read().is_empty()
    }

    fn find(&self, message: &Message) -> Option<Arc<dyn QueueReceiver>> {
        self.receivers
            .read()
            .iter()
            .find(|receiver| receiver.supports(message))
            .cloned()
    }

    /// Deliver `messages` in order; failures never stop the batch.
    pub async fn dispatch(&self, messages: Vec<Message>) -> ReceiveReport {
        let mut report = ReceiveReport::default();

        for message in messages {
            let kind = message.kind();
            let Some(receiver) = self.find(&message) else {
                debug!(kind, url = message.repository_url(), "no receiver supports message, dropped");
                report.dropped += 1;
                continue;
            };

            let url = message.repository_url().to_string();
            match receiver.execute(message).await {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    warn!(kind, url = %url, error = %e, "message failed");
                    report.failed += 1;
                }
            }
        }

        report
    }
}
