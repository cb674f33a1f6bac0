use crate::packages::PackageManager;
use std::sync::Arc;
use tracing::debug;
use tug_core::{BoxFuture, Result};
use tug_queue::{Message, QueueReceiver};

/// Expands a `refresh-packages` job into one `refresh-package` job per
/// branch and tag.
#[derive(Debug)]
pub struct RefreshPackagesReceiver {
    packages: Arc<PackageManager>,
}

impl RefreshPackagesReceiver {
    /// Create the receiver.
    #[must_use]
    pub const fn new(packages: Arc<PackageManager>) -> Self {
        Self { packages }
    }
}

impl QueueReceiver for RefreshPackagesReceiver {
    fn supports(&self, message: &Message) -> bool {
        matches!(message, Message::RefreshPackages { .. })
    }

    fn execute(&self, message: Message) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let Message::RefreshPackages {
                repository_url,
                force,
            } = message
            else {
                return Ok(());
            };

            if self
                .packages
                .enqueue_versions(&repository_url, force)
                .await?
                .is_none()
            {
                debug!(url = %repository_url, "repository no longer enabled, nothing to refresh");
            }
            Ok(())
        })
    }
}
