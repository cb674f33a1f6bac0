use crate::packages::PackageManager;
use std::sync::Arc;
use tug_core::{BoxFuture, Result};
use tug_queue::{Message, QueueReceiver};

/// Executes a `refresh-package` job.
#[derive(Debug)]
pub struct RefreshPackageReceiver {
    packages: Arc<PackageManager>,
}

impl RefreshPackageReceiver {
    /// Create the receiver.
    #[must_use]
    pub const fn new(packages: Arc<PackageManager>) -> Self {
        Self { packages }
    }
}

impl QueueReceiver for RefreshPackageReceiver {
    fn supports(&self, message: &Message) -> bool {
        matches!(message, Message::RefreshPackage { .. })
    }

    fn execute(&self, message: Message) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if let Message::RefreshPackage {
                repository_url,
                identifier,
                version,
                force,
            } = message
            {
                self.packages
                    .refresh_version(&repository_url, &identifier, &version, force)
                    .await?;
            }
            Ok(())
        })
    }
}
