//! Queue receivers for the refresh pipeline.

mod refresh_package;
mod refresh_packages;

pub use refresh_package::RefreshPackageReceiver;
pub use refresh_packages::RefreshPackagesReceiver;

use crate::packages::PackageManager;
use std::sync::Arc;
use tug_queue::MessageQueue;

/// Subscribe both refresh receivers to `queue`, fan-out first.
pub fn subscribe(queue: &dyn MessageQueue, packages: &Arc<PackageManager>) {
    queue.subscribe(Arc::new(RefreshPackagesReceiver::new(packages.clone())));
    queue.subscribe(Arc::new(RefreshPackageReceiver::new(packages.clone())));
}
