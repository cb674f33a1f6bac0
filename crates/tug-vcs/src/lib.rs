//! VCS drivers for Tug.
//!
//! A driver answers questions about one hosted repository (default branch,
//! tags, branches, file contents, commit dates) through the REST API of its
//! host. Every request goes through a [`RemoteFilesystem`], so drivers can be
//! exercised offline with the fixture filesystem behind the `testing` feature.

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod driver;
pub mod github;
pub mod registry;
pub mod remote;

pub use cache::DriverCache;
pub use driver::{RepositoryData, VcsDriver};
pub use github::GithubDriver;
pub use registry::{Driver, DriverKind};
pub use remote::{HttpRemoteFilesystem, RemoteFilesystem, RemoteResponse, parse_next_link};

#[cfg(any(test, feature = "testing"))]
pub use remote::StaticRemoteFilesystem;
