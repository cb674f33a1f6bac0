//! Core types for Tug, a Composer repository mirror for private VCS hosts.
//!
//! This crate holds what every other Tug crate agrees on: the error taxonomy,
//! Composer version normalization, and the package version records that end
//! up in the metadata store.

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod json;
pub mod package;
pub mod version;

pub use error::{Error, Result};
pub use package::{
    ComposerManifest, ComposerSupport, Dist, PackageName, PackageVersion, Source, version_id,
};
pub use version::{MASTER_VERSION, Stability};

use std::future::Future;
use std::pin::Pin;

/// Boxed future used at the object-safe async seams (remote, database, queue).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
