//! Metadata store for Tug.
//!
//! Records live in a key-value [`Database`] under namespaced ids
//! (`package:acme/foo@1.0.0.0`, `repository:https://github.com/acme/foo.git`).
//! Listings use keyset pagination: each page reports the id to resume after.

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod engine;
pub mod memory;
pub mod packages;
pub mod repositories;
pub mod repository;

pub use engine::{Criteria, Database, Record, Results};
pub use memory::MemoryDatabase;
pub use packages::{PackageRepository, WriteOutcome};
pub use repositories::{RepositoryRecord, RepositoryRepository};
pub use repository::{DatabaseRepository, Page};
