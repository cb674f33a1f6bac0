//! Job queue for Tug.
//!
//! Refreshing a repository is split into many small jobs: one
//! `refresh-packages` message fans out into one `refresh-package` message per
//! branch and tag. Messages are routed to the first subscribed
//! [`QueueReceiver`] that supports them.

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod message;
pub mod queue;
pub mod receiver;

pub use message::Message;
pub use queue::{LocalMessageQueue, MessageQueue};
pub use receiver::{QueueReceiver, ReceiveReport, Receivers};
