//! Offline request queue.
//!
//! This crate provides:
//! - OfflineOutbox: facade that sends mutating calls now or defers them
//!   while offline, and drains the backlog on every reconnect
//! - Dispatcher: the Idle/Draining state machine with FIFO replay,
//!   existence-probe deduplication and stop-on-failure
//! - QueueStore: JSON mirror of the queue in a durable key-value store
//! - HttpTransport: `reqwest` implementation of the [`Transport`] seam

mod dispatcher;
mod error;
mod outbox;
mod record;
mod sender;
mod store;
mod transport;

#[cfg(test)]
mod tests;

pub use dispatcher::{
    Dispatcher, DispatcherState, DrainOutcome, DrainReport, StopReason, Submission,
};
pub use error::{OutboxError, OutboxResult};
pub use outbox::{OfflineOutbox, OutboxConfig, QueueStatus};
pub use record::{RequestMethod, RequestRecord};
pub use sender::{HttpTransport, SenderConfig};
pub use store::QueueStore;
pub use transport::{Transport, TransportError, TransportResponse};
