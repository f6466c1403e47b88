//! # Prism Sync
//!
//! Chain event synchronizer: decodes finalized event envelopes,
//! applies them to the engine mirror in the chain's total order, and
//! maintains the durable cursor and fact log that make restarts and
//! redeliveries harmless.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod envelope;
pub mod error;
pub mod source;
pub mod synchronizer;

pub use envelope::{EventEnvelope, EventId, EventPosition};
pub use error::SyncError;
pub use source::{run, EventSource};
pub use synchronizer::{BatchStats, Synchronizer};
