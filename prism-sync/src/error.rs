//! Synchronizer faults.
//!
//! Every variant here is fatal to the sync loop: shape breaks, order
//! breaks and divergence all mean the mirror can no longer trust its
//! input and must stop rather than drift. Content problems inside a
//! well-formed event never surface here.

use crate::envelope::EventPosition;
use prism_store::StoreError;
use thiserror::Error;

/// Fatal faults in the chain event stream or its durability layer.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Delivery could not be decoded into an envelope
    #[error("malformed event envelope: {0}")]
    MalformedEnvelope(String),

    /// An event arrived out of the chain's total order
    #[error("event at {position} breaks total order (previous {previous})")]
    OutOfOrder {
        /// Position of the offending event
        position: EventPosition,
        /// Position it should have strictly followed
        previous: EventPosition,
    },

    /// A replayed event at the cursor position carries different content
    #[error("divergent replay at {position}: applied digest {applied}, replayed digest {replayed}")]
    DivergentReplay {
        /// Replayed position
        position: EventPosition,
        /// Digest recorded when the event was first applied
        applied: String,
        /// Digest of the replayed delivery
        replayed: String,
    },

    /// The event source failed to deliver
    #[error("event source failure: {0}")]
    Source(String),

    /// Checkpoint or fact-log persistence failed
    #[error(transparent)]
    Store(#[from] StoreError),
}
