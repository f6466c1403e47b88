//! Event source port and the sync loop.

use crate::envelope::EventEnvelope;
use crate::error::SyncError;
use crate::synchronizer::Synchronizer;
use async_trait::async_trait;
use prism_store::{CheckpointStore, FactLog};

/// A feed of finalized, ordered event batches.
///
/// Implementations wrap whatever delivers chain events (a node
/// subscription, a queue, a test script). Returning `None` ends the
/// stream and the loop.
#[async_trait]
pub trait EventSource: Send {
    /// The next batch, or `None` when the stream is exhausted.
    async fn next_batch(&mut self) -> Result<Option<Vec<EventEnvelope>>, SyncError>;
}

/// Drain a source into the synchronizer until it is exhausted.
///
/// # Errors
/// Stops on the first `SyncError`; the cursor still points at the last
/// fully applied event, so a fixed source can resume from there.
pub async fn run<C, F, S>(
    synchronizer: &mut Synchronizer<C, F>,
    source: &mut S,
) -> Result<(), SyncError>
where
    C: CheckpointStore,
    F: FactLog,
    S: EventSource,
{
    while let Some(batch) = source.next_batch().await? {
        synchronizer.apply_batch(&batch).await?;
    }
    Ok(())
}
