//! Strictly sequential application of finalized chain events.
//!
//! The synchronizer owns the only write path into the engine mirror:
//! events are applied one at a time in the chain's total order, facts
//! are drained into the durable log after each event, and the cursor is
//! persisted once per batch. On restart it resumes from the persisted
//! cursor; deliveries at or below it are replays and must be no-ops.

use crate::envelope::{EventEnvelope, EventPosition};
use crate::error::SyncError;
use prism_domain::ChainEvent;
use prism_engine::Engine;
use prism_store::{CheckpointStore, Cursor, FactLog};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Counters for one applied batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Events newly applied to the mirror
    pub applied: usize,
    /// Redeliveries skipped as already applied
    pub replayed: usize,
}

/// Drives the engine mirror from an ordered event stream.
pub struct Synchronizer<C, F> {
    engine: Arc<RwLock<Engine>>,
    checkpoints: C,
    fact_log: F,
    cursor: Option<Cursor>,
}

impl<C: CheckpointStore, F: FactLog> Synchronizer<C, F> {
    /// Create a synchronizer, resuming from the persisted cursor if any.
    ///
    /// The cursor must be at least as durable as the mirror it
    /// describes: everything at or below it is treated as already
    /// applied. Pairing a persistent `CheckpointStore` with a freshly
    /// constructed engine therefore requires rebuilding the mirror
    /// first (replaying the fact log or the chain from genesis);
    /// otherwise the empty mirror would claim to be caught up.
    pub async fn resume(
        engine: Arc<RwLock<Engine>>,
        checkpoints: C,
        fact_log: F,
    ) -> Result<Self, SyncError> {
        let cursor = checkpoints.load().await?;
        match &cursor {
            Some(cursor) => tracing::info!(
                block = cursor.block,
                index = cursor.index,
                "resuming from persisted cursor"
            ),
            None => tracing::info!("no persisted cursor, starting from genesis"),
        }
        Ok(Self { engine, checkpoints, fact_log, cursor })
    }

    /// The shared engine handle (read access for query surfaces).
    pub fn engine(&self) -> Arc<RwLock<Engine>> {
        Arc::clone(&self.engine)
    }

    /// The current high-water mark.
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    /// Apply a batch of envelopes in order.
    ///
    /// The engine write lock is held for the whole batch, so readers
    /// observe either the pre-batch or post-batch state. The cursor is
    /// persisted once, after the last event; a crash mid-batch replays
    /// the batch from its start, which the replay rules make harmless.
    ///
    /// # Errors
    /// Any `SyncError` is fatal: state may include a prefix of the
    /// batch, but the cursor only ever points at fully applied events.
    pub async fn apply_batch(&mut self, envelopes: &[EventEnvelope]) -> Result<BatchStats, SyncError> {
        let mut stats = BatchStats::default();
        if envelopes.is_empty() {
            return Ok(stats);
        }

        // Replays are only legitimate up to the cursor as of batch
        // start; within the batch, order must be strictly ascending.
        let durable_floor = self.cursor.as_ref().map(position_of);
        let mut last_applied = durable_floor;

        let mut engine = self.engine.write().await;
        for envelope in envelopes {
            let digest = envelope.digest()?;

            if let Some(floor) = durable_floor {
                if envelope.position < floor {
                    stats.replayed += 1;
                    continue;
                }
                if envelope.position == floor {
                    // Only the last applied digest is retained, so the
                    // divergence check is exact at the cursor position.
                    let applied = self
                        .cursor
                        .as_ref()
                        .map(|cursor| cursor.digest.clone())
                        .unwrap_or_default();
                    if digest != applied {
                        return Err(SyncError::DivergentReplay {
                            position: envelope.position,
                            applied,
                            replayed: digest,
                        });
                    }
                    stats.replayed += 1;
                    continue;
                }
            }

            if let Some(previous) = last_applied {
                if envelope.position <= previous {
                    return Err(SyncError::OutOfOrder {
                        position: envelope.position,
                        previous,
                    });
                }
            }

            dispatch(&mut engine, envelope);

            let facts = engine.drain_facts();
            if !facts.is_empty() {
                self.fact_log
                    .append(envelope.position.block, envelope.position.index, &facts)
                    .await?;
            }

            self.cursor = Some(Cursor {
                block: envelope.position.block,
                index: envelope.position.index,
                tx_hash: envelope.id.tx_hash.clone(),
                log_index: envelope.id.log_index,
                digest,
            });
            last_applied = Some(envelope.position);
            stats.applied += 1;
        }
        drop(engine);

        if stats.applied > 0 {
            if let Some(cursor) = &self.cursor {
                self.checkpoints.save(cursor).await?;
            }
        }

        tracing::debug!(applied = stats.applied, replayed = stats.replayed, "batch applied");
        Ok(stats)
    }
}

/// Route one event into the mirror.
///
/// Content rejections (unknown ids, non-positive amounts) are logged
/// and absorbed: the chain already linearized the transition, and a
/// mirror that has not observed some prefix must not halt on it. Only
/// envelope shape and ordering faults stop the loop, and those are
/// handled by the caller.
fn dispatch(engine: &mut Engine, envelope: &EventEnvelope) {
    let outcome = match envelope.event.clone() {
        ChainEvent::Projected { owner, amount, verification } => engine
            .register_projection(owner, amount, verification.as_ref())
            .map(|_| ()),
        ChainEvent::Burned { owner, user_token_id, amount } => {
            engine.record_burn(&owner, user_token_id, amount).map(|_| ())
        }
        ChainEvent::OrderCreated {
            order_id,
            asset,
            seller,
            amount,
            price_per_asset,
            maker_fee_bp,
            taker_fee_bp,
            creation_fee_paid,
        } => engine
            .absorb_order_created(
                order_id,
                asset,
                seller,
                amount,
                price_per_asset,
                maker_fee_bp,
                taker_fee_bp,
                creation_fee_paid,
            )
            .map(|_| ()),
        ChainEvent::OrderFilled {
            order_id,
            buyer,
            amount,
            maker_fee_collected,
            taker_fee_collected,
        } => engine.absorb_order_filled(
            order_id,
            buyer,
            amount,
            maker_fee_collected,
            taker_fee_collected,
        ),
        ChainEvent::OrderCancelled { order_id } => engine.absorb_order_cancelled(order_id),
    };

    if let Err(err) = outcome {
        tracing::warn!(
            position = %envelope.position,
            error = %err,
            "event content rejected by the mirror, absorbed"
        );
    }
}

fn position_of(cursor: &Cursor) -> EventPosition {
    EventPosition { block: cursor.block, index: cursor.index }
}
