//! Builders for addresses, engines and scripted event streams.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prism_domain::{Address, AssetKey, ChainEvent, OrderId, UserTokenId};
use prism_engine::{ClaimValidator, Engine, FeeSchedule};
use prism_sync::{EventEnvelope, EventId, EventPosition, EventSource, SyncError};
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Build an address, panicking on malformed test input.
pub fn addr(s: &str) -> Address {
    Address::new(s).expect("valid test address")
}

/// Build an asset key from a contract address and asset id.
pub fn asset(contract: &str, asset_id: u128) -> AssetKey {
    AssetKey { contract: addr(contract), asset_id }
}

/// A verification payload the reference validator accepts.
pub fn claim_payload(amount: &str, standard: &str) -> serde_json::Value {
    json!({"amount": amount, "standard": standard})
}

/// Zero-fee engine with the reference validator accepting `erc1155`.
pub fn test_engine() -> Engine {
    Engine::new(
        FeeSchedule::free(addr("0xfeec011ec")),
        Box::new(ClaimValidator::new(["erc1155"])),
    )
}

/// A shared handle to a fresh test engine, as the daemon holds it.
pub fn shared_engine() -> Arc<RwLock<Engine>> {
    Arc::new(RwLock::new(test_engine()))
}

/// Scripted stream of finalized events with auto-advancing positions.
///
/// Every emitted envelope gets the next `(block, index)` slot and a
/// deterministic transaction hash and timestamp derived from it, so
/// scripted streams are reproducible and totally ordered by
/// construction.
pub struct EventScript {
    block: u64,
    index: u32,
}

impl EventScript {
    /// Start a script at block 1.
    pub fn new() -> Self {
        Self { block: 1, index: 0 }
    }

    /// Start a script at a given block (for resume scenarios).
    pub fn starting_at(block: u64) -> Self {
        Self { block, index: 0 }
    }

    /// Close the current block; the next event lands in a new one.
    pub fn next_block(&mut self) {
        self.block += 1;
        self.index = 0;
    }

    /// Wrap an event in an envelope at the next position.
    pub fn emit(&mut self, event: ChainEvent) -> EventEnvelope {
        let position = EventPosition { block: self.block, index: self.index };
        self.index += 1;
        EventEnvelope {
            id: EventId {
                tx_hash: format!("0x{:08x}{:04x}", position.block, position.index),
                log_index: position.index,
            },
            position,
            occurred_at: timestamp_for(position),
            event,
        }
    }

    /// A projection mint with an optional verification payload.
    pub fn projected(
        &mut self,
        owner: &Address,
        amount: Decimal,
        verification: Option<serde_json::Value>,
    ) -> EventEnvelope {
        self.emit(ChainEvent::Projected {
            owner: owner.clone(),
            amount,
            verification,
        })
    }

    /// A burn against an existing projection.
    pub fn burned(
        &mut self,
        owner: &Address,
        user_token_id: UserTokenId,
        amount: Decimal,
    ) -> EventEnvelope {
        self.emit(ChainEvent::Burned {
            owner: owner.clone(),
            user_token_id,
            amount,
        })
    }

    /// A zero-fee sell order creation.
    pub fn order_created(
        &mut self,
        order_id: OrderId,
        asset: &AssetKey,
        seller: &Address,
        amount: Decimal,
        price_per_asset: Decimal,
    ) -> EventEnvelope {
        self.emit(ChainEvent::OrderCreated {
            order_id,
            asset: asset.clone(),
            seller: seller.clone(),
            amount,
            price_per_asset,
            maker_fee_bp: 0,
            taker_fee_bp: 0,
            creation_fee_paid: Decimal::ZERO,
        })
    }

    /// A fee-free fill against a resting order.
    pub fn order_filled(
        &mut self,
        order_id: OrderId,
        buyer: &Address,
        amount: Decimal,
    ) -> EventEnvelope {
        self.emit(ChainEvent::OrderFilled {
            order_id,
            buyer: buyer.clone(),
            amount,
            maker_fee_collected: Decimal::ZERO,
            taker_fee_collected: Decimal::ZERO,
        })
    }

    /// A seller-side cancellation.
    pub fn order_cancelled(&mut self, order_id: OrderId) -> EventEnvelope {
        self.emit(ChainEvent::OrderCancelled { order_id })
    }
}

impl Default for EventScript {
    fn default() -> Self {
        Self::new()
    }
}

fn timestamp_for(position: EventPosition) -> DateTime<Utc> {
    // Twelve-second blocks from a fixed genesis keep scripts stable.
    let secs = 1_700_000_000 + (position.block as i64) * 12;
    DateTime::from_timestamp(secs, 0).expect("scripted timestamp in range")
}

/// An `EventSource` that serves pre-built batches in order.
pub struct ScriptedSource {
    batches: VecDeque<Vec<EventEnvelope>>,
}

impl ScriptedSource {
    /// Serve the given batches, then end the stream.
    pub fn new(batches: Vec<Vec<EventEnvelope>>) -> Self {
        Self { batches: batches.into() }
    }

    /// Serve one batch, then end the stream.
    pub fn single(batch: Vec<EventEnvelope>) -> Self {
        Self::new(vec![batch])
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<EventEnvelope>>, SyncError> {
        Ok(self.batches.pop_front())
    }
}
