//! Finalized event envelopes.
//!
//! The base chain delivers events wrapped in an envelope that carries
//! their total order and origin. Envelope shape is a hard contract:
//! a delivery that cannot be decoded is an infrastructure fault, not
//! content to absorb.

use crate::error::SyncError;
use chrono::{DateTime, Utc};
use prism_domain::ChainEvent;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Origin of an event within its transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventId {
    /// Transaction the event was emitted from
    pub tx_hash: String,
    /// Log position within that transaction
    pub log_index: u32,
}

/// Position of an event in the chain's total order.
///
/// Ordered by block, then by index within the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventPosition {
    /// Finalized block height
    pub block: u64,
    /// Position within the block
    pub index: u32,
}

impl std::fmt::Display for EventPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.block, self.index)
    }
}

/// A finalized chain event with its position and origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Origin transaction and log position
    pub id: EventId,
    /// Position in the chain's total order
    pub position: EventPosition,
    /// Finalization timestamp reported by the chain
    pub occurred_at: DateTime<Utc>,
    /// The event payload
    pub event: ChainEvent,
}

impl EventEnvelope {
    /// Decode an envelope from its raw JSON delivery.
    ///
    /// # Errors
    /// `MalformedEnvelope` on any shape mismatch. Callers must treat
    /// this as fatal: skipping an undecodable delivery would silently
    /// break the total order.
    pub fn decode(raw: &serde_json::Value) -> Result<Self, SyncError> {
        serde_json::from_value(raw.clone())
            .map_err(|err| SyncError::MalformedEnvelope(err.to_string()))
    }

    /// Content digest of the envelope.
    ///
    /// Replays claiming an already-applied position are compared by
    /// digest: same digest means a harmless redelivery, a different one
    /// means the source diverged from what was applied.
    pub fn digest(&self) -> Result<String, SyncError> {
        let bytes = serde_json::to_vec(self)
            .map_err(|err| SyncError::MalformedEnvelope(err.to_string()))?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_domain::{Address, OrderId};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn envelope() -> EventEnvelope {
        EventEnvelope {
            id: EventId { tx_hash: "0x01".to_string(), log_index: 0 },
            position: EventPosition { block: 7, index: 1 },
            occurred_at: DateTime::parse_from_rfc3339("2024-05-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            event: ChainEvent::OrderCancelled { order_id: OrderId(4) },
        }
    }

    #[test]
    fn positions_order_by_block_then_index() {
        let a = EventPosition { block: 1, index: 9 };
        let b = EventPosition { block: 2, index: 0 };
        let c = EventPosition { block: 2, index: 1 };
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn digest_is_deterministic_and_content_sensitive() {
        let env = envelope();
        assert_eq!(env.digest().unwrap(), env.digest().unwrap());

        let mut other = envelope();
        other.event = ChainEvent::Burned {
            owner: Address::new("0xaa").unwrap(),
            user_token_id: prism_domain::UserTokenId(1),
            amount: dec!(1),
        };
        assert_ne!(env.digest().unwrap(), other.digest().unwrap());
    }

    #[test]
    fn decode_rejects_malformed_shape() {
        let raw = json!({"position": {"block": 1, "index": 0}});
        let err = EventEnvelope::decode(&raw).unwrap_err();
        assert!(matches!(err, SyncError::MalformedEnvelope(_)));
    }

    #[test]
    fn decode_round_trips() {
        let env = envelope();
        let raw = serde_json::to_value(&env).unwrap();
        assert_eq!(EventEnvelope::decode(&raw).unwrap(), env);
    }
}
