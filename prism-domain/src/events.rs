//! Chain events and emitted facts.
//!
//! `ChainEvent` is a finalized fact consumed from the base chain by the
//! synchronizer. `Fact` is what the engine emits for external indexers
//! and front-ends. Both are immutable records; serialized forms are part
//! of the external interface.

use crate::value_objects::{Address, AssetKey, OrderId, UserTokenId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A finalized, ordered fact from the base chain.
///
/// Amounts and rates are carried raw: the chain is authoritative and the
/// mirror must absorb content rather than reject it. Shape validation
/// (the envelope) is the synchronizer's job; content validation is the
/// engine's, and never fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChainEvent {
    /// A game-chain-initiated projection was minted on the base chain
    Projected {
        /// Address that initiated the projection
        owner: Address,
        /// Quantity locked/claimed at projection time
        amount: Decimal,
        /// Game-specific verification payload, if any accompanied the mint
        verification: Option<serde_json::Value>,
    },

    /// Projected units were burned back off the base chain
    Burned {
        /// Projection owner
        owner: Address,
        /// Projection identifier within the owner's sequence
        user_token_id: UserTokenId,
        /// Quantity burned
        amount: Decimal,
    },

    /// A sell order was created on the base chain
    OrderCreated {
        /// Chain-assigned order identifier
        order_id: OrderId,
        /// Unit being sold
        asset: AssetKey,
        /// Owning address
        seller: Address,
        /// Escrowed quantity
        amount: Decimal,
        /// Unit price
        price_per_asset: Decimal,
        /// Maker rate snapshotted on-chain at creation
        maker_fee_bp: u32,
        /// Taker rate snapshotted on-chain at creation
        taker_fee_bp: u32,
        /// Flat creation fee paid by the seller
        creation_fee_paid: Decimal,
    },

    /// An order was (partially) filled on the base chain
    OrderFilled {
        /// Order consumed
        order_id: OrderId,
        /// Buying address
        buyer: Address,
        /// Quantity consumed by this fill
        amount: Decimal,
        /// Maker fee withheld from the seller's proceeds
        maker_fee_collected: Decimal,
        /// Taker fee charged on top of the buyer's cost
        taker_fee_collected: Decimal,
    },

    /// An order was cancelled by its seller on the base chain
    OrderCancelled {
        /// Cancelled order
        order_id: OrderId,
    },
}

/// A fact emitted by the engine for external indexers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Fact {
    /// A projection was registered and assigned its sequential id
    Projected {
        /// Projection owner
        owner: Address,
        /// Assigned per-owner identifier
        user_token_id: UserTokenId,
        /// Locked quantity
        amount: Decimal,
    },

    /// Projected units were burned
    Burned {
        /// Projection owner
        owner: Address,
        /// Projection identifier
        user_token_id: UserTokenId,
        /// Quantity actually burned (after clamping)
        amount: Decimal,
    },

    /// A sell order entered the book
    OrderCreated {
        /// Order identifier
        order_id: OrderId,
        /// Unit being sold
        asset: AssetKey,
        /// Owning address
        seller: Address,
        /// Escrowed quantity
        amount: Decimal,
        /// Unit price
        price_per_asset: Decimal,
        /// Snapshotted maker rate
        maker_fee_bp: u32,
        /// Snapshotted taker rate
        taker_fee_bp: u32,
    },

    /// An order was (partially) consumed
    OrderFilled {
        /// Order consumed
        order_id: OrderId,
        /// Selling address
        seller: Address,
        /// Buying address
        buyer: Address,
        /// Quantity consumed
        amount_filled: Decimal,
        /// Unit price of the order
        price_per_asset: Decimal,
        /// Maker fee withheld from proceeds
        maker_fee_collected: Decimal,
        /// Taker fee added to the buyer's cost
        taker_fee_collected: Decimal,
    },

    /// An order was cancelled and its escrow returned
    OrderCancelled {
        /// Cancelled order
        order_id: OrderId,
    },

    /// A settlement balance was withdrawn in full
    BalanceClaimed {
        /// Claiming address
        address: Address,
        /// Amount transferred out
        amount: Decimal,
    },

    /// Cache-invalidation announcement for token-URI consumers
    MetadataUpdated {
        /// Asset whose metadata should be re-fetched
        asset: AssetKey,
    },
}
