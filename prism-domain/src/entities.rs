//! Entities for the Prism domain.
//!
//! A `ProjectionRecord` is one inverse-projected asset unit tracked by
//! the registry; an `Order` is one resting sell order in the book.

use crate::value_objects::{Address, AssetKey, BasisPoints, OrderId, Price, Quantity, UserTokenId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Projection
// =============================================================================

/// Validity of a projection against the authoritative game state.
///
/// Resolved asynchronously by game-specific verification logic and
/// monotonic once decided: `Unknown` may become `Valid` or `Invalid`,
/// after which the outcome is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validity {
    /// Not yet resolved; queries report "not yet available"
    Unknown,
    /// The projection's verification payload checked out
    Valid,
    /// The payload failed verification; recorded as data, never an error
    Invalid,
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Validity::Unknown => "unknown",
            Validity::Valid => "valid",
            Validity::Invalid => "invalid",
        };
        write!(f, "{s}")
    }
}

/// A single inverse-projected asset unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRecord {
    /// Address that initiated the projection
    pub owner: Address,
    /// Per-owner sequential identifier, never reused
    pub user_token_id: UserTokenId,
    /// Quantity locked/claimed at projection time
    pub initial_amount: Quantity,
    /// Quantity still represented on the base chain
    pub current_amount: Decimal,
    /// Resolution state of game-side verification
    pub validity: Validity,
}

impl ProjectionRecord {
    /// Create a fresh record with validity pending resolution.
    pub fn new(owner: Address, user_token_id: UserTokenId, initial_amount: Quantity) -> Self {
        Self {
            owner,
            user_token_id,
            current_amount: initial_amount.as_decimal(),
            initial_amount,
            validity: Validity::Unknown,
        }
    }

    /// True once every unit has been burned back off the base chain.
    pub fn is_fully_burned(&self) -> bool {
        self.current_amount.is_zero()
    }
}

// =============================================================================
// Order
// =============================================================================

/// Lifecycle status of a sell order, derived from its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Still has unsold quantity
    Active,
    /// Cancelled by the seller; terminal
    Cancelled,
    /// Fully consumed by fills; terminal
    Filled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Active => "active",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Filled => "filled",
        };
        write!(f, "{s}")
    }
}

/// A resting sell order.
///
/// Fee rates are snapshotted from the fee schedule at creation and are
/// immutable for the life of the order; later schedule changes never
/// retroactively affect a resting order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Globally sequential identifier
    pub order_id: OrderId,
    /// Unit being sold
    pub asset: AssetKey,
    /// Owning address
    pub seller: Address,
    /// Quantity escrowed at creation
    pub created_amount: Quantity,
    /// Remaining unsold quantity; 0 once terminal
    pub remaining_amount: Decimal,
    /// Unit price, fixed at creation
    pub price_per_asset: Price,
    /// Maker rate snapshotted at creation
    pub maker_fee_bp: BasisPoints,
    /// Taker rate snapshotted at creation
    pub taker_fee_bp: BasisPoints,
    /// Flat anti-spam fee paid at creation
    pub creation_fee_paid: Decimal,
    /// Set on the first fill; a forfeited fee is never refunded on cancel
    pub creation_fee_forfeited: bool,
    /// Explicit cancelled flag (remaining_amount alone cannot distinguish
    /// cancelled from fully filled)
    pub cancelled: bool,
}

impl Order {
    /// Derive the lifecycle status.
    pub fn status(&self) -> OrderStatus {
        if self.cancelled {
            OrderStatus::Cancelled
        } else if self.remaining_amount.is_zero() {
            OrderStatus::Filled
        } else {
            OrderStatus::Active
        }
    }

    /// True while the order can still be filled or cancelled.
    pub fn is_active(&self) -> bool {
        self.status() == OrderStatus::Active
    }
}
