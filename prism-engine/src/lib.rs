//! Prism Engine Layer
//!
//! Deterministic core of the projection and order-settlement system:
//! pure functions of (current state, next input), no I/O, no clock, no
//! unordered iteration. Multiple nodes consuming the same event stream
//! through this engine produce identical state.

#![warn(clippy::all)]

pub mod book;
pub mod capabilities;
pub mod engine;
pub mod error;
pub mod fees;
pub mod ledger;
pub mod matcher;
pub mod registry;
pub mod validity;

pub use book::{CancelReceipt, OrderBook, OrderParams};
pub use capabilities::{AssetReceiver, MetadataNotifier};
pub use engine::Engine;
pub use error::{EngineError, ErrorClass, Result};
pub use fees::{FeeRates, FeeSchedule};
pub use ledger::SettlementLedger;
pub use matcher::{FillLeg, FillMode, FillPlan, FillReceipt};
pub use registry::ProjectionRegistry;
pub use validity::{ClaimValidator, MintValidator, ValidityOutcome};
