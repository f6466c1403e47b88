//! Fee schedule: per-asset and default maker/taker rates plus the flat
//! order-creation fee.
//!
//! Pure configuration state. Rates are read (and snapshotted into the
//! order) at creation time only; mutating the schedule never touches a
//! resting order.

use prism_domain::{Address, AssetKey, BasisPoints};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maker/taker rate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRates {
    /// Deducted from the seller's proceeds at fill time
    pub maker_bp: BasisPoints,
    /// Added to the buyer's cost at fill time
    pub taker_bp: BasisPoints,
}

/// Fee configuration read by the order book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    default_rates: FeeRates,
    overrides: BTreeMap<AssetKey, FeeRates>,
    creation_fee: Decimal,
    fee_collector: Address,
}

impl FeeSchedule {
    /// Create a schedule with the given defaults.
    pub fn new(default_rates: FeeRates, creation_fee: Decimal, fee_collector: Address) -> Self {
        Self {
            default_rates,
            overrides: BTreeMap::new(),
            creation_fee,
            fee_collector,
        }
    }

    /// Zero-fee schedule, useful for tests and permissive deployments.
    pub fn free(fee_collector: Address) -> Self {
        Self::new(
            FeeRates { maker_bp: BasisPoints::ZERO, taker_bp: BasisPoints::ZERO },
            Decimal::ZERO,
            fee_collector,
        )
    }

    /// Rates for an asset: the override if one exists, else the defaults.
    pub fn rates_for(&self, asset: &AssetKey) -> FeeRates {
        self.overrides.get(asset).copied().unwrap_or(self.default_rates)
    }

    /// Set a per-asset override.
    pub fn set_override(&mut self, asset: AssetKey, rates: FeeRates) {
        self.overrides.insert(asset, rates);
    }

    /// Remove a per-asset override, falling back to the defaults.
    pub fn clear_override(&mut self, asset: &AssetKey) {
        self.overrides.remove(asset);
    }

    /// Replace the default rates.
    pub fn set_default_rates(&mut self, rates: FeeRates) {
        self.default_rates = rates;
    }

    /// Replace the flat creation fee.
    pub fn set_creation_fee(&mut self, fee: Decimal) {
        self.creation_fee = fee;
    }

    /// Flat anti-spam fee owed per created order.
    pub fn creation_fee(&self) -> Decimal {
        self.creation_fee
    }

    /// Address that accrues protocol fees in the settlement ledger.
    pub fn fee_collector(&self) -> &Address {
        &self.fee_collector
    }
}
