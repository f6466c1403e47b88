//! Settlement ledger: claim-based accounting of proceeds and fees.
//!
//! Fill settlement credits a balance here instead of pushing funds to
//! the recipient synchronously, so a failing or griefing recipient can
//! never block settlement of other orders in the same batch fill.
//! Balances only move out through an explicit full-balance claim.

use prism_domain::Address;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Per-address claimable balances.
#[derive(Debug, Default)]
pub struct SettlementLedger {
    balances: BTreeMap<Address, Decimal>,
}

impl SettlementLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accrue `amount` to `address`. Monotonic; zero credits are dropped.
    pub fn credit(&mut self, address: &Address, amount: Decimal) {
        if amount <= Decimal::ZERO {
            return;
        }
        *self.balances.entry(address.clone()).or_insert(Decimal::ZERO) += amount;
    }

    /// Current claimable balance.
    pub fn balance(&self, address: &Address) -> Decimal {
        self.balances.get(address).copied().unwrap_or(Decimal::ZERO)
    }

    /// Atomically read and zero the balance, returning the amount to
    /// transfer out. Claiming a zero balance succeeds and returns zero.
    pub fn claim(&mut self, address: &Address) -> Decimal {
        self.balances.remove(address).unwrap_or(Decimal::ZERO)
    }

    /// Sum of all outstanding balances.
    pub fn total_outstanding(&self) -> Decimal {
        self.balances.values().copied().sum()
    }
}
