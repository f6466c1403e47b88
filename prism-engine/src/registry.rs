//! Projection registry.
//!
//! Assigns per-owner sequential token identifiers for game-chain
//! initiated projections and tracks locked amounts and validity.
//!
//! INVARIANT: for a fixed owner, issued ids are a contiguous sequence
//! `1, 2, 3, …` with no gaps and no duplicates, regardless of how the
//! projection later resolves. Registration must never fail on payload
//! content — only on malformed input shape, which is a caller bug.

use crate::error::{EngineError, Result};
use prism_domain::{Address, ProjectionRecord, Quantity, UserTokenId, Validity};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Registry of inverse-projected assets, keyed by `(owner, user_token_id)`.
///
/// All iteration is over ordered maps so that independent nodes replaying
/// the same event stream produce identical read output.
#[derive(Debug, Default)]
pub struct ProjectionRegistry {
    records: BTreeMap<(Address, UserTokenId), ProjectionRecord>,
    next_ids: BTreeMap<Address, UserTokenId>,
}

impl ProjectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next sequential id for `owner` and store a fresh
    /// record with validity pending.
    ///
    /// Infallible by design: validity problems are resolved later as
    /// data, never by rejecting the registration, because rejecting
    /// would desynchronize the id sequence across game variants.
    pub fn register(&mut self, owner: Address, amount: Quantity) -> UserTokenId {
        let next = self
            .next_ids
            .entry(owner.clone())
            .or_insert(UserTokenId::FIRST);
        let id = *next;
        *next = next.next();

        let record = ProjectionRecord::new(owner.clone(), id, amount);
        self.records.insert((owner, id), record);
        id
    }

    /// Decrease a projection's remaining amount after a burn.
    ///
    /// Returns the quantity actually burned. A record that is already
    /// fully burned is a no-op success (idempotent under event replay).
    /// A burn larger than the locally remaining amount clamps to zero:
    /// the chain is authoritative and the mirror must not reject it.
    ///
    /// # Errors
    /// `ProjectionNotFound` if no record is locally known for the id.
    /// Expected and non-fatal: the local mirror may simply not have
    /// observed the projection yet.
    pub fn record_burn(
        &mut self,
        owner: &Address,
        user_token_id: UserTokenId,
        amount: Decimal,
    ) -> Result<Decimal> {
        let record = self
            .records
            .get_mut(&(owner.clone(), user_token_id))
            .ok_or_else(|| EngineError::ProjectionNotFound {
                owner: owner.clone(),
                user_token_id,
            })?;

        if record.is_fully_burned() {
            return Ok(Decimal::ZERO);
        }

        let burned = if amount > record.current_amount {
            tracing::warn!(
                %owner,
                %user_token_id,
                requested = %amount,
                remaining = %record.current_amount,
                "burn exceeds locally remaining amount, clamping"
            );
            record.current_amount
        } else {
            amount
        };
        record.current_amount -= burned;
        Ok(burned)
    }

    /// Record a validity resolution. Monotonic: once decided, further
    /// resolutions are no-ops.
    pub(crate) fn set_validity(
        &mut self,
        owner: &Address,
        user_token_id: UserTokenId,
        validity: Validity,
    ) {
        if let Some(record) = self.records.get_mut(&(owner.clone(), user_token_id)) {
            if record.validity == Validity::Unknown && validity != Validity::Unknown {
                record.validity = validity;
            }
        }
    }

    /// Look up a single record.
    pub fn get(&self, owner: &Address, user_token_id: UserTokenId) -> Option<&ProjectionRecord> {
        self.records.get(&(owner.clone(), user_token_id))
    }

    /// All records for an owner, in id order.
    pub fn owner_projections(&self, owner: &Address) -> Vec<ProjectionRecord> {
        self.records
            .range((owner.clone(), UserTokenId::FIRST)..=(owner.clone(), UserTokenId(u64::MAX)))
            .map(|(_, record)| record.clone())
            .collect()
    }

    /// Number of records ever registered.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn owner(tag: &str) -> Address {
        Address::new(tag).unwrap()
    }

    fn qty(v: Decimal) -> Quantity {
        Quantity::new(v).unwrap()
    }

    #[test]
    fn ids_are_contiguous_per_owner() {
        let mut registry = ProjectionRegistry::new();
        let alice = owner("0xa11ce");
        let bob = owner("0xb0b");

        assert_eq!(registry.register(alice.clone(), qty(dec!(1))), UserTokenId(1));
        assert_eq!(registry.register(bob.clone(), qty(dec!(4))), UserTokenId(1));
        assert_eq!(registry.register(alice.clone(), qty(dec!(2))), UserTokenId(2));
        assert_eq!(registry.register(alice.clone(), qty(dec!(3))), UserTokenId(3));

        let ids: Vec<u64> = registry
            .owner_projections(&alice)
            .iter()
            .map(|r| r.user_token_id.0)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn burn_is_idempotent_once_fully_burned() {
        let mut registry = ProjectionRegistry::new();
        let alice = owner("0xa11ce");
        let id = registry.register(alice.clone(), qty(dec!(5)));

        assert_eq!(registry.record_burn(&alice, id, dec!(5)).unwrap(), dec!(5));
        // Replay: already fully burned, no-op success
        assert_eq!(registry.record_burn(&alice, id, dec!(5)).unwrap(), dec!(0));
        assert!(registry.get(&alice, id).unwrap().is_fully_burned());
    }

    #[test]
    fn burn_clamps_to_remaining() {
        let mut registry = ProjectionRegistry::new();
        let alice = owner("0xa11ce");
        let id = registry.register(alice.clone(), qty(dec!(3)));

        assert_eq!(registry.record_burn(&alice, id, dec!(10)).unwrap(), dec!(3));
        assert_eq!(registry.get(&alice, id).unwrap().current_amount, dec!(0));
    }

    #[test]
    fn burn_of_unknown_projection_is_not_found() {
        let mut registry = ProjectionRegistry::new();
        let err = registry
            .record_burn(&owner("0xa11ce"), UserTokenId(1), dec!(1))
            .unwrap_err();
        assert!(matches!(err, EngineError::ProjectionNotFound { .. }));
    }

    #[test]
    fn validity_is_monotonic() {
        let mut registry = ProjectionRegistry::new();
        let alice = owner("0xa11ce");
        let id = registry.register(alice.clone(), qty(dec!(1)));

        registry.set_validity(&alice, id, Validity::Invalid);
        registry.set_validity(&alice, id, Validity::Valid);
        assert_eq!(registry.get(&alice, id).unwrap().validity, Validity::Invalid);
    }
}
