//! Mint validity resolution.
//!
//! A projection's verification payload is checked by game-specific logic
//! *after* registration. The resolution step must never cause the
//! registration to fail or roll back: the same payload may be valid
//! under a different ruleset run by a different game variant, and
//! rejecting it would desynchronize the id sequence across variants.
//! An invalid payload is therefore recorded as data, and a payload that
//! cannot be decided yet is simply deferred.

use crate::registry::ProjectionRegistry;
use prism_domain::{Address, ProjectionRecord, UserTokenId, Validity};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::str::FromStr;

/// Outcome of running a ruleset over a projection's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidityOutcome {
    /// Payload checks out under this ruleset
    Valid,
    /// Payload fails this ruleset; recorded, never thrown
    Invalid,
    /// Not enough information to decide; stays `Unknown`
    Undecided,
}

/// Game-specific verification logic, plugged in per deployment.
pub trait MintValidator: Send + Sync {
    /// Judge a projection's verification payload.
    ///
    /// Implementations must be deterministic: pure functions of the
    /// record and payload, with no clock or I/O access.
    fn validate(
        &self,
        record: &ProjectionRecord,
        verification: Option<&serde_json::Value>,
    ) -> ValidityOutcome;
}

/// Resolve a projection's validity, if it is still pending.
///
/// Never fails: an unknown record or an undecided ruleset leaves state
/// untouched. Returns the record's validity after resolution.
pub fn resolve(
    registry: &mut ProjectionRegistry,
    owner: &Address,
    user_token_id: UserTokenId,
    verification: Option<&serde_json::Value>,
    validator: &dyn MintValidator,
) -> Validity {
    let Some(record) = registry.get(owner, user_token_id) else {
        tracing::warn!(%owner, %user_token_id, "validity resolution for unknown projection");
        return Validity::Unknown;
    };

    // Monotonic: a decided projection is never re-resolved here.
    if record.validity != Validity::Unknown {
        return record.validity;
    }

    let outcome = validator.validate(record, verification);
    let validity = match outcome {
        ValidityOutcome::Valid => Validity::Valid,
        ValidityOutcome::Invalid => Validity::Invalid,
        ValidityOutcome::Undecided => return Validity::Unknown,
    };
    registry.set_validity(owner, user_token_id, validity);
    validity
}

/// Reference validator: the payload must claim the registered amount and
/// declare a standard this deployment recognizes.
///
/// A missing payload defers resolution — the claim may arrive with a
/// later event once the game side finalizes it.
pub struct ClaimValidator {
    accepted_standards: BTreeSet<String>,
}

impl ClaimValidator {
    /// Accept the given standard tags (e.g. `erc1155`, `erc721`).
    pub fn new<I, S>(standards: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accepted_standards: standards.into_iter().map(Into::into).collect(),
        }
    }
}

impl MintValidator for ClaimValidator {
    fn validate(
        &self,
        record: &ProjectionRecord,
        verification: Option<&serde_json::Value>,
    ) -> ValidityOutcome {
        let Some(payload) = verification else {
            return ValidityOutcome::Undecided;
        };

        let claimed = payload.get("amount").and_then(decode_decimal);
        let standard = payload.get("standard").and_then(|v| v.as_str());

        match (claimed, standard) {
            (Some(amount), Some(std_tag)) => {
                if amount == record.initial_amount.as_decimal()
                    && self.accepted_standards.contains(std_tag)
                {
                    ValidityOutcome::Valid
                } else {
                    ValidityOutcome::Invalid
                }
            }
            // Malformed claim shape: invalid under this ruleset, still data
            _ => ValidityOutcome::Invalid,
        }
    }
}

fn decode_decimal(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::String(s) => Decimal::from_str(s).ok(),
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}
