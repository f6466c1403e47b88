//! Value objects for the Prism domain.
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain errors for value object validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Address must be 0x-prefixed hex
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Price must be positive
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// Quantity must be a positive whole number of units
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Basis points must not exceed 10000
    #[error("Invalid basis points: {0}")]
    InvalidBasisPoints(String),
}

// =============================================================================
// Address
// =============================================================================

/// A base-chain account identifier.
///
/// # Invariants
/// - `0x`-prefixed, non-empty hex
/// - Stored lowercase so that equality and ordering are canonical
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Create a new Address with validation.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidAddress` if the value is not
    /// `0x`-prefixed hex.
    pub fn new(value: &str) -> Result<Self, DomainError> {
        let lowered = value.to_ascii_lowercase();
        let digits = lowered
            .strip_prefix("0x")
            .ok_or_else(|| DomainError::InvalidAddress(format!("missing 0x prefix: {value}")))?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::InvalidAddress(format!("not hex: {value}")));
        }
        Ok(Self(lowered))
    }

    /// Get the canonical (lowercase) string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Price
// =============================================================================

/// Unit price of an asset, fixed at order creation.
///
/// # Invariants
/// - Must be > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Create a new Price with validation.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPrice` if value <= 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::InvalidPrice("Price must be positive".to_string()));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Quantity
// =============================================================================

/// Quantity of discrete asset units.
///
/// Projected assets are semi-fungible tokens, so quantities are whole
/// units.
///
/// # Invariants
/// - Must be > 0
/// - Must be integral
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Create a new Quantity with validation.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidQuantity` if value <= 0 or fractional
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::InvalidQuantity("Quantity must be positive".to_string()));
        }
        if value != value.trunc() {
            return Err(DomainError::InvalidQuantity(format!(
                "Quantity must be a whole number of units: {value}"
            )));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// BasisPoints
// =============================================================================

/// Fee rate in basis points (1 bp = 1/100th of a percent).
///
/// # Invariants
/// - Must be <= 10000 (100%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BasisPoints(u32);

impl BasisPoints {
    /// The zero fee rate.
    pub const ZERO: BasisPoints = BasisPoints(0);

    /// Create a new fee rate with validation.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidBasisPoints` if value > 10000
    pub fn new(value: u32) -> Result<Self, DomainError> {
        if value > 10_000 {
            return Err(DomainError::InvalidBasisPoints(format!(
                "rate exceeds 10000 bp: {value}"
            )));
        }
        Ok(Self(value))
    }

    /// Get the raw basis-point value.
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Exact decimal fraction (e.g. 250 bp -> 0.0250).
    pub fn fraction(&self) -> Decimal {
        Decimal::new(i64::from(self.0), 4)
    }
}

impl fmt::Display for BasisPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bp", self.0)
    }
}

// =============================================================================
// AssetKey
// =============================================================================

/// Identifies a fungible/semi-fungible unit: the asset contract plus the
/// sub-asset id within it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetKey {
    /// Asset contract address on the base chain
    pub contract: Address,
    /// Sub-asset identifier within the contract
    pub asset_id: u128,
}

impl AssetKey {
    /// Create an asset key.
    pub fn new(contract: Address, asset_id: u128) -> Self {
        Self { contract, asset_id }
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.contract, self.asset_id)
    }
}

// =============================================================================
// Identifiers
// =============================================================================

/// Per-owner sequential projection identifier, 1-indexed.
///
/// Assigned at projection time and never reused, including for
/// projections that later resolve invalid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserTokenId(pub u64);

impl UserTokenId {
    /// First id in every owner's sequence.
    pub const FIRST: UserTokenId = UserTokenId(1);

    /// The id following this one.
    pub fn next(&self) -> UserTokenId {
        UserTokenId(self.0 + 1)
    }
}

impl fmt::Display for UserTokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Globally scoped, monotonically increasing sell-order identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn address_normalizes_to_lowercase() {
        let addr = Address::new("0xAbCd01").unwrap();
        assert_eq!(addr.as_str(), "0xabcd01");
        assert_eq!(addr, Address::new("0xABCD01").unwrap());
    }

    #[test]
    fn address_rejects_missing_prefix_and_non_hex() {
        assert!(Address::new("abcd01").is_err());
        assert!(Address::new("0x").is_err());
        assert!(Address::new("0xzz").is_err());
    }

    #[test]
    fn price_must_be_positive() {
        assert!(Price::new(dec!(0)).is_err());
        assert!(Price::new(dec!(-1)).is_err());
        assert_eq!(Price::new(dec!(2.5)).unwrap().as_decimal(), dec!(2.5));
    }

    #[test]
    fn quantity_must_be_positive_whole_units() {
        assert!(Quantity::new(dec!(0)).is_err());
        assert!(Quantity::new(dec!(-3)).is_err());
        assert!(Quantity::new(dec!(1.5)).is_err());
        assert_eq!(Quantity::new(dec!(60)).unwrap().as_decimal(), dec!(60));
    }

    #[test]
    fn basis_points_bounds_and_fraction() {
        assert!(BasisPoints::new(10_001).is_err());
        assert_eq!(BasisPoints::new(250).unwrap().fraction(), dec!(0.0250));
        assert_eq!(BasisPoints::ZERO.fraction(), Decimal::ZERO);
    }

    #[test]
    fn user_token_id_sequence() {
        assert_eq!(UserTokenId::FIRST.next(), UserTokenId(2));
    }
}
