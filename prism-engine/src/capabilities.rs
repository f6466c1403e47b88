//! Capability interfaces at the engine's outer seams.
//!
//! On-chain these are interface inheritances (receiver callbacks,
//! metadata-update announcements); here they are explicit traits so the
//! boundaries stay visible and mockable.

use crate::error::Result;
use prism_domain::{Address, AssetKey, OrderId};
use rust_decimal::Decimal;

/// Accepts an incoming asset transfer.
///
/// The escrow entry point: a seller transfers units in, and the
/// accompanying `data` payload carries the order parameters. Rejecting
/// the transfer (an `Err`) bounces the escrow.
pub trait AssetReceiver {
    /// Handle a received transfer, creating the resting order it funds.
    fn on_asset_received(
        &mut self,
        from: &Address,
        asset: &AssetKey,
        amount: Decimal,
        data: &serde_json::Value,
    ) -> Result<OrderId>;
}

/// Announces that cached metadata for an asset is stale.
///
/// Consumers (token-URI caches, front-ends) re-fetch on announcement.
pub trait MetadataNotifier {
    /// Record that `asset`'s metadata changed.
    fn announce_metadata_update(&mut self, asset: &AssetKey);
}
