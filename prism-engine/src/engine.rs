//! Engine facade: single owner of all core state.
//!
//! Every mutation flows through this type (the single apply-path);
//! reads return clones or values, never live references into shared
//! state. Facts emitted by transitions accumulate in an outbox that the
//! synchronizer drains and persists for indexers.
//!
//! Two surfaces coexist:
//! - authoritative operations (`create_order`, `fill_exact_budget`, …)
//!   implement the on-chain transition semantics and enforce the full
//!   error taxonomy;
//! - absorb operations (`absorb_order_created`, …) mirror finalized
//!   chain events and tolerate anything but malformed shape, because
//!   the chain already linearized and validated the transition.

use crate::book::{CancelReceipt, OrderBook, OrderParams};
use crate::capabilities::{AssetReceiver, MetadataNotifier};
use crate::error::{EngineError, Result};
use crate::fees::FeeSchedule;
use crate::ledger::SettlementLedger;
use crate::matcher::{self, FillMode, FillReceipt};
use crate::registry::ProjectionRegistry;
use crate::validity::{resolve, MintValidator};
use prism_domain::{
    Address, AssetKey, BasisPoints, DomainError, Fact, Order, OrderId, OrderStatus, Price,
    ProjectionRecord, Quantity, UserTokenId, Validity,
};
use rust_decimal::Decimal;
use std::collections::BTreeSet;

/// The deterministic core: registry, book, matcher, ledger and fees
/// behind one apply-path.
pub struct Engine {
    fees: FeeSchedule,
    registry: ProjectionRegistry,
    book: OrderBook,
    ledger: SettlementLedger,
    validator: Box<dyn MintValidator>,
    outbox: Vec<Fact>,
}

impl Engine {
    /// Create an engine with the given fee schedule and mint validator.
    pub fn new(fees: FeeSchedule, validator: Box<dyn MintValidator>) -> Self {
        Self {
            fees,
            registry: ProjectionRegistry::new(),
            book: OrderBook::new(),
            ledger: SettlementLedger::new(),
            validator,
            outbox: Vec::new(),
        }
    }

    // =========================================================================
    // Projections
    // =========================================================================

    /// Register a projection and resolve its validity.
    ///
    /// Allocation never fails on payload content: an invalid
    /// verification payload is recorded as `Invalid` and still consumes
    /// exactly one id in the owner's sequence. Only malformed shape
    /// (zero/negative/fractional amount) is rejected, before any state
    /// change.
    pub fn register_projection(
        &mut self,
        owner: Address,
        amount: Decimal,
        verification: Option<&serde_json::Value>,
    ) -> Result<UserTokenId> {
        let quantity = Quantity::new(amount)?;
        let user_token_id = self.registry.register(owner.clone(), quantity);
        resolve(
            &mut self.registry,
            &owner,
            user_token_id,
            verification,
            self.validator.as_ref(),
        );
        self.outbox.push(Fact::Projected {
            owner,
            user_token_id,
            amount: quantity.as_decimal(),
        });
        Ok(user_token_id)
    }

    /// Record a burn against a projection.
    ///
    /// # Errors
    /// `ProjectionNotFound` if the id is locally unknown (expected and
    /// non-fatal for a mirror that has not observed the projection yet).
    pub fn record_burn(
        &mut self,
        owner: &Address,
        user_token_id: UserTokenId,
        amount: Decimal,
    ) -> Result<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(EngineError::Domain(DomainError::InvalidQuantity(
                "burn amount must be positive".to_string(),
            )));
        }
        let burned = self.registry.record_burn(owner, user_token_id, amount)?;
        if burned > Decimal::ZERO {
            self.outbox.push(Fact::Burned {
                owner: owner.clone(),
                user_token_id,
                amount: burned,
            });
        }
        Ok(burned)
    }

    // =========================================================================
    // Order book
    // =========================================================================

    /// Create one resting sell order.
    pub fn create_order(
        &mut self,
        seller: Address,
        params: OrderParams,
        fee_paid: Decimal,
    ) -> Result<OrderId> {
        let rates = self.fees.rates_for(&params.asset);
        let asset = params.asset.clone();
        let amount = params.amount.as_decimal();
        let price = params.price_per_asset.as_decimal();
        let order_id = self.book.create(
            seller.clone(),
            params,
            fee_paid,
            self.fees.creation_fee(),
            rates,
        )?;
        self.outbox.push(Fact::OrderCreated {
            order_id,
            asset: asset.clone(),
            seller,
            amount,
            price_per_asset: price,
            maker_fee_bp: rates.maker_bp.as_u32(),
            taker_fee_bp: rates.taker_bp.as_u32(),
        });
        self.announce_metadata_update(&asset);
        Ok(order_id)
    }

    /// Create orders element-wise over parallel arrays.
    ///
    /// All-or-nothing: array-length mismatch, a malformed element, or an
    /// uncovered total creation fee rejects the whole batch before any
    /// order exists.
    pub fn create_order_batch(
        &mut self,
        seller: Address,
        assets: &[AssetKey],
        amounts: &[Decimal],
        prices: &[Decimal],
        fee_paid: Decimal,
    ) -> Result<Vec<OrderId>> {
        if assets.len() != amounts.len() {
            return Err(EngineError::LengthMismatch {
                left: assets.len(),
                right: amounts.len(),
            });
        }
        if assets.len() != prices.len() {
            return Err(EngineError::LengthMismatch {
                left: assets.len(),
                right: prices.len(),
            });
        }

        // Stage: validate every element before touching the book.
        let mut staged = Vec::with_capacity(assets.len());
        for ((asset, &amount), &price) in assets.iter().zip(amounts).zip(prices) {
            staged.push(OrderParams {
                asset: asset.clone(),
                amount: Quantity::new(amount)?,
                price_per_asset: Price::new(price)?,
            });
        }
        let required = self.fees.creation_fee() * Decimal::from(staged.len() as u64);
        if fee_paid < required {
            return Err(EngineError::InsufficientPayment {
                required,
                paid: fee_paid,
            });
        }

        let mut order_ids = Vec::with_capacity(staged.len());
        for params in staged {
            // Per-order fee is the flat schedule fee; the batch total was
            // checked above, so creation cannot fail mid-way.
            let order_id = self.create_order(seller.clone(), params, self.fees.creation_fee())?;
            order_ids.push(order_id);
        }
        Ok(order_ids)
    }

    /// Cancel a single order on behalf of `caller`.
    pub fn cancel_order(&mut self, order_id: OrderId, caller: &Address) -> Result<CancelReceipt> {
        let asset = self
            .book
            .get(order_id)
            .map(|order| order.asset.clone())
            .ok_or(EngineError::UnknownOrder(order_id))?;
        let receipt = self.book.cancel(order_id, caller)?;
        self.outbox.push(Fact::OrderCancelled { order_id });
        self.announce_metadata_update(&asset);
        Ok(receipt)
    }

    /// Cancel a batch of orders atomically.
    ///
    /// Each id must independently pass its own authorization and
    /// terminal checks; one failure aborts the whole batch with no state
    /// change, matching on-chain batch semantics.
    pub fn cancel_order_batch(
        &mut self,
        order_ids: &[OrderId],
        caller: &Address,
    ) -> Result<Vec<CancelReceipt>> {
        let mut seen = BTreeSet::new();
        for &order_id in order_ids {
            self.book.check_cancellable(order_id, caller)?;
            if !seen.insert(order_id) {
                // A duplicate id would be terminal by its second apply.
                return Err(EngineError::AlreadyTerminal {
                    order_id,
                    status: OrderStatus::Cancelled,
                });
            }
        }

        let mut receipts = Vec::with_capacity(order_ids.len());
        for &order_id in order_ids {
            receipts.push(self.cancel_order(order_id, caller)?);
        }
        Ok(receipts)
    }

    // =========================================================================
    // Fills
    // =========================================================================

    /// Batched buy with a fixed fee-inclusive budget.
    ///
    /// Walks `order_ids` in the given order, skipping terminal orders;
    /// fails `SlippageExceeded` (with no side effects) if fewer than
    /// `min_asset_out` units would be delivered. Unspent budget is
    /// returned in the receipt.
    pub fn fill_exact_budget(
        &mut self,
        buyer: Address,
        budget: Decimal,
        min_asset_out: Decimal,
        order_ids: &[OrderId],
    ) -> Result<FillReceipt> {
        if budget <= Decimal::ZERO {
            return Err(EngineError::Domain(DomainError::InvalidQuantity(
                "budget must be positive".to_string(),
            )));
        }
        if min_asset_out < Decimal::ZERO {
            return Err(EngineError::Domain(DomainError::InvalidQuantity(
                "minimum asset out must not be negative".to_string(),
            )));
        }
        let mode = FillMode::ExactBudget { budget, min_asset_out };
        self.fill(buyer, &mode, order_ids)
    }

    /// Batched buy of an exact quantity.
    ///
    /// Stops once `target` units are acquired (the last order may be
    /// partially consumed); fails `InsufficientLiquidity` if the list is
    /// exhausted short of the target and `BudgetExceeded` if reaching it
    /// would cost more than `max_budget`. Budget beyond what was spent is
    /// returned in the receipt.
    pub fn fill_exact_quantity(
        &mut self,
        buyer: Address,
        target: Decimal,
        max_budget: Decimal,
        order_ids: &[OrderId],
    ) -> Result<FillReceipt> {
        let target = Quantity::new(target)?.as_decimal();
        if max_budget < Decimal::ZERO {
            return Err(EngineError::Domain(DomainError::InvalidQuantity(
                "budget must not be negative".to_string(),
            )));
        }
        let mode = FillMode::ExactQuantity { target, max_budget };
        self.fill(buyer, &mode, order_ids)
    }

    fn fill(&mut self, buyer: Address, mode: &FillMode, order_ids: &[OrderId]) -> Result<FillReceipt> {
        let plan = matcher::plan(&self.book, mode, order_ids)?;
        let fee_collector = self.fees.fee_collector().clone();
        let receipt = matcher::commit(&mut self.book, &mut self.ledger, &fee_collector, &buyer, plan);

        let mut touched = BTreeSet::new();
        for leg in &receipt.legs {
            self.outbox.push(Fact::OrderFilled {
                order_id: leg.order_id,
                seller: leg.seller.clone(),
                buyer: buyer.clone(),
                amount_filled: leg.amount,
                price_per_asset: leg.price_per_asset.as_decimal(),
                maker_fee_collected: leg.maker_fee,
                taker_fee_collected: leg.taker_fee,
            });
            touched.insert(leg.asset.clone());
        }
        for asset in touched {
            self.announce_metadata_update(&asset);
        }
        Ok(receipt)
    }

    // =========================================================================
    // Settlement
    // =========================================================================

    /// Claim the full settlement balance for `address`.
    ///
    /// Idempotent: a zero balance claims zero and emits nothing.
    pub fn claim(&mut self, address: &Address) -> Decimal {
        let amount = self.ledger.claim(address);
        if amount > Decimal::ZERO {
            self.outbox.push(Fact::BalanceClaimed {
                address: address.clone(),
                amount,
            });
        }
        amount
    }

    // =========================================================================
    // Mirror absorbs (driven by the synchronizer)
    // =========================================================================

    /// Mirror an on-chain order creation, keeping the chain-assigned id.
    ///
    /// Returns false for an already-observed id (replay within a batch
    /// or an out-of-band duplicate); malformed shape is the only error.
    #[allow(clippy::too_many_arguments)]
    pub fn absorb_order_created(
        &mut self,
        order_id: OrderId,
        asset: AssetKey,
        seller: Address,
        amount: Decimal,
        price_per_asset: Decimal,
        maker_fee_bp: u32,
        taker_fee_bp: u32,
        creation_fee_paid: Decimal,
    ) -> Result<bool> {
        let order = Order {
            order_id,
            asset: asset.clone(),
            seller: seller.clone(),
            created_amount: Quantity::new(amount)?,
            remaining_amount: amount,
            price_per_asset: Price::new(price_per_asset)?,
            maker_fee_bp: BasisPoints::new(maker_fee_bp)?,
            taker_fee_bp: BasisPoints::new(taker_fee_bp)?,
            creation_fee_paid,
            creation_fee_forfeited: false,
            cancelled: false,
        };
        if !self.book.absorb_created(order) {
            tracing::debug!(%order_id, "duplicate mirrored order creation, skipping");
            return Ok(false);
        }
        self.outbox.push(Fact::OrderCreated {
            order_id,
            asset: asset.clone(),
            seller,
            amount,
            price_per_asset,
            maker_fee_bp,
            taker_fee_bp,
        });
        self.announce_metadata_update(&asset);
        Ok(true)
    }

    /// Mirror an on-chain fill, settling proceeds and fees with the
    /// amounts the chain reports.
    pub fn absorb_order_filled(
        &mut self,
        order_id: OrderId,
        buyer: Address,
        amount: Decimal,
        maker_fee_collected: Decimal,
        taker_fee_collected: Decimal,
    ) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(EngineError::Domain(DomainError::InvalidQuantity(
                "fill amount must be positive".to_string(),
            )));
        }
        let order = self
            .book
            .get(order_id)
            .cloned()
            .ok_or(EngineError::UnknownOrder(order_id))?;
        let (consumed, forfeited_fee) = self.book.absorb_fill(order_id, amount)?;
        if consumed.is_zero() {
            return Ok(());
        }

        let gross = consumed * order.price_per_asset.as_decimal();
        let fee_collector = self.fees.fee_collector().clone();
        self.ledger.credit(&order.seller, gross - maker_fee_collected);
        self.ledger
            .credit(&fee_collector, maker_fee_collected + taker_fee_collected + forfeited_fee);

        self.outbox.push(Fact::OrderFilled {
            order_id,
            seller: order.seller,
            buyer,
            amount_filled: consumed,
            price_per_asset: order.price_per_asset.as_decimal(),
            maker_fee_collected,
            taker_fee_collected,
        });
        self.announce_metadata_update(&order.asset);
        Ok(())
    }

    /// Mirror an on-chain cancellation. The chain already enforced the
    /// seller check; only unknown ids error (and the synchronizer treats
    /// that as content, logged and absorbed).
    pub fn absorb_order_cancelled(&mut self, order_id: OrderId) -> Result<()> {
        let asset = self
            .book
            .get(order_id)
            .map(|order| order.asset.clone())
            .ok_or(EngineError::UnknownOrder(order_id))?;
        self.book.absorb_cancel(order_id)?;
        self.outbox.push(Fact::OrderCancelled { order_id });
        self.announce_metadata_update(&asset);
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// A single order, by id.
    pub fn order(&self, order_id: OrderId) -> Option<Order> {
        self.book.get(order_id).cloned()
    }

    /// Active orders for an asset, ordered by (price, order id).
    pub fn active_orders(&self, asset: &AssetKey) -> Vec<Order> {
        self.book.active_orders_for(asset)
    }

    /// A single projection record.
    pub fn projection(&self, owner: &Address, user_token_id: UserTokenId) -> Option<ProjectionRecord> {
        self.registry.get(owner, user_token_id).cloned()
    }

    /// An owner's projections, in id order.
    pub fn owner_projections(&self, owner: &Address) -> Vec<ProjectionRecord> {
        self.registry.owner_projections(owner)
    }

    /// Re-run validity resolution for a still-unknown projection.
    pub fn resolve_validity(
        &mut self,
        owner: &Address,
        user_token_id: UserTokenId,
        verification: Option<&serde_json::Value>,
    ) -> Validity {
        resolve(
            &mut self.registry,
            owner,
            user_token_id,
            verification,
            self.validator.as_ref(),
        )
    }

    /// Claimable settlement balance for an address.
    pub fn balance(&self, address: &Address) -> Decimal {
        self.ledger.balance(address)
    }

    /// The current fee schedule.
    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    /// Mutable schedule access (operator configuration path).
    pub fn fees_mut(&mut self) -> &mut FeeSchedule {
        &mut self.fees
    }

    /// Drain the fact outbox.
    pub fn drain_facts(&mut self) -> Vec<Fact> {
        std::mem::take(&mut self.outbox)
    }

    /// Facts emitted since the last drain.
    pub fn pending_facts(&self) -> &[Fact] {
        &self.outbox
    }
}

impl AssetReceiver for Engine {
    /// Escrow entry point: decode the transfer data into order
    /// parameters and create the order it funds.
    fn on_asset_received(
        &mut self,
        from: &Address,
        asset: &AssetKey,
        amount: Decimal,
        data: &serde_json::Value,
    ) -> Result<OrderId> {
        let price = data
            .get("price_per_asset")
            .and_then(decode_decimal)
            .ok_or_else(|| {
                EngineError::InvalidTransferData("missing price_per_asset".to_string())
            })?;
        let fee_paid = data
            .get("fee_paid")
            .and_then(decode_decimal)
            .unwrap_or(Decimal::ZERO);

        let params = OrderParams {
            asset: asset.clone(),
            amount: Quantity::new(amount)?,
            price_per_asset: Price::new(price)?,
        };
        self.create_order(from.clone(), params, fee_paid)
    }
}

impl MetadataNotifier for Engine {
    fn announce_metadata_update(&mut self, asset: &AssetKey) {
        self.outbox.push(Fact::MetadataUpdated { asset: asset.clone() });
    }
}

fn decode_decimal(value: &serde_json::Value) -> Option<Decimal> {
    use std::str::FromStr;
    match value {
        serde_json::Value::String(s) => Decimal::from_str(s).ok(),
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}
