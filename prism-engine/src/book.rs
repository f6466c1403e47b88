//! Order book: the set of resting sell orders per asset.
//!
//! Creation snapshots the fee schedule into the order; cancellation
//! returns the escrowed remainder and refunds the creation fee unless a
//! fill already forfeited it. Terminal orders are kept (never deleted)
//! so that late fill/cancel attempts can be answered precisely and the
//! mirror can serve historical queries.

use crate::error::{EngineError, Result};
use crate::fees::FeeRates;
use prism_domain::{Address, AssetKey, Order, OrderId, Price, Quantity};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

/// Parameters for one order creation.
#[derive(Debug, Clone)]
pub struct OrderParams {
    /// Unit to sell
    pub asset: AssetKey,
    /// Quantity to escrow
    pub amount: Quantity,
    /// Unit price
    pub price_per_asset: Price,
}

/// Result of a successful cancellation.
#[derive(Debug, Clone, PartialEq)]
pub struct CancelReceipt {
    /// Cancelled order
    pub order_id: OrderId,
    /// Escrowed quantity returned to the seller
    pub returned_amount: Decimal,
    /// Creation fee refunded (zero if already forfeited by a fill)
    pub refunded_fee: Decimal,
}

/// Resting sell orders, keyed by globally sequential id.
#[derive(Debug)]
pub struct OrderBook {
    orders: BTreeMap<OrderId, Order>,
    by_asset: BTreeMap<AssetKey, BTreeSet<OrderId>>,
    next_order_id: u64,
}

impl OrderBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self {
            orders: BTreeMap::new(),
            by_asset: BTreeMap::new(),
            next_order_id: 1,
        }
    }

    /// Create a resting order, escrowing `params.amount` from `seller`.
    ///
    /// `required_fee` is the schedule's flat creation fee and `rates`
    /// the schedule's current maker/taker rates; both are snapshotted
    /// into the order and never re-read.
    ///
    /// # Errors
    /// `InsufficientPayment` if `fee_paid < required_fee`.
    pub fn create(
        &mut self,
        seller: Address,
        params: OrderParams,
        fee_paid: Decimal,
        required_fee: Decimal,
        rates: FeeRates,
    ) -> Result<OrderId> {
        if fee_paid < required_fee {
            return Err(EngineError::InsufficientPayment {
                required: required_fee,
                paid: fee_paid,
            });
        }

        let order_id = OrderId(self.next_order_id);
        self.next_order_id += 1;

        let order = Order {
            order_id,
            asset: params.asset.clone(),
            seller,
            remaining_amount: params.amount.as_decimal(),
            created_amount: params.amount,
            price_per_asset: params.price_per_asset,
            maker_fee_bp: rates.maker_bp,
            taker_fee_bp: rates.taker_bp,
            creation_fee_paid: fee_paid,
            creation_fee_forfeited: false,
            cancelled: false,
        };
        self.index(order);
        Ok(order_id)
    }

    /// Cancel an order on behalf of `caller`.
    ///
    /// # Errors
    /// `UnknownOrder` for an id never seen, `Unauthorized` unless the
    /// caller is the seller, `AlreadyTerminal` if not active.
    pub fn cancel(&mut self, order_id: OrderId, caller: &Address) -> Result<CancelReceipt> {
        self.check_cancellable(order_id, caller)?;

        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or(EngineError::UnknownOrder(order_id))?;
        let returned_amount = order.remaining_amount;
        order.remaining_amount = Decimal::ZERO;
        order.cancelled = true;
        let refunded_fee = if order.creation_fee_forfeited {
            Decimal::ZERO
        } else {
            order.creation_fee_paid
        };
        Ok(CancelReceipt {
            order_id,
            returned_amount,
            refunded_fee,
        })
    }

    /// Validate that `caller` could cancel `order_id` right now, without
    /// mutating anything. Used to stage atomic batch cancellation.
    pub fn check_cancellable(&self, order_id: OrderId, caller: &Address) -> Result<()> {
        let order = self
            .orders
            .get(&order_id)
            .ok_or(EngineError::UnknownOrder(order_id))?;
        if order.seller != *caller {
            return Err(EngineError::Unauthorized {
                order_id,
                caller: caller.clone(),
            });
        }
        if !order.is_active() {
            return Err(EngineError::AlreadyTerminal {
                order_id,
                status: order.status(),
            });
        }
        Ok(())
    }

    /// Look up an order.
    pub fn get(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    /// Active orders for an asset, ordered by (price, order id).
    pub fn active_orders_for(&self, asset: &AssetKey) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .by_asset
            .get(asset)
            .into_iter()
            .flatten()
            .filter_map(|id| self.orders.get(id))
            .filter(|order| order.is_active())
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            a.price_per_asset
                .cmp(&b.price_per_asset)
                .then(a.order_id.cmp(&b.order_id))
        });
        orders
    }

    /// Number of orders ever created (including terminal ones).
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// True if no order was ever created.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Consume `amount` of an active order during fill commitment.
    ///
    /// Returns the creation fee forfeited by this fill: non-zero exactly
    /// once, on the order's first fill. Callers must have planned the
    /// consumption against current state; this only commits it.
    pub(crate) fn consume(&mut self, order_id: OrderId, amount: Decimal) -> Decimal {
        let order = self
            .orders
            .get_mut(&order_id)
            .expect("consume of planned order");
        debug_assert!(order.is_active() && amount <= order.remaining_amount);
        order.remaining_amount -= amount;
        if order.creation_fee_forfeited {
            Decimal::ZERO
        } else {
            order.creation_fee_forfeited = true;
            order.creation_fee_paid
        }
    }

    /// Mirror an order observed on-chain, keeping chain-assigned ids.
    ///
    /// Returns false (and leaves state untouched) for a duplicate id.
    /// Advances the local id counter past the absorbed id so that
    /// locally created orders can never collide with mirrored ones.
    pub(crate) fn absorb_created(&mut self, order: Order) -> bool {
        if self.orders.contains_key(&order.order_id) {
            return false;
        }
        self.next_order_id = self.next_order_id.max(order.order_id.0 + 1);
        self.index(order);
        true
    }

    /// Mirror a fill observed on-chain: decrement without replanning.
    ///
    /// Returns the consumed quantity and the creation fee forfeited by
    /// this fill (non-zero only for the order's first fill), or an error
    /// if the order is unknown locally.
    pub(crate) fn absorb_fill(
        &mut self,
        order_id: OrderId,
        amount: Decimal,
    ) -> Result<(Decimal, Decimal)> {
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or(EngineError::UnknownOrder(order_id))?;
        let consumed = amount.min(order.remaining_amount);
        if consumed < amount {
            tracing::warn!(
                %order_id,
                requested = %amount,
                remaining = %order.remaining_amount,
                "mirrored fill exceeds remaining amount, clamping"
            );
        }
        order.remaining_amount -= consumed;
        let forfeited = if order.creation_fee_forfeited {
            Decimal::ZERO
        } else {
            order.creation_fee_forfeited = true;
            order.creation_fee_paid
        };
        Ok((consumed, forfeited))
    }

    /// Mirror a cancellation observed on-chain. No authorization checks:
    /// the chain already enforced them.
    pub(crate) fn absorb_cancel(&mut self, order_id: OrderId) -> Result<()> {
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or(EngineError::UnknownOrder(order_id))?;
        order.remaining_amount = Decimal::ZERO;
        order.cancelled = true;
        Ok(())
    }

    fn index(&mut self, order: Order) {
        self.by_asset
            .entry(order.asset.clone())
            .or_default()
            .insert(order.order_id);
        self.orders.insert(order.order_id, order);
    }
}
