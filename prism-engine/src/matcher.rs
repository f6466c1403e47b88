//! Fill matcher: batched buys against the order book.
//!
//! Matching is split into a pure planning pass over immutable state and
//! a commit pass that applies the plan. A failing call therefore never
//! commits a partial fill — the plan is simply dropped.
//!
//! The caller supplies the order list pre-sorted (off-chain discovery
//! owns price ordering); the matcher walks it verbatim. An order in the
//! list that is already cancelled or fully filled is skipped, not fatal:
//! under contention this degrades a batched purchase partially instead
//! of aborting it, which is the design intent.

use crate::book::OrderBook;
use crate::error::{EngineError, Result};
use crate::ledger::SettlementLedger;
use prism_domain::{Address, AssetKey, OrderId, Price};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// The two batched buy modes.
#[derive(Debug, Clone, PartialEq)]
pub enum FillMode {
    /// Spend up to `budget` (fee-inclusive), delivering at least
    /// `min_asset_out` units.
    ExactBudget {
        /// Total outlay ceiling, taker fees included
        budget: Decimal,
        /// Minimum acceptable quantity (slippage floor)
        min_asset_out: Decimal,
    },
    /// Acquire exactly `target` units, spending at most `max_budget`.
    ExactQuantity {
        /// Exact quantity to acquire
        target: Decimal,
        /// Fee-inclusive outlay ceiling
        max_budget: Decimal,
    },
}

/// One order's contribution to a fill.
#[derive(Debug, Clone, PartialEq)]
pub struct FillLeg {
    /// Consumed order
    pub order_id: OrderId,
    /// Asset sold by the order
    pub asset: AssetKey,
    /// The order's seller
    pub seller: Address,
    /// Quantity consumed from the order
    pub amount: Decimal,
    /// The order's unit price
    pub price_per_asset: Price,
    /// `amount * price`
    pub gross: Decimal,
    /// Withheld from the seller's proceeds
    pub maker_fee: Decimal,
    /// Added to the buyer's cost
    pub taker_fee: Decimal,
}

impl FillLeg {
    /// What the buyer pays for this leg.
    pub fn cost(&self) -> Decimal {
        self.gross + self.taker_fee
    }

    /// What the seller is credited for this leg.
    pub fn proceeds(&self) -> Decimal {
        self.gross - self.maker_fee
    }
}

/// A planned batched buy, not yet applied.
#[derive(Debug, Clone, PartialEq)]
pub struct FillPlan {
    /// Per-order contributions, in walk order
    pub legs: Vec<FillLeg>,
    /// Total quantity delivered
    pub asset_received: Decimal,
    /// Fee-inclusive amount spent
    pub spent: Decimal,
    /// Unspent budget returned to the buyer
    pub refund: Decimal,
}

/// Outcome of a committed batched buy.
#[derive(Debug, Clone, PartialEq)]
pub struct FillReceipt {
    /// Buying address
    pub buyer: Address,
    /// Total quantity delivered
    pub asset_received: Decimal,
    /// Fee-inclusive amount spent
    pub spent: Decimal,
    /// Unspent budget returned to the buyer
    pub refund: Decimal,
    /// Per-order contributions
    pub legs: Vec<FillLeg>,
}

/// Plan a batched buy against the current book state.
///
/// # Errors
/// `UnknownOrder` for a listed id that has never existed (a caller bug,
/// unlike a terminal order which is skipped); `SlippageExceeded`,
/// `InsufficientLiquidity` or `BudgetExceeded` when the mode's
/// constraint cannot be met. No state is touched either way.
pub fn plan(book: &OrderBook, mode: &FillMode, order_ids: &[OrderId]) -> Result<FillPlan> {
    match *mode {
        FillMode::ExactBudget { budget, min_asset_out } => {
            plan_exact_budget(book, budget, min_asset_out, order_ids)
        }
        FillMode::ExactQuantity { target, max_budget } => {
            plan_exact_quantity(book, target, max_budget, order_ids)
        }
    }
}

fn plan_exact_budget(
    book: &OrderBook,
    budget: Decimal,
    min_asset_out: Decimal,
    order_ids: &[OrderId],
) -> Result<FillPlan> {
    let mut remaining_budget = budget;
    let mut received = Decimal::ZERO;
    let mut legs = Vec::new();
    // The book is immutable during planning, so quantity already planned
    // against an order (a duplicated id in the list) must be tracked here
    // or the same units would be sold twice.
    let mut planned: BTreeMap<OrderId, Decimal> = BTreeMap::new();

    for &order_id in order_ids {
        let order = book
            .get(order_id)
            .ok_or(EngineError::UnknownOrder(order_id))?;
        if !order.is_active() {
            tracing::debug!(%order_id, status = %order.status(), "skipping inactive order");
            continue;
        }
        let available =
            order.remaining_amount - planned.get(&order_id).copied().unwrap_or_default();
        if available <= Decimal::ZERO {
            continue;
        }

        let price = order.price_per_asset.as_decimal();
        let unit_cost = price * (Decimal::ONE + order.taker_fee_bp.fraction());
        // Whole units only; an order too expensive for the remaining
        // budget contributes nothing but does not end the walk.
        let affordable = (remaining_budget / unit_cost).floor();
        if affordable < Decimal::ONE {
            continue;
        }

        let amount = affordable.min(available);
        let leg = leg_for(order.order_id, order, amount);
        remaining_budget -= leg.cost();
        received += amount;
        *planned.entry(order_id).or_default() += amount;
        legs.push(leg);
    }

    if received < min_asset_out {
        return Err(EngineError::SlippageExceeded {
            received,
            min_asset_out,
        });
    }

    Ok(FillPlan {
        legs,
        asset_received: received,
        spent: budget - remaining_budget,
        refund: remaining_budget,
    })
}

fn plan_exact_quantity(
    book: &OrderBook,
    target: Decimal,
    max_budget: Decimal,
    order_ids: &[OrderId],
) -> Result<FillPlan> {
    let mut needed = target;
    let mut cost = Decimal::ZERO;
    let mut legs = Vec::new();
    let mut planned: BTreeMap<OrderId, Decimal> = BTreeMap::new();

    for &order_id in order_ids {
        if needed.is_zero() {
            break;
        }
        let order = book
            .get(order_id)
            .ok_or(EngineError::UnknownOrder(order_id))?;
        if !order.is_active() {
            tracing::debug!(%order_id, status = %order.status(), "skipping inactive order");
            continue;
        }
        let available =
            order.remaining_amount - planned.get(&order_id).copied().unwrap_or_default();
        if available <= Decimal::ZERO {
            continue;
        }

        let amount = needed.min(available);
        let leg = leg_for(order.order_id, order, amount);
        cost += leg.cost();
        needed -= amount;
        *planned.entry(order_id).or_default() += amount;
        legs.push(leg);
    }

    if needed > Decimal::ZERO {
        return Err(EngineError::InsufficientLiquidity {
            filled: target - needed,
            target,
        });
    }
    if cost > max_budget {
        return Err(EngineError::BudgetExceeded { cost, max_budget });
    }

    Ok(FillPlan {
        legs,
        asset_received: target,
        spent: cost,
        refund: max_budget - cost,
    })
}

fn leg_for(order_id: OrderId, order: &prism_domain::Order, amount: Decimal) -> FillLeg {
    let gross = amount * order.price_per_asset.as_decimal();
    FillLeg {
        order_id,
        asset: order.asset.clone(),
        seller: order.seller.clone(),
        amount,
        price_per_asset: order.price_per_asset,
        gross,
        maker_fee: gross * order.maker_fee_bp.fraction(),
        taker_fee: gross * order.taker_fee_bp.fraction(),
    }
}

/// Apply a plan: consume orders and settle proceeds and fees into the
/// ledger. Sellers are credited claim-based; nothing is pushed.
pub fn commit(
    book: &mut OrderBook,
    ledger: &mut SettlementLedger,
    fee_collector: &Address,
    buyer: &Address,
    plan: FillPlan,
) -> FillReceipt {
    let mut protocol_fees = Decimal::ZERO;
    for leg in &plan.legs {
        let forfeited_creation_fee = book.consume(leg.order_id, leg.amount);
        ledger.credit(&leg.seller, leg.proceeds());
        protocol_fees += leg.maker_fee + leg.taker_fee + forfeited_creation_fee;
    }
    ledger.credit(fee_collector, protocol_fees);

    FillReceipt {
        buyer: buyer.clone(),
        asset_received: plan.asset_received,
        spent: plan.spent,
        refund: plan.refund,
        legs: plan.legs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::FeeRates;
    use prism_domain::{BasisPoints, Quantity};
    use rust_decimal_macros::dec;

    fn addr(tag: &str) -> Address {
        Address::new(tag).unwrap()
    }

    fn seeded_book(orders: &[(Decimal, Decimal)]) -> OrderBook {
        let mut book = OrderBook::new();
        for &(amount, price) in orders {
            book.create(
                addr("0x5e11"),
                crate::book::OrderParams {
                    asset: AssetKey::new(addr("0xa1"), 1),
                    amount: Quantity::new(amount).unwrap(),
                    price_per_asset: Price::new(price).unwrap(),
                },
                dec!(0),
                dec!(0),
                FeeRates {
                    maker_bp: BasisPoints::ZERO,
                    taker_bp: BasisPoints::ZERO,
                },
            )
            .unwrap();
        }
        book
    }

    #[test]
    fn exact_budget_floors_to_whole_units() {
        // 100 budget at price 3: 33 units, 1 left over
        let book = seeded_book(&[(dec!(60), dec!(3))]);
        let plan = plan(
            &book,
            &FillMode::ExactBudget { budget: dec!(100), min_asset_out: dec!(0) },
            &[OrderId(1)],
        )
        .unwrap();
        assert_eq!(plan.asset_received, dec!(33));
        assert_eq!(plan.spent, dec!(99));
        assert_eq!(plan.refund, dec!(1));
    }

    #[test]
    fn exact_budget_skips_orders_too_expensive_for_remaining_budget() {
        // Unsorted caller list: the expensive order eats most of the
        // budget, but the cheap one later is still affordable.
        let book = seeded_book(&[(dec!(9), dec!(10)), (dec!(10), dec!(1))]);
        let plan = plan(
            &book,
            &FillMode::ExactBudget { budget: dec!(95), min_asset_out: dec!(0) },
            &[OrderId(1), OrderId(2)],
        )
        .unwrap();
        // 9 units @10 = 90, then 5 units @1 = 5
        assert_eq!(plan.asset_received, dec!(14));
        assert_eq!(plan.spent, dec!(95));
        assert_eq!(plan.refund, dec!(0));
    }

    #[test]
    fn unknown_order_in_list_is_a_caller_error() {
        let book = seeded_book(&[(dec!(10), dec!(1))]);
        let err = plan(
            &book,
            &FillMode::ExactQuantity { target: dec!(1), max_budget: dec!(10) },
            &[OrderId(99)],
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::UnknownOrder(OrderId(99))));
    }

    #[test]
    fn duplicated_id_never_plans_more_than_the_order_holds() {
        // 10 units exist; listing the order twice must not double them.
        let book = seeded_book(&[(dec!(10), dec!(1))]);

        let err = plan(
            &book,
            &FillMode::ExactQuantity { target: dec!(20), max_budget: dec!(100) },
            &[OrderId(1), OrderId(1)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientLiquidity { filled: dec!(10), target: dec!(20) }
        );

        let plan = plan(
            &book,
            &FillMode::ExactBudget { budget: dec!(100), min_asset_out: dec!(0) },
            &[OrderId(1), OrderId(1)],
        )
        .unwrap();
        assert_eq!(plan.asset_received, dec!(10));
        assert_eq!(plan.spent, dec!(10));
    }

    #[test]
    fn exact_quantity_rejects_cost_above_budget() {
        let book = seeded_book(&[(dec!(10), dec!(5))]);
        let err = plan(
            &book,
            &FillMode::ExactQuantity { target: dec!(10), max_budget: dec!(49) },
            &[OrderId(1)],
        )
        .unwrap_err();
        assert_eq!(err, EngineError::BudgetExceeded { cost: dec!(50), max_budget: dec!(49) });
    }

    #[test]
    fn taker_fee_is_part_of_the_buyers_cost() {
        let mut book = OrderBook::new();
        book.create(
            addr("0x5e11"),
            crate::book::OrderParams {
                asset: AssetKey::new(addr("0xa1"), 1),
                amount: Quantity::new(dec!(10)).unwrap(),
                price_per_asset: Price::new(dec!(10)).unwrap(),
            },
            dec!(0),
            dec!(0),
            FeeRates {
                maker_bp: BasisPoints::new(100).unwrap(),
                taker_bp: BasisPoints::new(200).unwrap(),
            },
        )
        .unwrap();

        // Unit cost with 2% taker fee: 10.20; budget 102 buys exactly 10
        let plan = plan(
            &book,
            &FillMode::ExactBudget { budget: dec!(102), min_asset_out: dec!(10) },
            &[OrderId(1)],
        )
        .unwrap();
        assert_eq!(plan.asset_received, dec!(10));
        assert_eq!(plan.spent, dec!(102.00));
        let leg = &plan.legs[0];
        assert_eq!(leg.maker_fee, dec!(1.00));
        assert_eq!(leg.taker_fee, dec!(2.00));
        assert_eq!(leg.proceeds(), dec!(99.00));
    }
}
