//! Engine error taxonomy.
//!
//! Every failing engine call is atomic: no side effects of a failed call
//! are ever committed. The class of an error tells callers how to react:
//! caller errors are bugs in the submitting code, economic errors are
//! legitimate rejections of a whole batched call, and not-found is an
//! explicit "not yet available" answer rather than a defect.

use prism_domain::{Address, DomainError, OrderId, OrderStatus, UserTokenId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors returned by engine state transitions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Malformed value (zero/negative amount, bad address shape)
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Parallel batch arrays disagree in length
    #[error("Array length mismatch: {left} vs {right}")]
    LengthMismatch {
        /// First array length
        left: usize,
        /// Offending array length
        right: usize,
    },

    /// An order id was referenced that has never existed
    #[error("Unknown order: {0}")]
    UnknownOrder(OrderId),

    /// Caller is not the seller of the order
    #[error("Unauthorized: {caller} is not the seller of order {order_id}")]
    Unauthorized {
        /// Targeted order
        order_id: OrderId,
        /// Offending caller
        caller: Address,
    },

    /// The order is already cancelled or fully filled
    #[error("Order {order_id} is already terminal ({status})")]
    AlreadyTerminal {
        /// Targeted order
        order_id: OrderId,
        /// Terminal status it is resting in
        status: OrderStatus,
    },

    /// The flat creation fee was not covered
    #[error("Insufficient payment: required {required}, paid {paid}")]
    InsufficientPayment {
        /// Fee owed
        required: Decimal,
        /// Fee actually paid
        paid: Decimal,
    },

    /// A fixed-budget fill received less than the caller's minimum
    #[error("Slippage exceeded: received {received}, minimum {min_asset_out}")]
    SlippageExceeded {
        /// Quantity the walk would have delivered
        received: Decimal,
        /// Caller's floor
        min_asset_out: Decimal,
    },

    /// A fixed-quantity fill would cost more than the caller's budget
    #[error("Budget exceeded: cost {cost}, budget {max_budget}")]
    BudgetExceeded {
        /// Fee-inclusive cost of reaching the target
        cost: Decimal,
        /// Caller's ceiling
        max_budget: Decimal,
    },

    /// The order list was exhausted before the target quantity was reached
    #[error("Insufficient liquidity: filled {filled} of {target}")]
    InsufficientLiquidity {
        /// Quantity the walk could deliver
        filled: Decimal,
        /// Requested quantity
        target: Decimal,
    },

    /// No projection is locally known under this identity
    #[error("Projection not found: owner {owner}, token {user_token_id}")]
    ProjectionNotFound {
        /// Queried owner
        owner: Address,
        /// Queried id
        user_token_id: UserTokenId,
    },

    /// Asset-transfer callback data could not be decoded
    #[error("Invalid transfer data: {0}")]
    InvalidTransferData(String),
}

/// Coarse classification of an engine error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed input; a bug in the calling code
    Caller,
    /// Caller lacks authority over the target
    Authorization,
    /// A whole batched call was legitimately rejected
    Economic,
    /// Identity not yet observed by the local mirror
    NotFound,
}

impl EngineError {
    /// Classify per the error-handling design.
    pub fn class(&self) -> ErrorClass {
        match self {
            EngineError::Domain(_)
            | EngineError::LengthMismatch { .. }
            | EngineError::UnknownOrder(_)
            | EngineError::AlreadyTerminal { .. }
            | EngineError::InvalidTransferData(_) => ErrorClass::Caller,
            EngineError::Unauthorized { .. } => ErrorClass::Authorization,
            EngineError::InsufficientPayment { .. }
            | EngineError::SlippageExceeded { .. }
            | EngineError::BudgetExceeded { .. }
            | EngineError::InsufficientLiquidity { .. } => ErrorClass::Economic,
            EngineError::ProjectionNotFound { .. } => ErrorClass::NotFound,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
