//! HTTP discovery API for the Prism daemon.
//!
//! Read-only projections of mirror state:
//! - Health check
//! - Token metadata (the inverse-projection URI scheme)
//! - Active orders per asset (paginated, price-ordered)
//! - A wallet's projections
//! - Claimable settlement balances

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use prism_domain::{Address, AssetKey, Order, ProjectionRecord, UserTokenId, Validity};
use prism_engine::Engine;

use crate::config::InvalidVisibility;

// =============================================================================
// API State
// =============================================================================

/// Shared state for API handlers.
pub struct ApiState {
    /// The engine mirror, shared with the synchronizer
    pub engine: Arc<RwLock<Engine>>,
    /// Deployment policy for `Invalid` projections
    pub invalid_visibility: InvalidVisibility,
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Token metadata served under the inverse-projection URI scheme.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub standard: String,
    pub purpose: String,
    pub chain_id: u64,
    pub owner: String,
    pub user_token_id: u64,
    pub initial_amount: Decimal,
    pub current_amount: Decimal,
    pub validity: Validity,
}

/// One resting order in an asset listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: u64,
    pub seller: String,
    pub remaining_amount: Decimal,
    pub price_per_asset: Decimal,
    pub maker_fee_bp: u32,
    pub taker_fee_bp: u32,
}

/// Paginated active-order listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct OrdersResponse {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub orders: Vec<OrderSummary>,
}

/// Pagination parameters.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

fn default_page() -> usize {
    1
}

fn default_per_page() -> usize {
    50
}

const MAX_PER_PAGE: usize = 200;

/// One projection in a wallet listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectionSummary {
    pub user_token_id: u64,
    pub initial_amount: Decimal,
    pub current_amount: Decimal,
    pub validity: Validity,
}

/// A wallet's projections.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectionsResponse {
    pub owner: String,
    pub projections: Vec<ProjectionSummary>,
}

/// Claimable settlement balance.
#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub address: String,
    pub balance: Decimal,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(msg: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: msg.into() }))
}

fn not_found(msg: impl Into<String>) -> ApiError {
    (StatusCode::NOT_FOUND, Json(ErrorResponse { error: msg.into() }))
}

// =============================================================================
// Router
// =============================================================================

/// Create the API router.
pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/inverseProjection/:standard/:purpose/:chain_id/:owner/:user_token_id/:initial_amount",
            get(metadata_handler),
        )
        .route("/assets/:contract/:asset_id/orders", get(orders_handler))
        .route("/owners/:owner/projections", get(owner_projections_handler))
        .route("/balances/:address", get(balance_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Token metadata under the inverse-projection URI scheme.
///
/// The URI is self-describing: every path segment must match the local
/// record, so a URI minted for one projection can never answer for
/// another. An id the mirror has not observed is not-found; a
/// projection still `Unknown` answers not-found with a distinct
/// "not yet available" body; `Invalid` follows the deployment policy.
async fn metadata_handler(
    State(state): State<Arc<ApiState>>,
    Path((standard, purpose, chain_id, owner, user_token_id, initial_amount)): Path<(
        String,
        String,
        u64,
        String,
        u64,
        String,
    )>,
) -> Result<Json<TokenMetadata>, ApiError> {
    let owner_addr =
        Address::new(&owner).map_err(|e| bad_request(format!("Invalid owner: {}", e)))?;
    let claimed_amount = Decimal::from_str(&initial_amount)
        .map_err(|_| bad_request(format!("Invalid initial amount: {}", initial_amount)))?;

    let engine = state.engine.read().await;
    let record = engine
        .projection(&owner_addr, UserTokenId(user_token_id))
        .filter(|record| record.initial_amount.as_decimal() == claimed_amount)
        .ok_or_else(|| not_found("Projection not found"))?;

    match record.validity {
        Validity::Unknown => Err(not_found("Metadata not yet available")),
        Validity::Invalid if state.invalid_visibility == InvalidVisibility::Hidden => {
            Err(not_found("Projection not found"))
        }
        _ => Ok(Json(token_metadata(
            &record, standard, purpose, chain_id,
        ))),
    }
}

/// Active orders for an asset, price-ordered and paginated.
async fn orders_handler(
    State(state): State<Arc<ApiState>>,
    Path((contract, asset_id)): Path<(String, u128)>,
    Query(params): Query<PageParams>,
) -> Result<Json<OrdersResponse>, ApiError> {
    let contract =
        Address::new(&contract).map_err(|e| bad_request(format!("Invalid contract: {}", e)))?;
    if params.page == 0 {
        return Err(bad_request("Page numbers start at 1"));
    }
    let per_page = params.per_page.clamp(1, MAX_PER_PAGE);

    let asset = AssetKey { contract, asset_id };
    let engine = state.engine.read().await;
    let orders = engine.active_orders(&asset);
    let total = orders.len();

    let start = (params.page - 1).saturating_mul(per_page);
    let page: Vec<OrderSummary> = orders
        .iter()
        .skip(start)
        .take(per_page)
        .map(order_summary)
        .collect();

    Ok(Json(OrdersResponse {
        page: params.page,
        per_page,
        total,
        orders: page,
    }))
}

/// A wallet's projections, in id order.
///
/// `Invalid` projections follow the same visibility policy as the
/// metadata route; `Unknown` ones are listed as pending.
async fn owner_projections_handler(
    State(state): State<Arc<ApiState>>,
    Path(owner): Path<String>,
) -> Result<Json<ProjectionsResponse>, ApiError> {
    let owner_addr =
        Address::new(&owner).map_err(|e| bad_request(format!("Invalid owner: {}", e)))?;

    let engine = state.engine.read().await;
    let projections: Vec<ProjectionSummary> = engine
        .owner_projections(&owner_addr)
        .iter()
        .filter(|record| {
            record.validity != Validity::Invalid
                || state.invalid_visibility == InvalidVisibility::Tagged
        })
        .map(projection_summary)
        .collect();

    Ok(Json(ProjectionsResponse {
        owner: owner_addr.to_string(),
        projections,
    }))
}

/// Claimable settlement balance for an address.
async fn balance_handler(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let address =
        Address::new(&address).map_err(|e| bad_request(format!("Invalid address: {}", e)))?;

    let engine = state.engine.read().await;
    Ok(Json(BalanceResponse {
        balance: engine.balance(&address),
        address: address.to_string(),
    }))
}

// =============================================================================
// Mapping
// =============================================================================

fn token_metadata(
    record: &ProjectionRecord,
    standard: String,
    purpose: String,
    chain_id: u64,
) -> TokenMetadata {
    TokenMetadata {
        name: format!("{} #{}", purpose, record.user_token_id),
        standard,
        purpose,
        chain_id,
        owner: record.owner.to_string(),
        user_token_id: record.user_token_id.0,
        initial_amount: record.initial_amount.as_decimal(),
        current_amount: record.current_amount,
        validity: record.validity,
    }
}

fn order_summary(order: &Order) -> OrderSummary {
    OrderSummary {
        order_id: order.order_id.0,
        seller: order.seller.to_string(),
        remaining_amount: order.remaining_amount,
        price_per_asset: order.price_per_asset.as_decimal(),
        maker_fee_bp: order.maker_fee_bp.as_u32(),
        taker_fee_bp: order.taker_fee_bp.as_u32(),
    }
}

fn projection_summary(record: &ProjectionRecord) -> ProjectionSummary {
    ProjectionSummary {
        user_token_id: record.user_token_id.0,
        initial_amount: record.initial_amount.as_decimal(),
        current_amount: record.current_amount,
        validity: record.validity,
    }
}
