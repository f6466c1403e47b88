//! Discovery API behaviour over a seeded engine mirror: the metadata
//! route's visibility rules, order pagination and balance reads.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use prism_domain::{Address, Validity};
use prism_engine::{Engine, OrderParams};
use prism_testkit::{addr, asset, claim_payload, test_engine};
use prismd::api::{
    create_router, ApiState, BalanceResponse, ErrorResponse, OrdersResponse, ProjectionsResponse,
    TokenMetadata,
};
use prismd::InvalidVisibility;
use rust_decimal_macros::dec;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceExt;

fn router_over(engine: Engine, invalid_visibility: InvalidVisibility) -> Router {
    create_router(Arc::new(ApiState {
        engine: Arc::new(RwLock::new(engine)),
        invalid_visibility,
    }))
}

async fn get_json<T: DeserializeOwned>(router: &Router, uri: &str, expected: StatusCode) -> T {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), expected, "unexpected status for {uri}");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn seeded_owner() -> Address {
    addr("0xa11ce")
}

/// One valid, one unknown and one invalid projection for the owner.
fn engine_with_projections() -> Engine {
    let mut engine = test_engine();
    let owner = seeded_owner();
    engine
        .register_projection(owner.clone(), dec!(10), Some(&claim_payload("10", "erc1155")))
        .unwrap();
    engine.register_projection(owner.clone(), dec!(5), None).unwrap();
    engine
        .register_projection(owner, dec!(7), Some(&claim_payload("7", "unsupported")))
        .unwrap();
    engine
}

#[tokio::test]
async fn health_reports_ok() {
    let router = router_over(test_engine(), InvalidVisibility::Hidden);
    let body: serde_json::Value = get_json(&router, "/health", StatusCode::OK).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn metadata_serves_valid_projections() {
    let router = router_over(engine_with_projections(), InvalidVisibility::Hidden);

    let metadata: TokenMetadata = get_json(
        &router,
        "/inverseProjection/erc1155/gold/7777/0xa11ce/1/10",
        StatusCode::OK,
    )
    .await;
    assert_eq!(metadata.user_token_id, 1);
    assert_eq!(metadata.initial_amount, dec!(10));
    assert_eq!(metadata.validity, Validity::Valid);
    assert_eq!(metadata.chain_id, 7777);
}

#[tokio::test]
async fn metadata_distinguishes_unknown_id_from_undecided_validity() {
    let router = router_over(engine_with_projections(), InvalidVisibility::Hidden);

    // Never-observed id.
    let missing: ErrorResponse = get_json(
        &router,
        "/inverseProjection/erc1155/gold/7777/0xa11ce/9/10",
        StatusCode::NOT_FOUND,
    )
    .await;
    assert_eq!(missing.error, "Projection not found");

    // Observed but still undecided.
    let pending: ErrorResponse = get_json(
        &router,
        "/inverseProjection/erc1155/gold/7777/0xa11ce/2/5",
        StatusCode::NOT_FOUND,
    )
    .await;
    assert_eq!(pending.error, "Metadata not yet available");
}

#[tokio::test]
async fn metadata_rejects_a_uri_claiming_the_wrong_amount() {
    let router = router_over(engine_with_projections(), InvalidVisibility::Hidden);

    let _: ErrorResponse = get_json(
        &router,
        "/inverseProjection/erc1155/gold/7777/0xa11ce/1/11",
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
async fn invalid_projection_visibility_follows_deployment_policy() {
    let uri = "/inverseProjection/erc1155/gold/7777/0xa11ce/3/7";

    let hidden = router_over(engine_with_projections(), InvalidVisibility::Hidden);
    let _: ErrorResponse = get_json(&hidden, uri, StatusCode::NOT_FOUND).await;

    let tagged = router_over(engine_with_projections(), InvalidVisibility::Tagged);
    let metadata: TokenMetadata = get_json(&tagged, uri, StatusCode::OK).await;
    assert_eq!(metadata.validity, Validity::Invalid);
}

#[tokio::test]
async fn owner_listing_applies_the_visibility_policy() {
    let hidden = router_over(engine_with_projections(), InvalidVisibility::Hidden);
    let listing: ProjectionsResponse =
        get_json(&hidden, "/owners/0xa11ce/projections", StatusCode::OK).await;
    assert_eq!(listing.projections.len(), 2);

    let tagged = router_over(engine_with_projections(), InvalidVisibility::Tagged);
    let listing: ProjectionsResponse =
        get_json(&tagged, "/owners/0xa11ce/projections", StatusCode::OK).await;
    assert_eq!(listing.projections.len(), 3);
    assert!(listing
        .projections
        .iter()
        .any(|p| p.validity == Validity::Invalid));
}

#[tokio::test]
async fn orders_are_price_ordered_and_paginated() {
    let mut engine = test_engine();
    let seller = addr("0x5e11e4");
    let unit = asset("0xc0ffee", 1);
    for price in [dec!(5), dec!(2), dec!(3)] {
        engine
            .create_order(
                seller.clone(),
                OrderParams {
                    asset: unit.clone(),
                    amount: prism_domain::Quantity::new(dec!(10)).unwrap(),
                    price_per_asset: prism_domain::Price::new(price).unwrap(),
                },
                dec!(0),
            )
            .unwrap();
    }

    let router = router_over(engine, InvalidVisibility::Hidden);
    let page: OrdersResponse = get_json(
        &router,
        "/assets/0xc0ffee/1/orders?page=1&per_page=2",
        StatusCode::OK,
    )
    .await;
    assert_eq!(page.total, 3);
    assert_eq!(page.orders.len(), 2);
    assert_eq!(page.orders[0].price_per_asset, dec!(2));
    assert_eq!(page.orders[1].price_per_asset, dec!(3));

    let page: OrdersResponse = get_json(
        &router,
        "/assets/0xc0ffee/1/orders?page=2&per_page=2",
        StatusCode::OK,
    )
    .await;
    assert_eq!(page.orders.len(), 1);
    assert_eq!(page.orders[0].price_per_asset, dec!(5));
}

#[tokio::test]
async fn balances_read_zero_for_unknown_addresses() {
    let router = router_over(test_engine(), InvalidVisibility::Hidden);
    let balance: BalanceResponse = get_json(&router, "/balances/0xb0b", StatusCode::OK).await;
    assert_eq!(balance.balance, dec!(0));
    assert_eq!(balance.address, "0xb0b");
}

#[tokio::test]
async fn malformed_addresses_are_bad_requests() {
    let router = router_over(test_engine(), InvalidVisibility::Hidden);
    let _: ErrorResponse = get_json(&router, "/balances/nothex", StatusCode::BAD_REQUEST).await;
}
