//! Cart and shipping address handlers.
//!
//! Every handler returns the full cart so the frontend can re-render from a
//! single response.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use oakhouse_core::ProductId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{CartView, ShippingAddress};
use crate::routes::extract::{ApiJson, ApiPath};
use crate::services::cart::CartService;
use crate::state::AppState;

/// Body of `POST /api/cart/items`.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: i32,
}

const fn one() -> i32 {
    1
}

/// Body of `PATCH /api/cart/items/{product_id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

/// GET /api/cart
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartView>> {
    Ok(Json(CartService::new(state.pool()).view(user.id).await?))
}

/// DELETE /api/cart
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartView>> {
    Ok(Json(CartService::new(state.pool()).clear(user.id).await?))
}

/// POST /api/cart/items
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<AddItemRequest>,
) -> Result<Json<CartView>> {
    let cart = CartService::new(state.pool())
        .add(user.id, body.product_id, body.quantity)
        .await?;
    Ok(Json(cart))
}

/// PATCH /api/cart/items/{product_id}
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn update_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(product_id): ApiPath<ProductId>,
    ApiJson(body): ApiJson<UpdateItemRequest>,
) -> Result<Json<CartView>> {
    let cart = CartService::new(state.pool())
        .set_quantity(user.id, product_id, body.quantity)
        .await?;
    Ok(Json(cart))
}

/// DELETE /api/cart/items/{product_id}
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Json<CartView>> {
    let cart = CartService::new(state.pool())
        .remove(user.id, product_id)
        .await?;
    Ok(Json(cart))
}

/// GET /api/checkout/address
///
/// `null` until an address has been saved.
pub async fn address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Option<ShippingAddress>>> {
    let address = CartService::new(state.pool())
        .shipping_address(user.id)
        .await?;
    Ok(Json(address))
}

/// PUT /api/checkout/address
#[instrument(skip(state, user, address), fields(user_id = %user.id))]
pub async fn save_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(address): ApiJson<ShippingAddress>,
) -> Result<Json<ShippingAddress>> {
    let address = CartService::new(state.pool())
        .save_shipping_address(user.id, address)
        .await?;
    Ok(Json(address))
}
