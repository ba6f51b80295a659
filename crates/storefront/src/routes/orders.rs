//! Checkout and order history handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::instrument;

use oakhouse_core::{OrderId, UserId};

use crate::db::UserRepository;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::{Order, OrderDetail};
use crate::routes::extract::ApiPath;
use crate::services::orders::{OrderService, Viewer};
use crate::state::AppState;

/// Response of `POST /api/orders`.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    /// BOG payment page to send the customer to.
    pub redirect_url: String,
}

pub(crate) fn order_service(state: &AppState) -> OrderService<'_> {
    OrderService::new(
        state.pool(),
        state.bog(),
        state.email(),
        state.products(),
        state.config(),
    )
}

/// POST /api/orders
///
/// Place an order from the cart and start the payment.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<(StatusCode, Json<CheckoutResponse>)> {
    let checkout = order_service(&state).checkout(user.id).await?;

    let order_id = checkout.order.id.to_string();
    add_breadcrumb("checkout", "Payment started", Some(&[("order_id", order_id.as_str())]));

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order_id: checkout.order.id,
            redirect_url: checkout.redirect_url,
        }),
    ))
}

/// GET /api/orders
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(order_service(&state).list_for_user(user.id).await?))
}

/// GET /api/orders/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<OrderDetail>> {
    let viewer = viewer(&state, user.id).await?;
    Ok(Json(order_service(&state).detail(viewer, id).await?))
}

/// GET /api/orders/{id}/status
///
/// Poll BOG for the payment result. Used by the payment return page in case
/// the callback hasn't arrived yet.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<Order>> {
    let viewer = viewer(&state, user.id).await?;
    Ok(Json(order_service(&state).refresh_status(viewer, id).await?))
}

/// Admins may look at any order.
async fn viewer(state: &AppState, user_id: UserId) -> Result<Viewer> {
    let is_admin = UserRepository::new(state.pool())
        .get_by_id(user_id)
        .await?
        .is_some_and(|user| user.is_admin);
    Ok(Viewer { user_id, is_admin })
}
