//! BOG payment callback.
//!
//! BOG signs the raw request body with its private key. The signature is
//! checked before the body is parsed; an unsigned or tampered callback never
//! touches the database.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::routes::orders::order_service;
use crate::services::bog::CallbackEvent;
use crate::services::bog::callback::SIGNATURE_HEADER;
use crate::services::orders::OrderError;
use crate::state::AppState;

/// POST /api/payments/bog/callback
///
/// Returns 200 once the receipt is stored, including for orders that were
/// already paid, so BOG stops redelivering.
#[instrument(skip_all)]
pub async fn bog_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing signature".to_string()))?;

    state.callback_verifier().verify(&body, signature)?;
    let event = CallbackEvent::parse(&body)?;

    tracing::info!(
        event = %event.event,
        bog_order_id = %event.body.order_id,
        status = %event.body.order_status.key,
        "BOG callback received"
    );

    let orders = order_service(&state);
    match orders.handle_callback(&event).await {
        Ok(_) => Ok(StatusCode::OK),
        Err(OrderError::NotFound) => {
            tracing::warn!(bog_order_id = %event.body.order_id, "Callback for unknown order");
            Err(AppError::NotFound("Order not found".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}
