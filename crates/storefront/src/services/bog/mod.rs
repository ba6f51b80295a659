//! Bank of Georgia (BOG) online payments.
//!
//! # Architecture
//!
//! - `token` - Process-wide OAuth2 bearer token cache with single-flight refresh
//! - `client` - Payments API: create an order, fetch its receipt
//! - `callback` - RSA signature check and payload types for payment callbacks
//!
//! Every API call goes through [`TokenCache::with_token`], which retries once
//! with a fresh token when the gateway answers `401`.

pub mod callback;
pub mod client;
pub mod token;

pub use callback::{CallbackEvent, CallbackVerifier};
pub use client::{BasketItem, BogClient, CreateOrderRequest, CreatedOrder, Receipt};
pub use token::{AccessToken, OAuthTokenSource, TokenCache, TokenSource};

use thiserror::Error;

/// Errors that can occur when talking to BOG.
#[derive(Debug, Error)]
pub enum BogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The bearer token was rejected.
    #[error("BOG rejected the access token")]
    Unauthorized,

    /// Failed to parse a response or callback body.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Callback signature missing, malformed or wrong.
    #[error("Signature error: {0}")]
    Signature(String),
}

/// Turn a non-success response into a `BogError`, keeping the body text.
async fn error_from_response(response: reqwest::Response) -> BogError {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return BogError::Unauthorized;
    }
    let message = response.text().await.unwrap_or_default();
    BogError::Api {
        status: status.as_u16(),
        message,
    }
}
