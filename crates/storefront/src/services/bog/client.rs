//! BOG Payments API client.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use oakhouse_core::{Money, PaymentStatus};

use super::token::{AccessToken, DEFAULT_SKEW, OAuthTokenSource, TokenCache};
use super::{BogError, error_from_response};
use crate::config::BogConfig;

/// BOG Payments API client.
///
/// Cheap to clone; all clones share one token cache.
#[derive(Clone)]
pub struct BogClient {
    inner: Arc<BogClientInner>,
}

struct BogClientInner {
    http: reqwest::Client,
    api_url: String,
    language: String,
    tokens: TokenCache<OAuthTokenSource>,
}

/// Body of `POST /payments/v1/ecommerce/orders`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    pub callback_url: String,
    pub external_order_id: String,
    pub purchase_units: PurchaseUnits,
    pub redirect_urls: RedirectUrls,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseUnits {
    pub currency: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub basket: Vec<BasketItem>,
}

/// One product line sent to the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct BasketItem {
    pub product_id: String,
    pub description: String,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedirectUrls {
    pub success: String,
    pub fail: String,
}

impl CreateOrderRequest {
    /// An order for `total`, charged in the total's currency.
    #[must_use]
    pub fn new(
        external_order_id: impl Into<String>,
        callback_url: impl Into<String>,
        total: Money,
        basket: Vec<BasketItem>,
        success_url: impl Into<String>,
        fail_url: impl Into<String>,
    ) -> Self {
        Self {
            callback_url: callback_url.into(),
            external_order_id: external_order_id.into(),
            purchase_units: PurchaseUnits {
                currency: total.currency.code().to_string(),
                total_amount: total.rounded(),
                basket,
            },
            redirect_urls: RedirectUrls {
                success: success_url.into(),
                fail: fail_url.into(),
            },
        }
    }
}

/// An order registered with the gateway.
#[derive(Debug, Clone)]
pub struct CreatedOrder {
    /// BOG order id, stored as the order's `payment_id`.
    pub id: String,
    /// Hosted payment page the customer is sent to.
    pub redirect_url: String,
}

#[derive(Deserialize)]
struct CreateOrderResponse {
    id: String,
    #[serde(rename = "_links")]
    links: Links,
}

#[derive(Deserialize)]
struct Links {
    redirect: Link,
}

#[derive(Deserialize)]
struct Link {
    href: String,
}

/// Payment details for one BOG order.
///
/// Only the fields the store acts on are typed; the rest is kept in `extra`
/// so the full payload can be stored on the order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub order_id: String,
    #[serde(default)]
    pub external_order_id: Option<String>,
    pub order_status: OrderStatus,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatus {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl Receipt {
    #[must_use]
    pub fn status(&self) -> PaymentStatus {
        PaymentStatus::from_bog_key(&self.order_status.key)
    }
}

impl BogClient {
    /// Create a client with its own token cache.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &BogConfig) -> Result<Self, BogError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let source = OAuthTokenSource::new(
            http.clone(),
            config.oauth_url.clone(),
            config.client_id.clone(),
            config.client_secret.clone(),
        );

        Ok(Self {
            inner: Arc::new(BogClientInner {
                http,
                api_url: config.api_url.trim_end_matches('/').to_string(),
                language: config.language.clone(),
                tokens: TokenCache::new(source, DEFAULT_SKEW),
            }),
        })
    }

    /// Register an order and get the hosted payment page.
    ///
    /// The same idempotency key is sent on the retry after a rejected token,
    /// so the gateway never creates the order twice.
    ///
    /// # Errors
    ///
    /// Returns error if the token refresh or the API request fails.
    #[instrument(skip(self, request), fields(external_order_id = %request.external_order_id))]
    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<CreatedOrder, BogError> {
        let url = format!("{}/payments/v1/ecommerce/orders", self.inner.api_url);
        let idempotency_key = Uuid::new_v4().to_string();
        let url = url.as_str();
        let key = idempotency_key.as_str();

        let created = self
            .inner
            .tokens
            .with_token(move |token| self.send_create(url, key, request, token))
            .await?;

        tracing::info!(bog_order_id = %created.id, "BOG order created");
        Ok(created)
    }

    async fn send_create(
        &self,
        url: &str,
        idempotency_key: &str,
        request: &CreateOrderRequest,
        token: AccessToken,
    ) -> Result<CreatedOrder, BogError> {
        let response = self
            .inner
            .http
            .post(url)
            .bearer_auth(token.secret())
            .header("Idempotency-Key", idempotency_key)
            .header("Accept-Language", &self.inner.language)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: CreateOrderResponse = response
            .json()
            .await
            .map_err(|e| BogError::Parse(format!("create order response: {e}")))?;

        Ok(CreatedOrder {
            id: body.id,
            redirect_url: body.links.redirect.href,
        })
    }

    /// Fetch the current payment details of a BOG order.
    ///
    /// # Errors
    ///
    /// Returns error if the token refresh or the API request fails.
    #[instrument(skip(self))]
    pub async fn receipt(&self, bog_order_id: &str) -> Result<Receipt, BogError> {
        let url = format!(
            "{}/payments/v1/receipt/{}",
            self.inner.api_url,
            urlencoding::encode(bog_order_id)
        );
        let url = url.as_str();

        self.inner
            .tokens
            .with_token(move |token| self.send_receipt(url, token))
            .await
    }

    async fn send_receipt(&self, url: &str, token: AccessToken) -> Result<Receipt, BogError> {
        let response = self
            .inner
            .http
            .get(url)
            .bearer_auth(token.secret())
            .header("Accept-Language", &self.inner.language)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| BogError::Parse(format!("receipt: {e}")))
    }
}
