//! HTTP route handlers for the JSON API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Database reachability
//!
//! # Catalog
//! GET  /api/products                    - Paged listing (?category&search&featured&page&per_page)
//! GET  /api/products/{slug}             - Product detail
//! GET  /api/categories                  - Categories with product counts
//!
//! # Cart (auth)
//! GET    /api/cart                      - Cart with subtotal and saved address
//! DELETE /api/cart                      - Empty the cart
//! POST   /api/cart/items                - Add units of a product
//! PATCH  /api/cart/items/{product_id}   - Set quantity (0 removes)
//! DELETE /api/cart/items/{product_id}   - Remove a line
//! GET    /api/checkout/address          - Saved shipping address
//! PUT    /api/checkout/address          - Save shipping address
//!
//! # Orders (auth)
//! POST /api/orders                      - Place order, start BOG payment
//! GET  /api/orders                      - Order history
//! GET  /api/orders/{id}                 - Order with lines (owner or admin)
//! GET  /api/orders/{id}/status          - Poll BOG and record the result
//!
//! # Payments
//! POST /api/payments/bog/callback       - Signed BOG payment callback
//!
//! # Contact (rate limited)
//! POST /api/contact                     - Relay a message to the store inbox
//!
//! # Auth (writes rate limited)
//! POST /api/auth/register
//! POST /api/auth/login
//! POST /api/auth/logout
//! GET  /api/auth/me
//! POST /api/auth/verify-email
//! POST /api/auth/resend-verification
//! POST /api/auth/forgot-password
//! POST /api/auth/reset-password
//!
//! # Admin (admin)
//! GET    /api/admin/products
//! POST   /api/admin/products
//! PUT    /api/admin/products/{id}
//! DELETE /api/admin/products/{id}
//! POST   /api/admin/uploads             - Multipart image upload to Cloudinary
//! GET    /api/admin/orders              - ?paid&delivered&page&per_page
//! POST   /api/admin/orders/{id}/deliver
//! GET    /api/admin/users
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod contact;
pub mod extract;
pub mod health;
pub mod orders;
pub mod payments;
pub mod products;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
};
use serde::Serialize;

use crate::middleware::{auth_rate_limiter, contact_rate_limiter};
use crate::state::AppState;

/// Body for endpoints that only acknowledge.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/products/{slug}", get(products::show))
        .route("/categories", get(products::categories))
}

/// Create the cart and checkout address routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::show).delete(cart::clear))
        .route("/cart/items", post(cart::add_item))
        .route(
            "/cart/items/{product_id}",
            patch(cart::update_item).delete(cart::remove_item),
        )
        .route(
            "/checkout/address",
            get(cart::address).put(cart::save_address),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::create))
        .route("/{id}", get(orders::show))
        .route("/{id}/status", get(orders::status))
}

/// Create the auth routes router.
///
/// Credential and email-sending endpoints share a per-IP limiter.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/verify-email", post(auth::verify_email))
        .route("/resend-verification", post(auth::resend_verification))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .merge(limited)
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(admin::products).post(admin::create_product),
        )
        .route(
            "/products/{id}",
            put(admin::update_product).delete(admin::delete_product),
        )
        .route(
            "/uploads",
            post(admin::upload).layer(DefaultBodyLimit::max(admin::MAX_UPLOAD_BYTES)),
        )
        .route("/orders", get(admin::orders))
        .route("/orders/{id}/deliver", post(admin::deliver))
        .route("/users", get(admin::users))
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .merge(catalog_routes())
        .merge(cart_routes())
        .nest("/orders", order_routes())
        .route("/payments/bog/callback", post(payments::bog_callback))
        .route(
            "/contact",
            post(contact::submit).layer(contact_rate_limiter()),
        )
        .nest("/auth", auth_routes())
        .nest("/admin", admin_routes());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;
    use crate::config::tests::test_config;
    use crate::services::bog::callback::SIGNATURE_HEADER;

    /// Full router over a pool that never connects. Every request here must
    /// be answered before a query would run.
    fn app() -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/oakhouse_test")
            .unwrap();
        let state = AppState::new(test_config(), pool).unwrap();

        routes()
            .layer(SessionManagerLayer::new(MemoryStore::default()))
            .with_state(state)
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app().oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cart_requires_login() {
        let (status, body) = send(get_request("/api/cart")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentication required");
    }

    #[tokio::test]
    async fn test_orders_require_login() {
        let (status, _) = send(get_request("/api/orders/1")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .method("POST")
            .uri("/api/orders")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_requires_login() {
        let (status, body) = send(get_request("/api/admin/users")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_me_requires_login() {
        let (status, _) = send(get_request("/api/auth/me")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_callback_without_signature_is_rejected() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/payments/bog/callback")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"event":"order_payment","body":{}}"#))
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Missing signature");
    }

    #[tokio::test]
    async fn test_callback_with_bad_signature_is_rejected() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/payments/bog/callback")
            .header(SIGNATURE_HEADER, "bm90IGEgc2lnbmF0dXJl")
            .body(Body::from(r#"{"event":"order_payment","body":{}}"#))
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid signature");
    }

    #[tokio::test]
    async fn test_auth_limiter_answers_with_json_error() {
        let app = app();
        let verify = || {
            Request::builder()
                .method("POST")
                .uri("/api/auth/verify-email")
                .header("cf-connecting-ip", "203.0.113.9")
                .header("content-type", "application/json")
                .body(Body::from("not json"))
                .unwrap()
        };

        for _ in 0..5 {
            let response = app.clone().oneshot(verify()).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        let response = app.clone().oneshot(verify()).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Too many requests, please try again later");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let response = app().oneshot(get_request("/api/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
