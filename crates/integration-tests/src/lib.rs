//! Integration tests for the Oakhouse storefront API.
//!
//! These drive a running server over HTTP and are `#[ignore]`d by default.
//!
//! # Running Tests
//!
//! ```bash
//! cargo run -p oakhouse-cli -- migrate
//! cargo run -p oakhouse-storefront &
//! cargo test -p oakhouse-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_TEST_URL` - API base URL (default: `http://localhost:3000`)
//! - `STOREFRONT_DATABASE_URL` - Used to verify test accounts and seed rows

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::expect_used)]

use reqwest::Client;
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

/// Password used for every test account.
pub const TEST_PASSWORD: &str = "oak-and-walnut-42";

/// Base URL for the API (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("STOREFRONT_TEST_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Client that keeps the session cookie between requests.
///
/// Every request carries an `X-Forwarded-For` so rate limiting keys on a
/// per-run address.
#[must_use]
pub fn client() -> Client {
    let mut headers = reqwest::header::HeaderMap::new();
    let octet = Uuid::new_v4().as_bytes().first().copied().unwrap_or(1);
    headers.insert(
        "x-forwarded-for",
        format!("198.51.100.{octet}")
            .parse()
            .expect("valid header value"),
    );

    Client::builder()
        .cookie_store(true)
        .default_headers(headers)
        .build()
        .expect("Failed to create HTTP client")
}

/// A unique address for a throwaway account.
#[must_use]
pub fn unique_email() -> String {
    format!("test-{}@oakhouse.test", Uuid::new_v4().simple())
}

/// Connect to the storefront database.
pub async fn pool() -> PgPool {
    let url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("STOREFRONT_DATABASE_URL must be set for integration tests");
    PgPool::connect(&url)
        .await
        .expect("Failed to connect to storefront database")
}

/// Register an account, mark it verified in the database and log in.
///
/// Returns the logged-in user JSON.
pub async fn login_new_user(client: &Client, pool: &PgPool) -> Value {
    let base = base_url();
    let email = unique_email();

    let resp = client
        .post(format!("{base}/api/auth/register"))
        .json(&json!({"name": "Test Customer", "email": email, "password": TEST_PASSWORD}))
        .send()
        .await
        .expect("register request");
    assert_eq!(resp.status(), 201, "register failed");

    sqlx::query("UPDATE storefront.user SET email_verified = NOW() WHERE email = $1")
        .bind(&email)
        .execute(pool)
        .await
        .expect("mark verified");

    let resp = client
        .post(format!("{base}/api/auth/login"))
        .json(&json!({"email": email, "password": TEST_PASSWORD}))
        .send()
        .await
        .expect("login request");
    assert_eq!(resp.status(), 200, "login failed");

    let body: Value = resp.json().await.expect("login body");
    body["user"].clone()
}

/// Insert a product with a unique slug. Returns its id.
pub async fn seed_product(pool: &PgPool, price: &str, stock: i32) -> i32 {
    let slug = format!("test-{}", Uuid::new_v4().simple());
    sqlx::query_scalar(
        r"
        INSERT INTO storefront.product (name, slug, category, price, stock)
        VALUES ($1, $2, 'test', $3::numeric, $4)
        RETURNING id
        ",
    )
    .bind(format!("Test piece {slug}"))
    .bind(&slug)
    .bind(price)
    .bind(stock)
    .fetch_one(pool)
    .await
    .expect("seed product")
}

/// Insert a verified customer without going through the API. Returns its id.
pub async fn seed_user(pool: &PgPool) -> i32 {
    sqlx::query_scalar(
        r"
        INSERT INTO storefront.user (email, name, password_hash, email_verified)
        VALUES ($1, 'Seeded Customer', 'not-a-password-hash', NOW())
        RETURNING id
        ",
    )
    .bind(unique_email())
    .fetch_one(pool)
    .await
    .expect("seed user")
}

/// Current stock of a product.
pub async fn stock_of(pool: &PgPool, product_id: i32) -> i32 {
    sqlx::query_scalar("SELECT stock FROM storefront.product WHERE id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .expect("product stock")
}
