//! Cart and checkout guards for a logged-in customer.

use oakhouse_integration_tests::{base_url, client, login_new_user, pool, seed_product};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_cart_requires_login() {
    let resp = client()
        .get(format!("{}/api/cart", base_url()))
        .send()
        .await
        .expect("cart");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_new_user_has_empty_cart_and_cannot_check_out() {
    let client = client();
    let pool = pool().await;
    let base = base_url();
    login_new_user(&client, &pool).await;

    let resp = client
        .get(format!("{base}/api/cart"))
        .send()
        .await
        .expect("cart");
    assert_eq!(resp.status(), StatusCode::OK);
    let cart: Value = resp.json().await.expect("json body");
    assert_eq!(cart["item_count"], 0);
    assert!(cart["shipping_address"].is_null());

    let resp = client
        .post(format!("{base}/api/orders"))
        .send()
        .await
        .expect("checkout");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("json body");
    assert_eq!(body["error"], "Cart is empty");
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_shipping_address_round_trip_and_validation() {
    let client = client();
    let pool = pool().await;
    let base = base_url();
    login_new_user(&client, &pool).await;

    let resp = client
        .put(format!("{base}/api/checkout/address"))
        .json(&json!({
            "full_name": "Nino Beridze",
            "phone": "+995 555 12 34 56",
            "address": "12 Rustaveli Ave",
            "city": "Tbilisi",
            "postal_code": "0108"
        }))
        .send()
        .await
        .expect("save address");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{base}/api/checkout/address"))
        .send()
        .await
        .expect("get address");
    let address: Value = resp.json().await.expect("json body");
    assert_eq!(address["city"], "Tbilisi");

    let resp = client
        .put(format!("{base}/api/checkout/address"))
        .json(&json!({
            "full_name": " ",
            "phone": "",
            "address": "",
            "city": "",
            "postal_code": ""
        }))
        .send()
        .await
        .expect("save bad address");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_other_users_orders_are_hidden() {
    let client = client();
    let pool = pool().await;
    login_new_user(&client, &pool).await;

    let resp = client
        .get(format!("{}/api/orders/2147483647", base_url()))
        .send()
        .await
        .expect("order");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_checkout_prices_come_from_the_catalog() {
    let client = client();
    let pool = pool().await;
    let base = base_url();
    let user = login_new_user(&client, &pool).await;

    let table = seed_product(&pool, "1250.00", 3).await;
    let chair = seed_product(&pool, "180.50", 10).await;

    for (product, quantity) in [(table, 1), (chair, 4)] {
        let resp = client
            .post(format!("{base}/api/cart/items"))
            .json(&json!({"product_id": product, "quantity": quantity, "price": 1}))
            .send()
            .await
            .expect("add item");
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = client
        .post(format!("{base}/api/orders"))
        .send()
        .await
        .expect("checkout without address");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("json body");
    assert_eq!(body["error"], "Shipping address is required");

    let resp = client
        .put(format!("{base}/api/checkout/address"))
        .json(&json!({
            "full_name": "Nino Beridze",
            "phone": "+995 555 12 34 56",
            "address": "12 Rustaveli Ave",
            "city": "Tbilisi"
        }))
        .send()
        .await
        .expect("save address");
    assert_eq!(resp.status(), StatusCode::OK);

    // The order row is written before BOG is called, so the total can be
    // checked whether or not the test server reaches the gateway.
    let resp = client
        .post(format!("{base}/api/orders"))
        .send()
        .await
        .expect("checkout");
    assert!(
        resp.status() == StatusCode::CREATED || resp.status() == StatusCode::BAD_GATEWAY,
        "unexpected checkout status {}",
        resp.status()
    );

    let total: Decimal = sqlx::query_scalar(
        r"
        SELECT total_price FROM storefront.order
        WHERE user_id = $1
        ORDER BY id DESC
        LIMIT 1
        ",
    )
    .bind(
        user["id"]
            .as_i64()
            .and_then(|id| i32::try_from(id).ok())
            .expect("user id"),
    )
    .fetch_one(&pool)
    .await
    .expect("order total");
    assert_eq!(total, Decimal::new(197_200, 2));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_checkout_rechecks_stock() {
    let client = client();
    let pool = pool().await;
    let base = base_url();
    login_new_user(&client, &pool).await;

    let sideboard = seed_product(&pool, "2100.00", 2).await;
    let resp = client
        .post(format!("{base}/api/cart/items"))
        .json(&json!({"product_id": sideboard, "quantity": 2}))
        .send()
        .await
        .expect("add item");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .put(format!("{base}/api/checkout/address"))
        .json(&json!({
            "full_name": "Nino Beridze",
            "phone": "+995 555 12 34 56",
            "address": "12 Rustaveli Ave",
            "city": "Tbilisi"
        }))
        .send()
        .await
        .expect("save address");
    assert_eq!(resp.status(), StatusCode::OK);

    // Someone else bought one in the meantime.
    sqlx::query("UPDATE storefront.product SET stock = 1 WHERE id = $1")
        .bind(sideboard)
        .execute(&pool)
        .await
        .expect("lower stock");

    let resp = client
        .post(format!("{base}/api/orders"))
        .send()
        .await
        .expect("checkout");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("json body");
    assert!(
        body["error"].as_str().is_some_and(|msg| msg.contains("in stock")),
        "got {body}"
    );
}
