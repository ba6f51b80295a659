//! Registration, verification gate, login and logout.

use oakhouse_integration_tests::{TEST_PASSWORD, base_url, client, login_new_user, pool, unique_email};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_unverified_user_cannot_log_in() {
    let client = client();
    let base = base_url();
    let email = unique_email();

    let resp = client
        .post(format!("{base}/api/auth/register"))
        .json(&json!({"name": "Nino", "email": email, "password": TEST_PASSWORD}))
        .send()
        .await
        .expect("register");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .post(format!("{base}/api/auth/login"))
        .json(&json!({"email": email, "password": TEST_PASSWORD}))
        .send()
        .await
        .expect("login");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Same address again
    let resp = client
        .post(format!("{base}/api/auth/register"))
        .json(&json!({"name": "Nino", "email": email, "password": TEST_PASSWORD}))
        .send()
        .await
        .expect("register again");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_weak_password_is_rejected() {
    let resp = client()
        .post(format!("{}/api/auth/register", base_url()))
        .json(&json!({"name": "Nino", "email": unique_email(), "password": "short"}))
        .send()
        .await
        .expect("register");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("json body");
    assert!(body["error"].is_string());
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_login_me_logout() {
    let client = client();
    let pool = pool().await;
    let base = base_url();

    let user = login_new_user(&client, &pool).await;
    assert_eq!(user["is_admin"], false);

    let resp = client
        .get(format!("{base}/api/auth/me"))
        .send()
        .await
        .expect("me");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("json body");
    assert_eq!(body["user"]["email"], user["email"]);

    let resp = client
        .post(format!("{base}/api/auth/logout"))
        .send()
        .await
        .expect("logout");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{base}/api/auth/me"))
        .send()
        .await
        .expect("me after logout");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_forgot_password_does_not_reveal_accounts() {
    let resp = client()
        .post(format!("{}/api/auth/forgot-password", base_url()))
        .json(&json!({"email": unique_email()}))
        .send()
        .await
        .expect("forgot password");

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_expired_verification_link_is_rejected() {
    let client = client();
    let pool = pool().await;
    let base = base_url();
    let email = unique_email();

    let resp = client
        .post(format!("{base}/api/auth/register"))
        .json(&json!({"name": "Nino", "email": email, "password": TEST_PASSWORD}))
        .send()
        .await
        .expect("register");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let token = format!("expired-{}", unique_email());
    sqlx::query(
        r"
        INSERT INTO storefront.verification_token (email, token, expires_at)
        VALUES ($1, $2, NOW() - INTERVAL '1 hour')
        ",
    )
    .bind(&email)
    .bind(&token)
    .execute(&pool)
    .await
    .expect("seed expired token");

    let resp = client
        .post(format!("{base}/api/auth/verify-email"))
        .json(&json!({"token": token}))
        .send()
        .await
        .expect("verify");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("json body");
    assert_eq!(body["error"], "Invalid or expired link");

    let verified: Option<bool> =
        sqlx::query_scalar("SELECT email_verified IS NOT NULL FROM storefront.user WHERE email = $1")
            .bind(&email)
            .fetch_optional(&pool)
            .await
            .expect("user row");
    assert_eq!(verified, Some(false));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_expired_reset_link_keeps_old_password() {
    let client = client();
    let pool = pool().await;
    let base = base_url();

    let user = login_new_user(&client, &pool).await;
    let email = user["email"].as_str().expect("email").to_string();

    let token = format!("expired-{}", unique_email());
    sqlx::query(
        r"
        UPDATE storefront.user
        SET reset_token = $2, reset_token_expires = NOW() - INTERVAL '1 minute'
        WHERE email = $1
        ",
    )
    .bind(&email)
    .bind(&token)
    .execute(&pool)
    .await
    .expect("seed expired reset token");

    let resp = client
        .post(format!("{base}/api/auth/reset-password"))
        .json(&json!({"token": token, "password": "a-brand-new-walnut-77"}))
        .send()
        .await
        .expect("reset");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("json body");
    assert_eq!(body["error"], "Invalid or expired link");

    let resp = client
        .post(format!("{base}/api/auth/login"))
        .json(&json!({"email": email, "password": TEST_PASSWORD}))
        .send()
        .await
        .expect("login with old password");
    assert_eq!(resp.status(), StatusCode::OK);
}
