//! BOG callback rejects anything it can't verify.

use oakhouse_integration_tests::{base_url, client};
use reqwest::StatusCode;

const CALLBACK_BODY: &str = r#"{"event":"order_payment","zoned_request_time":"2026-10-16T10:00:00.000000Z","body":{"order_id":"bog-123","external_order_id":"1","order_status":{"key":"completed","value":"Completed"}}}"#;

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_unsigned_callback_is_rejected() {
    let resp = client()
        .post(format!("{}/api/payments/bog/callback", base_url()))
        .header("content-type", "application/json")
        .body(CALLBACK_BODY)
        .send()
        .await
        .expect("callback");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_forged_callback_is_rejected() {
    let resp = client()
        .post(format!("{}/api/payments/bog/callback", base_url()))
        .header("content-type", "application/json")
        .header("Callback-Signature", "Zm9yZ2Vk")
        .body(CALLBACK_BODY)
        .send()
        .await
        .expect("callback");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
