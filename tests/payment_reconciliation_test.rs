mod common;

use axum::http::{Method, StatusCode};
use common::{as_decimal, body_json, GatewayScript, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

async fn create_pending_order(app: &TestApp, token: &str) -> String {
    let payload = json!({
        "items": [{ "name": "Tee", "quantity": 4, "price": 25 }],
        "total": 100,
        "amountPaid": 0,
        "paymentMethod": "paystack",
        "status": "pending"
    });
    let response = app
        .request(Method::POST, "/api/v1/orders", Some(payload), Some(token))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn fetch_order(app: &TestApp, token: &str, order_id: &str) -> Value {
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_id),
            None,
            Some(token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"].clone()
}

#[tokio::test]
async fn initialization_returns_a_redirect_without_touching_the_order() {
    let app = TestApp::new().await;
    let token = app.token_for(Uuid::new_v4(), &[]);
    let order_id = create_pending_order(&app, &token).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/initialize",
            Some(json!({
                "orderId": order_id,
                "amount": 100,
                "email": "buyer@example.com"
            })),
            Some(token.as_str()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let data = &body["data"];

    let reference = data["reference"].as_str().unwrap();
    assert!(reference.starts_with(&format!("order_{}_", order_id)));
    assert_eq!(
        data["authorization_url"],
        format!("https://checkout.test/{}", reference)
    );

    // Nothing has been paid yet; the order must be untouched.
    let order = fetch_order(&app, &token, &order_id).await;
    assert_eq!(order["paymentStatus"], "pending");
    assert_eq!(order["status"], "pending");
    assert_eq!(as_decimal(&order["amountPaid"]), dec!(0));
}

#[tokio::test]
async fn initialization_requires_all_fields() {
    let app = TestApp::new().await;
    let token = app.token_for(Uuid::new_v4(), &[]);
    let order_id = create_pending_order(&app, &token).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/initialize",
            Some(json!({ "orderId": order_id, "amount": 100 })),
            Some(token.as_str()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Validation error: Missing required fields");
}

#[tokio::test]
async fn zero_amount_initialization_never_reaches_the_processor() {
    let app = TestApp::new().await;
    let token = app.token_for(Uuid::new_v4(), &[]);
    let order_id = create_pending_order(&app, &token).await;

    for amount in [0, -100] {
        let response = app
            .request(
                Method::POST,
                "/api/v1/payments/initialize",
                Some(json!({
                    "orderId": order_id,
                    "amount": amount,
                    "email": "buyer@example.com"
                })),
                Some(token.as_str()),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Validation error: Missing required fields");
    }
}

#[tokio::test]
async fn payments_are_scoped_to_the_orders_owner() {
    let app = TestApp::new().await;
    let owner = app.token_for(Uuid::new_v4(), &[]);
    let stranger = app.token_for(Uuid::new_v4(), &[]);
    let order_id = create_pending_order(&app, &owner).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/initialize",
            Some(json!({
                "orderId": order_id,
                "amount": 100,
                "email": "buyer@example.com"
            })),
            Some(stranger.as_str()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/verify",
            Some(json!({ "orderId": order_id, "reference": "order_x_1" })),
            Some(stranger.as_str()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Unknown orders stay a 404 regardless of caller.
    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/initialize",
            Some(json!({
                "orderId": Uuid::new_v4(),
                "amount": 100,
                "email": "buyer@example.com"
            })),
            Some(owner.as_str()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn successful_verification_settles_the_order_in_full() {
    let app = TestApp::new().await;
    let token = app.token_for(Uuid::new_v4(), &[]);
    let order_id = create_pending_order(&app, &token).await;

    let verify = json!({ "orderId": order_id, "reference": "order_ref_1" });
    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/verify",
            Some(verify.clone()),
            Some(token.as_str()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Payment verified successfully");

    let data = &body["data"];
    assert_eq!(data["paymentStatus"], "completed");
    assert_eq!(data["status"], "processing");
    assert_eq!(data["paystackReference"], "order_ref_1");
    assert_eq!(as_decimal(&data["amountPaid"]), dec!(100));
    assert_eq!(as_decimal(&data["balanceRemaining"]), dec!(0));

    // Verifying again converges on the same state.
    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/verify",
            Some(verify),
            Some(token.as_str()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["paymentStatus"], "completed");
    assert_eq!(body["data"]["status"], "processing");
    assert_eq!(as_decimal(&body["data"]["amountPaid"]), dec!(100));
}

#[tokio::test]
async fn failed_verification_records_the_failure_and_keeps_the_status() {
    let app = TestApp::new().await;
    let token = app.token_for(Uuid::new_v4(), &[]);
    let order_id = create_pending_order(&app, &token).await;

    app.gateway.set(GatewayScript::Declined);
    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/verify",
            Some(json!({ "orderId": order_id, "reference": "order_ref_2" })),
            Some(token.as_str()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["message"],
        "Payment failed: Payment verification failed"
    );

    let order = fetch_order(&app, &token, &order_id).await;
    assert_eq!(order["paymentStatus"], "failed");
    // Fulfillment status is not the reconciler's to change on failure.
    assert_eq!(order["status"], "pending");
    assert_eq!(as_decimal(&order["amountPaid"]), dec!(0));
}

#[tokio::test]
async fn unreachable_processor_surfaces_upstream_error_without_mutation() {
    let app = TestApp::new().await;
    let token = app.token_for(Uuid::new_v4(), &[]);
    let order_id = create_pending_order(&app, &token).await;

    app.gateway.set(GatewayScript::Unreachable);

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/verify",
            Some(json!({ "orderId": order_id, "reference": "order_ref_3" })),
            Some(token.as_str()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(
        body["message"],
        "External service error: Payment processor unreachable"
    );

    app.gateway.set(GatewayScript::Success);
    let order = fetch_order(&app, &token, &order_id).await;
    assert_eq!(order["paymentStatus"], "pending");
    assert_eq!(order["status"], "pending");
}

#[tokio::test]
async fn verification_requires_order_id_and_reference() {
    let app = TestApp::new().await;
    let token = app.token_for(Uuid::new_v4(), &[]);

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/verify",
            Some(json!({ "reference": "order_ref_4" })),
            Some(token.as_str()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["message"],
        "Validation error: Missing required fields: orderId and reference"
    );
}
