//! Payment endpoints. Both operations act on one of the caller's orders and
//! delegate the actual money movement to the gateway client.

use axum::{extract::State, routing::post, Json, Router};

use crate::{
    auth::AuthenticatedUser,
    errors::ServiceError,
    services::{
        orders::OrderResponse,
        payments::{InitializePaymentRequest, InitializePaymentResponse, VerifyPaymentRequest},
    },
    ApiResponse, AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/payments/initialize",
    request_body = InitializePaymentRequest,
    responses(
        (status = 200, description = "Transaction initialized", body = crate::ApiResponse<InitializePaymentResponse>),
        (status = 400, description = "Missing fields", body = crate::errors::ErrorResponse),
        (status = 502, description = "Processor error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn initialize_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<InitializePaymentRequest>,
) -> Result<Json<ApiResponse<InitializePaymentResponse>>, ServiceError> {
    let response = state
        .services
        .payments
        .initialize_payment(user.user_id, request)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment settled, order updated", body = crate::ApiResponse<OrderResponse>),
        (status = 400, description = "Verification failed", body = crate::errors::ErrorResponse),
        (status = 502, description = "Processor error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state
        .services
        .payments
        .verify_payment(user.user_id, request)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        order,
        "Payment verified successfully",
    )))
}

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/initialize", post(initialize_payment))
        .route("/verify", post(verify_payment))
}
