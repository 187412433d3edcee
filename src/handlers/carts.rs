//! Cart preview endpoints.
//!
//! Carts live client-side; these endpoints validate and price them without
//! requiring a session, so storefronts can show totals before login.

use axum::{extract::State, routing::post, Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    errors::ServiceError,
    services::{
        carts::{CartItemRequest, CartValidationResponse},
        shipping::{self, ShippingQuote},
    },
    ApiResponse, AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CalculateShippingRequest {
    pub country: Option<String>,
    #[serde(default, rename = "totalPrice")]
    pub total_price: Decimal,
}

fn parse_cart_items(payload: &serde_json::Value) -> Result<Vec<CartItemRequest>, ServiceError> {
    let invalid = || ServiceError::ValidationError("Invalid cart items".to_string());

    let items = payload.get("items").and_then(|v| v.as_array()).ok_or_else(invalid)?;
    items
        .iter()
        .map(|item| serde_json::from_value(item.clone()).map_err(|_| invalid()))
        .collect()
}

#[utoipa::path(
    post,
    path = "/api/v1/cart/validate",
    request_body = Vec<CartItemRequest>,
    responses(
        (status = 200, description = "Validated cart", body = crate::ApiResponse<CartValidationResponse>),
        (status = 400, description = "Invalid cart items", body = crate::errors::ErrorResponse)
    ),
    tag = "Cart"
)]
pub async fn validate_cart(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<ApiResponse<CartValidationResponse>>, ServiceError> {
    let items = parse_cart_items(&payload)?;
    let response = state.services.carts.validate_cart(&items).await?;
    Ok(Json(ApiResponse::success(response)))
}

#[utoipa::path(
    post,
    path = "/api/v1/cart/shipping",
    request_body = CalculateShippingRequest,
    responses(
        (status = 200, description = "Shipping quote", body = crate::ApiResponse<ShippingQuote>)
    ),
    tag = "Cart"
)]
pub async fn calculate_shipping(
    Json(request): Json<CalculateShippingRequest>,
) -> Result<Json<ApiResponse<ShippingQuote>>, ServiceError> {
    let country = request.country.as_deref().unwrap_or("");
    let quote = shipping::compute(country, request.total_price);
    Ok(Json(ApiResponse::success(quote)))
}

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/validate", post(validate_cart))
        .route("/shipping", post(calculate_shipping))
}
