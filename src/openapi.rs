use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = env!("CARGO_PKG_VERSION"),
        description = r#"
Order lifecycle and payment reconciliation API for a retail storefront.

Carts live client-side; the API validates and prices them, creates orders,
enforces ownership on every order read and mutation, and reconciles payments
against the processor. Authenticated endpoints expect a bearer token:

```
Authorization: Bearer <your-jwt-token>
```
"#
    ),
    tags(
        (name = "Cart", description = "Cart validation and shipping quotes"),
        (name = "Orders", description = "Order creation and lifecycle"),
        (name = "Payments", description = "Payment initialization and verification")
    ),
    paths(
        crate::handlers::carts::validate_cart,
        crate::handlers::carts::calculate_shipping,
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_my_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::cancel_order,
        crate::handlers::orders::update_order_status,
        crate::handlers::payments::initialize_payment,
        crate::handlers::payments::verify_payment,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::handlers::carts::CalculateShippingRequest,
            crate::handlers::orders::UpdateOrderStatusRequest,
            crate::services::carts::CartItemRequest,
            crate::services::carts::ValidatedCartItem,
            crate::services::carts::CartValidationResponse,
            crate::services::shipping::ShippingQuote,
            crate::services::orders::CreateOrderRequest,
            crate::services::orders::OrderItem,
            crate::services::orders::OrderResponse,
            crate::services::payments::InitializePaymentRequest,
            crate::services::payments::InitializePaymentResponse,
            crate::services::payments::VerifyPaymentRequest,
            crate::services::gateway::GatewayAuthorization,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
