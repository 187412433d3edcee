use crate::{
    db::DbPool,
    entities::product::Entity as ProductEntity,
    errors::ServiceError,
};
use rust_decimal::Decimal;
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

pub const INSUFFICIENT_STOCK_WARNING: &str = "Insufficient stock available";

/// A cart line as submitted by the client. Transient; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// A cart line after validation against current stock.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedCartItem {
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartValidationResponse {
    pub items: Vec<ValidatedCartItem>,
    pub total_price: Decimal,
    pub item_count: usize,
}

/// Validates carts against live inventory. Read-only: stock is neither
/// reserved nor decremented here, so the result is a preview, not an
/// authority (the conditional decrement happens at order creation).
#[derive(Clone)]
pub struct CartService {
    db: Arc<DbPool>,
}

impl CartService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Prices a cart against current products.
    ///
    /// Unknown products are dropped from the output. Items with
    /// insufficient stock are kept, flagged with a warning, and excluded
    /// from the subtotal. Callers are expected to block checkout on any
    /// warned item.
    #[instrument(skip(self, items), fields(requested = items.len()))]
    pub async fn validate_cart(
        &self,
        items: &[CartItemRequest],
    ) -> Result<CartValidationResponse, ServiceError> {
        let db = &*self.db;
        let mut validated = Vec::with_capacity(items.len());
        let mut total_price = Decimal::ZERO;

        for item in items {
            let product = ProductEntity::find_by_id(item.product_id)
                .one(db)
                .await
                .map_err(ServiceError::DatabaseError)?;

            let Some(product) = product else {
                debug!(product_id = %item.product_id, "unknown product dropped from cart");
                continue;
            };

            if product.stock < item.quantity {
                validated.push(ValidatedCartItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    warning: Some(INSUFFICIENT_STOCK_WARNING.to_string()),
                });
            } else {
                total_price += product.price * Decimal::from(item.quantity);
                validated.push(ValidatedCartItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    warning: None,
                });
            }
        }

        let item_count = validated.len();
        Ok(CartValidationResponse {
            items: validated,
            total_price,
            item_count,
        })
    }
}
