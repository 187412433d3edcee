//! Order creation, retrieval and lifecycle.
//!
//! Creation accepts loosely typed input and validates field by field so each
//! failure mode reports its own message. Reads and mutations are ownership
//! checked; the administrative status path is gated at the handler and
//! validated against the transition table here.

use crate::{
    db::DbPool,
    entities::{order, product},
    errors::ServiceError,
    events::{Event, EventSender},
    services::order_status::{OrderStatus, PaymentMethod, PaymentStatus},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Order creation payload.
///
/// Numeric fields are declared as raw JSON values on purpose: the contract
/// reports a distinct message per failing field, which a typed DTO would
/// collapse into a single deserialize error.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[schema(value_type = Option<Vec<Object>>)]
    pub items: Option<JsonValue>,
    #[schema(value_type = Option<String>)]
    pub total: Option<JsonValue>,
    #[schema(value_type = Option<String>)]
    pub amount_paid: Option<JsonValue>,
    pub payment_method: Option<String>,
    #[schema(value_type = Option<String>)]
    pub balance_remaining: Option<JsonValue>,
    pub payment_reference: Option<String>,
    pub status: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub shipping_address: Option<JsonValue>,
}

/// An order line, snapshotted into the order at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Catalog linkage; only items carrying it take part in the stock
    /// decrement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    pub quantity: i32,
    pub price: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    pub amount_paid: Decimal,
    pub balance_remaining: Decimal,
    pub payment_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paystack_reference: Option<String>,
    pub status: String,
    pub payment_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub shipping_address: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<order::Model> for OrderResponse {
    fn from(model: order::Model) -> Self {
        // Items were serialized by this crate; a row that fails to
        // deserialize would be externally corrupted, so degrade to empty
        // rather than failing the whole read.
        let items = serde_json::from_value(model.items).unwrap_or_default();

        Self {
            id: model.id,
            user_id: model.user_id,
            items,
            total: model.total,
            amount_paid: model.amount_paid,
            balance_remaining: model.balance_remaining,
            payment_method: model.payment_method,
            payment_reference: model.payment_reference,
            paystack_reference: model.paystack_reference,
            status: model.status,
            payment_status: model.payment_status,
            shipping_address: model.shipping_address,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

fn parse_decimal(value: &JsonValue) -> Option<Decimal> {
    match value {
        JsonValue::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        JsonValue::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn parse_quantity(value: &JsonValue) -> Option<i32> {
    match value {
        JsonValue::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A creation request after field-by-field validation.
#[derive(Debug)]
struct ParsedOrder {
    items: Vec<OrderItem>,
    total: Decimal,
    amount_paid: Decimal,
    balance_remaining: Decimal,
    payment_method: PaymentMethod,
    status: OrderStatus,
}

/// Validates a creation request. Checks run in a fixed order and each
/// failure carries its own message; the first failure aborts.
fn parse_create_request(request: &CreateOrderRequest) -> Result<ParsedOrder, ServiceError> {
    let (items_value, total_value, amount_paid_value, payment_method) = match (
        request.items.as_ref(),
        request.total.as_ref(),
        request.amount_paid.as_ref(),
        request.payment_method.as_deref(),
    ) {
        (Some(i), Some(t), Some(a), Some(p)) => (i, t, a, p),
        _ => {
            return Err(ServiceError::ValidationError(
                "Missing required fields".to_string(),
            ))
        }
    };

    let raw_items = items_value.as_array().ok_or_else(|| {
        ServiceError::ValidationError("Items must be a list".to_string())
    })?;
    if raw_items.is_empty() {
        return Err(ServiceError::ValidationError(
            "Missing required fields".to_string(),
        ));
    }

    let total = parse_decimal(total_value);
    let amount_paid = parse_decimal(amount_paid_value);
    let balance_remaining = match request.balance_remaining.as_ref() {
        Some(value) => parse_decimal(value),
        None => Some(Decimal::ZERO),
    };
    let (Some(total), Some(amount_paid), Some(balance_remaining)) =
        (total, amount_paid, balance_remaining)
    else {
        return Err(ServiceError::ValidationError(
            "Invalid number values".to_string(),
        ));
    };

    let mut items = Vec::with_capacity(raw_items.len());
    for raw in raw_items {
        let quantity = raw.get("quantity").and_then(parse_quantity);
        let price = raw.get("price").and_then(parse_decimal);
        let (Some(quantity), Some(price)) = (quantity, price) else {
            return Err(ServiceError::ValidationError(
                "Invalid item quantity or price".to_string(),
            ));
        };
        // A non-positive quantity would run the stock decrement in reverse.
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Invalid item quantity or price".to_string(),
            ));
        }

        items.push(OrderItem {
            product_id: raw
                .get("productId")
                .and_then(JsonValue::as_str)
                .and_then(|s| Uuid::parse_str(s).ok()),
            name: raw
                .get("name")
                .and_then(JsonValue::as_str)
                .map(str::to_string),
            size: raw
                .get("size")
                .and_then(JsonValue::as_str)
                .map(str::to_string),
            quantity,
            price,
        });
    }

    let payment_method = PaymentMethod::from_str(payment_method).map_err(|_| {
        ServiceError::ValidationError("Invalid payment method".to_string())
    })?;

    let status = match request.status.as_deref() {
        Some(s) => OrderStatus::from_str(s)
            .map_err(|_| ServiceError::InvalidStatus(format!("Unknown order status '{}'", s)))?,
        None => OrderStatus::Confirmed,
    };

    Ok(ParsedOrder {
        items,
        total,
        amount_paid,
        balance_remaining,
        payment_method,
        status,
    })
}

/// Loads an order and checks the caller owns it. A missing order is a 404;
/// an order owned by someone else is a 403, never a 404, so clients can tell
/// the two apart.
pub(crate) async fn find_owned_order(
    db: &DatabaseConnection,
    order_id: Uuid,
    user_id: Uuid,
) -> Result<order::Model, ServiceError> {
    let order = order::Entity::find_by_id(order_id)
        .one(db)
        .await
        .map_err(ServiceError::DatabaseError)?
        .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

    if order.user_id != user_id {
        return Err(ServiceError::Forbidden(
            "You do not have access to this order".to_string(),
        ));
    }

    Ok(order)
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    async fn publish(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            warn!(error = %e, "failed to publish event");
        }
    }

    /// Creates an order for the caller.
    ///
    /// Items that carry a `productId` take part in a conditional stock
    /// decrement inside the creation transaction: the update only applies
    /// while enough stock remains, and zero affected rows aborts the whole
    /// creation. Stock can therefore never go negative, regardless of how
    /// many creations race.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn create_order(
        &self,
        user_id: Uuid,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        let parsed = parse_create_request(&request)?;

        let txn = self.db.begin().await.map_err(ServiceError::DatabaseError)?;

        for item in &parsed.items {
            let Some(product_id) = item.product_id else {
                continue;
            };

            let result = product::Entity::update_many()
                .col_expr(
                    product::Column::Stock,
                    Expr::col(product::Column::Stock).sub(item.quantity),
                )
                .filter(product::Column::Id.eq(product_id))
                .filter(product::Column::Stock.gte(item.quantity))
                .exec(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?;

            if result.rows_affected == 0 {
                txn.rollback().await.map_err(ServiceError::DatabaseError)?;
                return Err(ServiceError::InsufficientStock(format!(
                    "Insufficient stock for product {}",
                    product_id
                )));
            }
        }

        let items_json = serde_json::to_value(&parsed.items)
            .map_err(|e| ServiceError::InternalError(format!("item serialization: {}", e)))?;

        let order_id = Uuid::new_v4();
        let model = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(user_id),
            items: Set(items_json),
            total: Set(parsed.total),
            amount_paid: Set(parsed.amount_paid),
            balance_remaining: Set(parsed.balance_remaining),
            payment_method: Set(parsed.payment_method.to_string()),
            payment_reference: Set(request.payment_reference.clone()),
            paystack_reference: Set(None),
            status: Set(parsed.status.to_string()),
            payment_status: Set(PaymentStatus::Pending.to_string()),
            shipping_address: Set(request.shipping_address.clone()),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };

        let inserted = model.insert(&txn).await.map_err(ServiceError::DatabaseError)?;
        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(order_id = %order_id, "order created");
        self.publish(Event::OrderCreated(order_id)).await;

        Ok(inserted.into())
    }

    /// Fetches one of the caller's orders.
    #[instrument(skip(self), fields(order_id = %order_id, user_id = %user_id))]
    pub async fn get_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderResponse, ServiceError> {
        let order = find_owned_order(&self.db, order_id, user_id).await?;
        Ok(order.into())
    }

    /// Lists the caller's orders, newest first.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_orders(&self, user_id: Uuid) -> Result<Vec<OrderResponse>, ServiceError> {
        let orders = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(orders.into_iter().map(OrderResponse::from).collect())
    }

    /// Cancels one of the caller's orders. Only `pending` orders can be
    /// cancelled; anything further along is refused.
    #[instrument(skip(self), fields(order_id = %order_id, user_id = %user_id))]
    pub async fn cancel_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderResponse, ServiceError> {
        let order = find_owned_order(&self.db, order_id, user_id).await?;

        if order.status != OrderStatus::Pending.to_string() {
            return Err(ServiceError::InvalidOperation(
                "Cannot cancel this order".to_string(),
            ));
        }

        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Cancelled.to_string());
        active.updated_at = Set(Some(Utc::now()));
        let updated = active
            .update(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        info!(order_id = %order_id, "order cancelled");
        self.publish(Event::OrderCancelled(order_id)).await;

        Ok(updated.into())
    }

    /// Administrative status update, validated against the transition table.
    /// Role enforcement happens at the handler; this path has no ownership
    /// check by design.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        new_status: &str,
    ) -> Result<OrderResponse, ServiceError> {
        let target = OrderStatus::from_str(new_status).map_err(|_| {
            ServiceError::InvalidStatus(format!("Unknown order status '{}'", new_status))
        })?;

        let order = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let current = OrderStatus::from_str(&order.status).map_err(|_| {
            ServiceError::InternalError(format!("stored status '{}' is not valid", order.status))
        })?;

        if !current.can_transition_to(target) {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot transition from status '{}' to '{}'",
                current, target
            )));
        }

        let old_status = order.status.clone();
        let mut active: order::ActiveModel = order.into();
        active.status = Set(target.to_string());
        active.updated_at = Set(Some(Utc::now()));
        let updated = active
            .update(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        info!(order_id = %order_id, from = %old_status, to = %target, "order status updated");
        self.publish(Event::OrderStatusChanged {
            order_id,
            old_status,
            new_status: target.to_string(),
        })
        .await;

        Ok(updated.into())
    }
}
