//! Payment reconciliation.
//!
//! Orchestrates the gateway: initialization hands the client a redirect URL
//! without touching the order, verification asks the processor what actually
//! happened and drives the order's payment state from that answer alone.
//! Client-submitted success claims are never consulted.

use crate::{
    db::DbPool,
    entities::order,
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        gateway::{GatewayAuthorization, InitializeTransaction, PaymentGateway},
        order_status::{OrderStatus, PaymentStatus},
        orders::{find_owned_order, OrderResponse},
    },
};
use chrono::Utc;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitializePaymentRequest {
    pub order_id: Option<Uuid>,
    pub amount: Option<Decimal>,
    #[validate(email)]
    pub email: Option<String>,
    pub callback_url: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub order_id: Option<Uuid>,
    pub reference: Option<String>,
}

/// Initialization response; passed through from the processor.
#[derive(Debug, Serialize, ToSchema)]
pub struct InitializePaymentResponse {
    pub authorization_url: String,
    pub reference: String,
}

/// Converts a major-unit amount to the processor's integer minor units.
fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    (amount * dec!(100)).round().to_i64().ok_or_else(|| {
        ServiceError::ValidationError("Amount out of range".to_string())
    })
}

#[derive(Clone)]
pub struct PaymentReconciler {
    db: Arc<DbPool>,
    gateway: Arc<dyn PaymentGateway>,
    event_sender: Arc<EventSender>,
    currency: String,
    default_callback_url: Option<String>,
}

impl PaymentReconciler {
    pub fn new(
        db: Arc<DbPool>,
        gateway: Arc<dyn PaymentGateway>,
        event_sender: Arc<EventSender>,
        currency: String,
        default_callback_url: Option<String>,
    ) -> Self {
        Self {
            db,
            gateway,
            event_sender,
            currency,
            default_callback_url,
        }
    }

    async fn publish(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            warn!(error = %e, "failed to publish event");
        }
    }

    /// Starts a gateway transaction for one of the caller's orders.
    ///
    /// Deliberately leaves the order untouched: nothing has been paid yet,
    /// and the order only changes once verification confirms the charge.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn initialize_payment(
        &self,
        user_id: Uuid,
        request: InitializePaymentRequest,
    ) -> Result<InitializePaymentResponse, ServiceError> {
        request.validate()?;
        let (Some(order_id), Some(amount), Some(email)) =
            (request.order_id, request.amount, request.email.as_deref())
        else {
            return Err(ServiceError::ValidationError(
                "Missing required fields".to_string(),
            ));
        };
        // A non-positive amount is no charge at all, so it counts as absent.
        if amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Missing required fields".to_string(),
            ));
        }

        // Ownership check only; the order row is not mutated here.
        find_owned_order(&self.db, order_id, user_id).await?;

        let reference = format!("order_{}_{}", order_id, Utc::now().timestamp_millis());
        let authorization: GatewayAuthorization = self
            .gateway
            .initialize_transaction(InitializeTransaction {
                amount_minor: to_minor_units(amount)?,
                email: email.to_string(),
                currency: self.currency.clone(),
                reference: reference.clone(),
                metadata: serde_json::json!({ "orderId": order_id }),
                callback_url: request
                    .callback_url
                    .clone()
                    .or_else(|| self.default_callback_url.clone()),
            })
            .await?;

        info!(order_id = %order_id, reference = %authorization.reference, "payment initialized");
        self.publish(Event::PaymentInitialized {
            order_id,
            reference: authorization.reference.clone(),
        })
        .await;

        Ok(InitializePaymentResponse {
            authorization_url: authorization.authorization_url,
            reference: authorization.reference,
        })
    }

    /// Verifies a gateway transaction and settles the order accordingly.
    ///
    /// The processor's answer is the only input: success marks the order
    /// fully paid and moves it to `processing`; failure records the failed
    /// payment and leaves the fulfillment status alone. Re-verifying a
    /// settled transaction recomputes the same values, so the operation is
    /// idempotent by overwrite.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn verify_payment(
        &self,
        user_id: Uuid,
        request: VerifyPaymentRequest,
    ) -> Result<OrderResponse, ServiceError> {
        let (Some(order_id), Some(reference)) = (request.order_id, request.reference.as_deref())
        else {
            return Err(ServiceError::ValidationError(
                "Missing required fields: orderId and reference".to_string(),
            ));
        };

        let order = find_owned_order(&self.db, order_id, user_id).await?;

        // A gateway failure from this call propagates before any mutation;
        // the order's payment state stays exactly as it was.
        let verification = self.gateway.verify_transaction(reference).await?;

        if verification.success {
            let total = order.total;
            let mut active: order::ActiveModel = order.into();
            active.payment_status = Set(PaymentStatus::Completed.to_string());
            active.status = Set(OrderStatus::Processing.to_string());
            active.paystack_reference = Set(Some(reference.to_string()));
            active.amount_paid = Set(total);
            active.balance_remaining = Set(Decimal::ZERO);
            active.updated_at = Set(Some(Utc::now()));
            let updated = active
                .update(&*self.db)
                .await
                .map_err(ServiceError::DatabaseError)?;

            info!(order_id = %order_id, reference = %reference, "payment completed");
            self.publish(Event::PaymentCompleted(order_id)).await;

            Ok(updated.into())
        } else {
            let mut active: order::ActiveModel = order.into();
            active.payment_status = Set(PaymentStatus::Failed.to_string());
            active.updated_at = Set(Some(Utc::now()));
            active
                .update(&*self.db)
                .await
                .map_err(ServiceError::DatabaseError)?;

            info!(
                order_id = %order_id,
                reference = %reference,
                gateway_status = %verification.status,
                "payment verification failed"
            );
            self.publish(Event::PaymentFailed(order_id)).await;

            Err(ServiceError::PaymentFailed(
                "Payment verification failed".to_string(),
            ))
        }
    }
}
