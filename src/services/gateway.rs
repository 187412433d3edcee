//! Payment processor integration.
//!
//! The reconciler talks to the processor through the `PaymentGateway` trait
//! so tests can substitute a scripted gateway. `PaystackClient` is the
//! production implementation and speaks Paystack's transaction API.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, instrument};
use utoipa::ToSchema;

use crate::errors::ServiceError;

/// A transaction initialization request, already converted to the
/// processor's conventions (amounts in minor units).
#[derive(Debug, Clone, Serialize)]
pub struct InitializeTransaction {
    pub amount_minor: i64,
    pub email: String,
    pub currency: String,
    pub reference: String,
    pub metadata: serde_json::Value,
    pub callback_url: Option<String>,
}

/// Redirect details returned by a successful initialization. Field names
/// match the processor's payload and are passed through to clients as-is.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GatewayAuthorization {
    pub authorization_url: String,
    pub reference: String,
}

/// Outcome of a transaction verification.
#[derive(Debug, Clone)]
pub struct GatewayVerification {
    /// True only when the processor settled the charge.
    pub success: bool,
    /// Processor-reported transaction state, e.g. "success" or "abandoned".
    pub status: String,
    pub amount_minor: i64,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize_transaction(
        &self,
        request: InitializeTransaction,
    ) -> Result<GatewayAuthorization, ServiceError>;

    async fn verify_transaction(&self, reference: &str)
        -> Result<GatewayVerification, ServiceError>;
}

/// Every Paystack response wraps its payload in this envelope. `status`
/// here is the API-call outcome, not the transaction outcome.
#[derive(Debug, Deserialize)]
struct PaystackEnvelope<T> {
    status: bool,
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct PaystackAuthorizationData {
    authorization_url: String,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct PaystackVerificationData {
    status: String,
    amount: i64,
}

#[derive(Debug, Serialize)]
struct PaystackInitializeBody<'a> {
    amount: i64,
    email: &'a str,
    currency: &'a str,
    reference: &'a str,
    metadata: &'a serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_url: Option<&'a str>,
}

#[derive(Clone)]
pub struct PaystackClient {
    http: reqwest::Client,
    secret_key: Option<String>,
    base_url: String,
}

impl PaystackClient {
    pub fn new(
        secret_key: Option<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client: {}", e)))?;

        Ok(Self {
            http,
            secret_key,
            base_url: base_url.into(),
        })
    }

    fn secret(&self) -> Result<&str, ServiceError> {
        self.secret_key.as_deref().ok_or_else(|| {
            ServiceError::InternalError("Paystack secret key is not configured".to_string())
        })
    }

    /// Unwraps an envelope, turning API-level failures into gateway errors
    /// that carry the processor's message through to the caller.
    fn unwrap_envelope<T>(
        status: StatusCode,
        envelope: PaystackEnvelope<T>,
    ) -> Result<T, ServiceError> {
        if !status.is_success() || !envelope.status {
            error!(http_status = %status, message = %envelope.message, "processor rejected request");
            return Err(ServiceError::ExternalServiceError(envelope.message));
        }
        envelope.data.ok_or_else(|| {
            ServiceError::ExternalServiceError("Processor returned no data".to_string())
        })
    }
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    #[instrument(skip(self, request), fields(reference = %request.reference))]
    async fn initialize_transaction(
        &self,
        request: InitializeTransaction,
    ) -> Result<GatewayAuthorization, ServiceError> {
        let secret = self.secret()?;
        let body = PaystackInitializeBody {
            amount: request.amount_minor,
            email: &request.email,
            currency: &request.currency,
            reference: &request.reference,
            metadata: &request.metadata,
            callback_url: request.callback_url.as_deref(),
        };

        let response = self
            .http
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(secret)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "processor unreachable");
                ServiceError::ExternalServiceError("Payment processor unreachable".to_string())
            })?;

        let status = response.status();
        let envelope: PaystackEnvelope<PaystackAuthorizationData> =
            response.json().await.map_err(|e| {
                error!(error = %e, "malformed processor response");
                ServiceError::ExternalServiceError("Malformed processor response".to_string())
            })?;

        let data = Self::unwrap_envelope(status, envelope)?;
        Ok(GatewayAuthorization {
            authorization_url: data.authorization_url,
            reference: data.reference,
        })
    }

    #[instrument(skip(self))]
    async fn verify_transaction(
        &self,
        reference: &str,
    ) -> Result<GatewayVerification, ServiceError> {
        let secret = self.secret()?;

        let response = self
            .http
            .get(format!("{}/transaction/verify/{}", self.base_url, reference))
            .bearer_auth(secret)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "processor unreachable");
                ServiceError::ExternalServiceError("Payment processor unreachable".to_string())
            })?;

        let status = response.status();
        let envelope: PaystackEnvelope<PaystackVerificationData> =
            response.json().await.map_err(|e| {
                error!(error = %e, "malformed processor response");
                ServiceError::ExternalServiceError("Malformed processor response".to_string())
            })?;

        let data = Self::unwrap_envelope(status, envelope)?;
        Ok(GatewayVerification {
            success: data.status == "success",
            status: data.status,
            amount_minor: data.amount,
        })
    }
}
