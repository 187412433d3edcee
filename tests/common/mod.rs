use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use storefront_api::{
    auth,
    config::AppConfig,
    db,
    entities::product,
    errors::ServiceError,
    events::{self, EventSender},
    handlers::AppServices,
    services::gateway::{
        GatewayAuthorization, GatewayVerification, InitializeTransaction, PaymentGateway,
    },
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// What the scripted gateway should report for the next calls.
#[derive(Clone, Copy, Debug)]
#[allow(dead_code)]
pub enum GatewayScript {
    /// Initialization and verification both succeed.
    Success,
    /// The processor answers but reports the charge as failed.
    Declined,
    /// The processor cannot be reached at all.
    Unreachable,
}

/// Gateway stand-in for tests. Behavior can be switched mid-test to drive
/// the reconciler through the different processor outcomes.
pub struct ScriptedGateway {
    script: Mutex<GatewayScript>,
}

impl ScriptedGateway {
    pub fn new(script: GatewayScript) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
        })
    }

    #[allow(dead_code)]
    pub fn set(&self, script: GatewayScript) {
        *self.script.lock().unwrap() = script;
    }

    fn current(&self) -> GatewayScript {
        *self.script.lock().unwrap()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn initialize_transaction(
        &self,
        request: InitializeTransaction,
    ) -> Result<GatewayAuthorization, ServiceError> {
        match self.current() {
            GatewayScript::Unreachable => Err(ServiceError::ExternalServiceError(
                "Payment processor unreachable".to_string(),
            )),
            _ => Ok(GatewayAuthorization {
                authorization_url: format!("https://checkout.test/{}", request.reference),
                reference: request.reference,
            }),
        }
    }

    async fn verify_transaction(
        &self,
        _reference: &str,
    ) -> Result<GatewayVerification, ServiceError> {
        match self.current() {
            GatewayScript::Success => Ok(GatewayVerification {
                success: true,
                status: "success".to_string(),
                amount_minor: 10_000,
            }),
            GatewayScript::Declined => Ok(GatewayVerification {
                success: false,
                status: "failed".to_string(),
                amount_minor: 0,
            }),
            GatewayScript::Unreachable => Err(ServiceError::ExternalServiceError(
                "Payment processor unreachable".to_string(),
            )),
        }
    }
}

/// Application harness backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub gateway: Arc<ScriptedGateway>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:",
            "test_secret_key_for_testing_purposes_only",
            "127.0.0.1",
            0,
            "test",
        );
        // A single pooled connection keeps the in-memory database alive for
        // the lifetime of the harness.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let gateway = ScriptedGateway::new(GatewayScript::Success);
        let services = AppServices::new(
            db.clone(),
            event_sender.clone(),
            gateway.clone(),
            "NGN".to_string(),
            None,
        );

        let state = AppState {
            db,
            config: cfg,
            event_sender,
            services,
        };

        Self {
            router: storefront_api::app(state.clone()),
            state,
            gateway,
            _event_task: event_task,
        }
    }

    /// Mints a bearer token for the given user.
    pub fn token_for(&self, user_id: Uuid, roles: &[&str]) -> String {
        auth::issue_token(&self.state.config, user_id, roles).expect("issue test token")
    }

    /// Inserts a catalog product and returns its id.
    #[allow(dead_code)]
    pub async fn seed_product(&self, name: &str, price: Decimal, stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        let model = product::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            category: Set(None),
            description: Set(None),
            price: Set(price),
            stock: Set(stock),
            image_url: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        model
            .insert(&*self.state.db)
            .await
            .expect("failed to seed product");
        id
    }

    /// Sends a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

/// Parses a JSON field produced from a `Decimal` (serialized as a string)
/// or a plain JSON number.
#[allow(dead_code)]
pub fn as_decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("not a decimal value: {:?}", other),
    }
}

/// Reads a response body as JSON.
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body is not valid json")
}
