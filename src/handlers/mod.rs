pub mod carts;
pub mod orders;
pub mod payments;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    carts::CartService, gateway::PaymentGateway, orders::OrderService,
    payments::PaymentReconciler,
};
use std::sync::Arc;

pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub carts: Arc<CartService>,
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentReconciler>,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        gateway: Arc<dyn PaymentGateway>,
        currency: String,
        callback_url: Option<String>,
    ) -> Self {
        Self {
            carts: Arc::new(CartService::new(db.clone())),
            orders: Arc::new(OrderService::new(db.clone(), event_sender.clone())),
            payments: Arc::new(PaymentReconciler::new(
                db,
                gateway,
                event_sender,
                currency,
                callback_url,
            )),
        }
    }
}
