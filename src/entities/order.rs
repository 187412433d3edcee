use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order entity.
///
/// `items` and `shipping_address` are point-in-time JSON snapshots taken at
/// creation; item prices are never re-derived from the catalog afterwards.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning user; immutable after creation.
    pub user_id: Uuid,

    /// Array of `{name, size, quantity, price}` snapshots.
    pub items: Json,

    pub total: Decimal,
    pub amount_paid: Decimal,
    pub balance_remaining: Decimal,

    pub payment_method: String,
    pub payment_reference: Option<String>,
    pub paystack_reference: Option<String>,

    pub status: String,
    pub payment_status: String,

    pub shipping_address: Option<Json>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
