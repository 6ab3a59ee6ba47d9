//! Sales and settlement status.
//!
//! A sale is created atomically with one outbound movement on the product
//! ledger. Its `status` is a cached derived field: it is recomputed from the
//! full payment log on every payment write and never trusted as input.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Cents, EngineError, Presentation, Quantity};

/// Derived paid/owed state of a sale or invoice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Pending,
    Partial,
    Paid,
}

impl SettlementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Paid => "paid",
        }
    }

    /// Recomputes the status from the authoritative totals.
    ///
    /// Amounts are integer cents, so "paid in full" is a plain `>=` — there is
    /// no sub-cent residue to tolerate.
    pub fn derive(total: Cents, paid: Cents) -> Self {
        if paid >= total {
            Self::Paid
        } else if paid.is_positive() {
            Self::Partial
        } else {
            Self::Pending
        }
    }
}

impl TryFrom<&str> for SettlementStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "partial" => Ok(Self::Partial),
            "paid" => Ok(Self::Paid),
            other => Err(EngineError::InvalidStatus(format!(
                "invalid settlement status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub client_id: Uuid,
    pub presentation: Presentation,
    pub quantity: Quantity,
    pub unit_price: Cents,
    /// `quantity x unit_price`, computed once at creation. No hidden tax.
    pub total: Cents,
    /// Production lot label. Unique when present.
    pub lot: Option<String>,
    pub notes: Option<String>,
    pub status: SettlementStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub client_id: String,
    pub presentation: String,
    pub quantity_tenths: i64,
    pub unit_price_cents: i64,
    pub total_cents: i64,
    pub lot: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::clients::Entity",
        from = "Column::ClientId",
        to = "super::clients::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Clients,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::clients::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Clients.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Sale> for ActiveModel {
    fn from(value: &Sale) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            client_id: ActiveValue::Set(value.client_id.to_string()),
            presentation: ActiveValue::Set(value.presentation.as_str().to_string()),
            quantity_tenths: ActiveValue::Set(value.quantity.tenths()),
            unit_price_cents: ActiveValue::Set(value.unit_price.cents()),
            total_cents: ActiveValue::Set(value.total.cents()),
            lot: ActiveValue::Set(value.lot.clone()),
            notes: ActiveValue::Set(value.notes.clone()),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Sale {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("sale not exists".to_string()))?,
            client_id: Uuid::parse_str(&model.client_id)
                .map_err(|_| EngineError::NotFound("client not exists".to_string()))?,
            presentation: Presentation::try_from(model.presentation.as_str())?,
            quantity: Quantity::from_tenths(model.quantity_tenths),
            unit_price: Cents::new(model.unit_price_cents),
            total: Cents::new(model.total_cents),
            lot: model.lot,
            notes: model.notes,
            status: SettlementStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
        })
    }
}
