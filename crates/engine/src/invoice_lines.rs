//! Invoice line items.
//!
//! Lines flagged as a raw-material kind trigger inbound stock movements with
//! provenance when the invoice is recorded.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Cents, EngineError, Quantity, StockLedgerKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    Roll,
    Supply,
    /// Services, freight, anything that does not enter a stock ledger.
    Other,
}

impl MaterialKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Roll => "roll",
            Self::Supply => "supply",
            Self::Other => "other",
        }
    }

    /// The stock ledger this material feeds, if any.
    pub fn ledger(self) -> Option<StockLedgerKind> {
        match self {
            Self::Roll => Some(StockLedgerKind::Roll),
            Self::Supply => Some(StockLedgerKind::Supply),
            Self::Other => None,
        }
    }
}

impl TryFrom<&str> for MaterialKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "roll" => Ok(Self::Roll),
            "supply" => Ok(Self::Supply),
            "other" => Ok(Self::Other),
            other => Err(EngineError::InvalidKind(format!(
                "invalid material kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub description: String,
    pub material: MaterialKind,
    /// Ledger key for roll/supply lines; falls back to the description.
    pub material_key: Option<String>,
    pub quantity: Quantity,
    pub unit_price: Cents,
    pub total: Cents,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "invoice_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub invoice_id: String,
    pub description: String,
    pub material: String,
    pub material_key: Option<String>,
    pub quantity_tenths: i64,
    pub unit_price_cents: i64,
    pub total_cents: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::invoices::Entity",
        from = "Column::InvoiceId",
        to = "super::invoices::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Invoices,
}

impl Related<super::invoices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&InvoiceLine> for ActiveModel {
    fn from(value: &InvoiceLine) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            invoice_id: ActiveValue::Set(value.invoice_id.to_string()),
            description: ActiveValue::Set(value.description.clone()),
            material: ActiveValue::Set(value.material.as_str().to_string()),
            material_key: ActiveValue::Set(value.material_key.clone()),
            quantity_tenths: ActiveValue::Set(value.quantity.tenths()),
            unit_price_cents: ActiveValue::Set(value.unit_price.cents()),
            total_cents: ActiveValue::Set(value.total.cents()),
        }
    }
}

impl TryFrom<Model> for InvoiceLine {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("invoice line not exists".to_string()))?,
            invoice_id: Uuid::parse_str(&model.invoice_id)
                .map_err(|_| EngineError::NotFound("invoice not exists".to_string()))?,
            description: model.description,
            material: MaterialKind::try_from(model.material.as_str())?,
            material_key: model.material_key,
            quantity: Quantity::from_tenths(model.quantity_tenths),
            unit_price: Cents::new(model.unit_price_cents),
            total: Cents::new(model.total_cents),
        })
    }
}
