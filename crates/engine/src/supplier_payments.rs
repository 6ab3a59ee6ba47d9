//! Supplier-side payments. Same settlement arithmetic as sale payments,
//! against the invoice total.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Cents, EngineError, PaymentMethod, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierPayment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Cents,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub paid_at: DateTime<Utc>,
}

impl SupplierPayment {
    pub fn new(
        invoice_id: Uuid,
        amount: Cents,
        method: PaymentMethod,
        reference: Option<String>,
        notes: Option<String>,
        paid_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "payment amount must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            invoice_id,
            amount,
            method,
            reference,
            notes,
            paid_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "supplier_payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub invoice_id: String,
    pub amount_cents: i64,
    pub method: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub paid_at: DateTimeUtc,
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

impl From<&SupplierPayment> for ActiveModel {
    fn from(value: &SupplierPayment) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            invoice_id: ActiveValue::Set(value.invoice_id.to_string()),
            amount_cents: ActiveValue::Set(value.amount.cents()),
            method: ActiveValue::Set(value.method.as_str().to_string()),
            reference: ActiveValue::Set(value.reference.clone()),
            notes: ActiveValue::Set(value.notes.clone()),
            paid_at: ActiveValue::Set(value.paid_at),
        }
    }
}

impl TryFrom<Model> for SupplierPayment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("supplier payment not exists".to_string()))?,
            invoice_id: Uuid::parse_str(&model.invoice_id)
                .map_err(|_| EngineError::NotFound("invoice not exists".to_string()))?,
            amount: Cents::new(model.amount_cents),
            method: PaymentMethod::try_from(model.method.as_str())?,
            reference: model.reference,
            notes: model.notes,
            paid_at: model.paid_at,
        })
    }
}
