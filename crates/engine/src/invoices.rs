//! Supplier invoices.
//!
//! Invariant: `tax == round2(subtotal x 0.21)` and `total == subtotal + tax`.
//! Any stored invoice violating this by more than one currency unit is
//! considered corrupt and correctable by the repair pass
//! ([`Engine::repair_invoice_tax`]).
//!
//! [`Engine::repair_invoice_tax`]: crate::Engine::repair_invoice_tax

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Cents, EngineError, SettlementStatus};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub number: String,
    pub issued_on: NaiveDate,
    pub subtotal: Cents,
    pub tax: Cents,
    pub total: Cents,
    pub status: SettlementStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// Builds an invoice with tax and total derived from the subtotal.
    pub fn new(
        supplier_id: Uuid,
        number: String,
        issued_on: NaiveDate,
        subtotal: Cents,
        notes: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let tax = subtotal.tax_21();
        Self {
            id: Uuid::new_v4(),
            supplier_id,
            number,
            issued_on,
            subtotal,
            tax,
            total: subtotal + tax,
            status: SettlementStatus::Pending,
            notes,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub supplier_id: String,
    pub number: String,
    pub issued_on: Date,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::suppliers::Entity",
        from = "Column::SupplierId",
        to = "super::suppliers::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Suppliers,
    #[sea_orm(has_many = "super::invoice_lines::Entity")]
    Lines,
    #[sea_orm(has_many = "super::supplier_payments::Entity")]
    Payments,
}

impl Related<super::suppliers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Suppliers.def()
    }
}

impl Related<super::invoice_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl Related<super::supplier_payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Invoice> for ActiveModel {
    fn from(value: &Invoice) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            supplier_id: ActiveValue::Set(value.supplier_id.to_string()),
            number: ActiveValue::Set(value.number.clone()),
            issued_on: ActiveValue::Set(value.issued_on),
            subtotal_cents: ActiveValue::Set(value.subtotal.cents()),
            tax_cents: ActiveValue::Set(value.tax.cents()),
            total_cents: ActiveValue::Set(value.total.cents()),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            notes: ActiveValue::Set(value.notes.clone()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Invoice {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("invoice not exists".to_string()))?,
            supplier_id: Uuid::parse_str(&model.supplier_id)
                .map_err(|_| EngineError::NotFound("supplier not exists".to_string()))?,
            number: model.number,
            issued_on: model.issued_on,
            subtotal: Cents::new(model.subtotal_cents),
            tax: Cents::new(model.tax_cents),
            total: Cents::new(model.total_cents),
            status: SettlementStatus::try_from(model.status.as_str())?,
            notes: model.notes,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn new_invoice_derives_tax_and_total() {
        let invoice = Invoice::new(
            Uuid::new_v4(),
            "A-0001".to_string(),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            Cents::new(1_100_000),
            None,
            Utc.timestamp_opt(0, 0).unwrap(),
        );
        assert_eq!(invoice.tax, Cents::new(231_000));
        assert_eq!(invoice.total, Cents::new(1_331_000));
        assert_eq!(invoice.status, SettlementStatus::Pending);
    }
}
