//! Negotiable-instrument (check) lifecycle.
//!
//! States: `pending -> {collected, rejected, expired, delivered}`. Expiry is a
//! passive transition applied at read time: a pending check past its due date
//! is forced to `expired` before any other logic runs. A delivered check may
//! later be marked collected or rejected by the receiving party.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Cents, EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pending,
    Collected,
    Rejected,
    Expired,
    Delivered,
}

impl CheckStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Collected => "collected",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Delivered => "delivered",
        }
    }
}

impl TryFrom<&str> for CheckStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "collected" => Ok(Self::Collected),
            "rejected" => Ok(Self::Rejected),
            "expired" => Ok(Self::Expired),
            "delivered" => Ok(Self::Delivered),
            other => Err(EngineError::InvalidStatus(format!(
                "invalid check status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    pub id: Uuid,
    /// Unique across all non-deleted checks.
    pub check_number: String,
    pub amount: Cents,
    pub electronic: bool,
    pub received_on: NaiveDate,
    pub due_on: NaiveDate,
    pub received_from: String,
    pub issued_by: String,
    pub status: CheckStatus,
    /// Notes are appended newline-separated, never overwritten.
    pub notes: Option<String>,
    pub sale_payment_id: Option<Uuid>,
    pub supplier_payment_id: Option<Uuid>,
    pub delivered_to: Option<String>,
    pub delivered_on: Option<NaiveDate>,
    pub delivered_for: Option<String>,
    pub delivered_invoice_id: Option<Uuid>,
}

impl Check {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        check_number: String,
        amount: Cents,
        electronic: bool,
        received_on: NaiveDate,
        due_on: NaiveDate,
        received_from: String,
        issued_by: String,
        notes: Option<String>,
    ) -> ResultEngine<Self> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "check amount must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            check_number,
            amount,
            electronic,
            received_on,
            due_on,
            received_from,
            issued_by,
            status: CheckStatus::Pending,
            notes,
            sale_payment_id: None,
            supplier_payment_id: None,
            delivered_to: None,
            delivered_on: None,
            delivered_for: None,
            delivered_invoice_id: None,
        })
    }
}

/// Appends `extra` to the existing notes, newline-separated.
pub(crate) fn append_note(existing: Option<String>, extra: Option<String>) -> Option<String> {
    match (existing, extra) {
        (current, None) => current,
        (None, Some(extra)) => Some(extra),
        (Some(current), Some(extra)) => Some(format!("{current}\n{extra}")),
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "checks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub check_number: String,
    pub amount_cents: i64,
    pub electronic: bool,
    pub received_on: Date,
    pub due_on: Date,
    pub received_from: String,
    pub issued_by: String,
    pub status: String,
    pub notes: Option<String>,
    pub sale_payment_id: Option<String>,
    pub supplier_payment_id: Option<String>,
    pub delivered_to: Option<String>,
    pub delivered_on: Option<Date>,
    pub delivered_for: Option<String>,
    pub delivered_invoice_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Check> for ActiveModel {
    fn from(value: &Check) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            check_number: ActiveValue::Set(value.check_number.clone()),
            amount_cents: ActiveValue::Set(value.amount.cents()),
            electronic: ActiveValue::Set(value.electronic),
            received_on: ActiveValue::Set(value.received_on),
            due_on: ActiveValue::Set(value.due_on),
            received_from: ActiveValue::Set(value.received_from.clone()),
            issued_by: ActiveValue::Set(value.issued_by.clone()),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            notes: ActiveValue::Set(value.notes.clone()),
            sale_payment_id: ActiveValue::Set(value.sale_payment_id.map(|id| id.to_string())),
            supplier_payment_id: ActiveValue::Set(
                value.supplier_payment_id.map(|id| id.to_string()),
            ),
            delivered_to: ActiveValue::Set(value.delivered_to.clone()),
            delivered_on: ActiveValue::Set(value.delivered_on),
            delivered_for: ActiveValue::Set(value.delivered_for.clone()),
            delivered_invoice_id: ActiveValue::Set(
                value.delivered_invoice_id.map(|id| id.to_string()),
            ),
        }
    }
}

impl TryFrom<Model> for Check {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("check not exists".to_string()))?,
            check_number: model.check_number,
            amount: Cents::new(model.amount_cents),
            electronic: model.electronic,
            received_on: model.received_on,
            due_on: model.due_on,
            received_from: model.received_from,
            issued_by: model.issued_by,
            status: CheckStatus::try_from(model.status.as_str())?,
            notes: model.notes,
            sale_payment_id: model.sale_payment_id.and_then(|s| Uuid::parse_str(&s).ok()),
            supplier_payment_id: model
                .supplier_payment_id
                .and_then(|s| Uuid::parse_str(&s).ok()),
            delivered_to: model.delivered_to,
            delivered_on: model.delivered_on,
            delivered_for: model.delivered_for,
            delivered_invoice_id: model
                .delivered_invoice_id
                .and_then(|s| Uuid::parse_str(&s).ok()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check() -> Check {
        Check::new(
            "00012345".to_string(),
            Cents::new(50_000_00),
            false,
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            "Acme SA".to_string(),
            "Banco Nación".to_string(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn new_check_starts_pending() {
        assert_eq!(check().status, CheckStatus::Pending);
    }

    #[test]
    fn rejects_non_positive_amount() {
        let result = Check::new(
            "1".to_string(),
            Cents::ZERO,
            false,
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            "a".to_string(),
            "b".to_string(),
            None,
        );
        assert!(matches!(result, Err(EngineError::InvalidAmount(_))));
    }

    #[test]
    fn notes_append_newline_separated() {
        assert_eq!(append_note(None, None), None);
        assert_eq!(
            append_note(None, Some("first".to_string())),
            Some("first".to_string())
        );
        assert_eq!(
            append_note(Some("first".to_string()), Some("second".to_string())),
            Some("first\nsecond".to_string())
        );
    }

    #[test]
    fn status_round_trips() {
        for s in [
            CheckStatus::Pending,
            CheckStatus::Collected,
            CheckStatus::Rejected,
            CheckStatus::Expired,
            CheckStatus::Delivered,
        ] {
            assert_eq!(CheckStatus::try_from(s.as_str()).unwrap(), s);
        }
        assert!(CheckStatus::try_from("cashed").is_err());
    }
}
