//! Sale-side payments: append-only facts, never updated or deleted.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Cents, EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Check,
    Card,
    /// Drawn from the client's prepaid credit balance.
    CreditBalance,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Transfer => "transfer",
            Self::Check => "check",
            Self::Card => "card",
            Self::CreditBalance => "credit_balance",
        }
    }
}

impl TryFrom<&str> for PaymentMethod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "cash" => Ok(Self::Cash),
            "transfer" => Ok(Self::Transfer),
            "check" => Ok(Self::Check),
            "card" => Ok(Self::Card),
            "credit_balance" => Ok(Self::CreditBalance),
            other => Err(EngineError::InvalidStatus(format!(
                "invalid payment method: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub amount: Cents,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    /// Back-reference to the check that settled this payment, if any.
    pub check_id: Option<Uuid>,
    pub paid_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        sale_id: Uuid,
        amount: Cents,
        method: PaymentMethod,
        reference: Option<String>,
        check_id: Option<Uuid>,
        paid_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "payment amount must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            sale_id,
            amount,
            method,
            reference,
            check_id,
            paid_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub sale_id: String,
    pub amount_cents: i64,
    pub method: String,
    pub reference: Option<String>,
    pub check_id: Option<String>,
    pub paid_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sales::Entity",
        from = "Column::SaleId",
        to = "super::sales::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Sales,
}

impl Related<super::sales::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sales.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Payment> for ActiveModel {
    fn from(value: &Payment) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            sale_id: ActiveValue::Set(value.sale_id.to_string()),
            amount_cents: ActiveValue::Set(value.amount.cents()),
            method: ActiveValue::Set(value.method.as_str().to_string()),
            reference: ActiveValue::Set(value.reference.clone()),
            check_id: ActiveValue::Set(value.check_id.map(|id| id.to_string())),
            paid_at: ActiveValue::Set(value.paid_at),
        }
    }
}

impl TryFrom<Model> for Payment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("payment not exists".to_string()))?,
            sale_id: Uuid::parse_str(&model.sale_id)
                .map_err(|_| EngineError::NotFound("sale not exists".to_string()))?,
            amount: Cents::new(model.amount_cents),
            method: PaymentMethod::try_from(model.method.as_str())?,
            reference: model.reference,
            check_id: model.check_id.and_then(|s| Uuid::parse_str(&s).ok()),
            paid_at: model.paid_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn rejects_non_positive_amount() {
        let result = Payment::new(
            Uuid::new_v4(),
            Cents::ZERO,
            PaymentMethod::Cash,
            None,
            None,
            Utc.timestamp_opt(0, 0).unwrap(),
        );
        assert!(matches!(result, Err(EngineError::InvalidAmount(_))));
    }

    #[test]
    fn method_round_trips() {
        for m in [
            PaymentMethod::Cash,
            PaymentMethod::Transfer,
            PaymentMethod::Check,
            PaymentMethod::Card,
            PaymentMethod::CreditBalance,
        ] {
            assert_eq!(PaymentMethod::try_from(m.as_str()).unwrap(), m);
        }
        assert!(PaymentMethod::try_from("barter").is_err());
    }
}
