//! Movement primitives.
//!
//! A `Movement` is the immutable record of one quantity change on a ledger
//! key. Balances are derived state: for every key, the sum of inbound
//! movements minus the sum of outbound/consumption movements must equal the
//! stored balance at all times.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Quantity, ResultEngine, StockLedgerKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Inbound,
    Outbound,
    /// Raw material consumed by production.
    Consumption,
}

impl MovementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
            Self::Consumption => "consumption",
        }
    }

    /// Sign this kind applies to a balance: inbound adds, the rest subtract.
    pub fn is_inbound(self) -> bool {
        matches!(self, Self::Inbound)
    }
}

impl TryFrom<&str> for MovementKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "inbound" => Ok(Self::Inbound),
            "outbound" => Ok(Self::Outbound),
            "consumption" => Ok(Self::Consumption),
            other => Err(EngineError::InvalidKind(format!(
                "invalid movement kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: Uuid,
    pub ledger: StockLedgerKind,
    pub key: String,
    pub kind: MovementKind,
    pub quantity: Quantity,
    pub occurred_at: DateTime<Utc>,
    /// Free-text reference tying the movement back to its cause, e.g.
    /// `sale:<id>` or `invoice:<number>`.
    pub reference: String,
    pub counterparty: Option<String>,
}

impl Movement {
    pub fn new(
        ledger: StockLedgerKind,
        key: String,
        kind: MovementKind,
        quantity: Quantity,
        occurred_at: DateTime<Utc>,
        reference: String,
        counterparty: Option<String>,
    ) -> ResultEngine<Self> {
        if !quantity.is_positive() {
            return Err(EngineError::InvalidQuantity(
                "movement quantity must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            ledger,
            key,
            kind,
            quantity,
            occurred_at,
            reference,
            counterparty,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub ledger: String,
    pub key: String,
    pub kind: String,
    pub quantity_tenths: i64,
    pub occurred_at: DateTimeUtc,
    pub reference: String,
    pub counterparty: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Movement> for ActiveModel {
    fn from(value: &Movement) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            ledger: ActiveValue::Set(value.ledger.as_str().to_string()),
            key: ActiveValue::Set(value.key.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            quantity_tenths: ActiveValue::Set(value.quantity.tenths()),
            occurred_at: ActiveValue::Set(value.occurred_at),
            reference: ActiveValue::Set(value.reference.clone()),
            counterparty: ActiveValue::Set(value.counterparty.clone()),
        }
    }
}

impl TryFrom<Model> for Movement {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("movement not exists".to_string()))?,
            ledger: StockLedgerKind::try_from(model.ledger.as_str())?,
            key: model.key,
            kind: MovementKind::try_from(model.kind.as_str())?,
            quantity: Quantity::from_tenths(model.quantity_tenths),
            occurred_at: model.occurred_at,
            reference: model.reference,
            counterparty: model.counterparty,
        })
    }
}
