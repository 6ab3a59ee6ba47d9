//! Stock balances: current quantity per ledger key.
//!
//! Three structurally identical ledgers exist — finished product, raw-material
//! rolls, purchased supplies. A balance row is created on first movement and
//! mutated only through movement application; it can never go negative.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Quantity};

/// Which of the three stock ledgers a key belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLedgerKind {
    /// Finished product, keyed by [`Presentation`].
    Product,
    /// Raw-material rolls, free-form keys.
    Roll,
    /// Purchased supplies, free-form keys.
    Supply,
}

impl StockLedgerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Roll => "roll",
            Self::Supply => "supply",
        }
    }
}

impl TryFrom<&str> for StockLedgerKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "product" => Ok(Self::Product),
            "roll" => Ok(Self::Roll),
            "supply" => Ok(Self::Supply),
            other => Err(EngineError::InvalidKind(format!(
                "invalid stock ledger: {other}"
            ))),
        }
    }
}

/// The closed key set of the product ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presentation {
    /// Bulk, sold by weight.
    Granel,
    HalfKilo,
    Kilo,
}

impl Presentation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Granel => "granel",
            Self::HalfKilo => "500g",
            Self::Kilo => "1kg",
        }
    }
}

impl TryFrom<&str> for Presentation {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "granel" => Ok(Self::Granel),
            "500g" => Ok(Self::HalfKilo),
            "1kg" => Ok(Self::Kilo),
            other => Err(EngineError::InvalidKind(format!(
                "invalid presentation: {other}"
            ))),
        }
    }
}

/// Current quantity for one ledger key, plus provenance of the last inbound
/// supply when known.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBalance {
    pub ledger: StockLedgerKind,
    pub key: String,
    pub quantity: Quantity,
    pub last_supplier_id: Option<Uuid>,
    pub last_invoice_number: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "stock_balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub ledger: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    pub quantity_tenths: i64,
    pub last_supplier_id: Option<String>,
    pub last_invoice_number: Option<String>,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&StockBalance> for ActiveModel {
    fn from(value: &StockBalance) -> Self {
        Self {
            ledger: ActiveValue::Set(value.ledger.as_str().to_string()),
            key: ActiveValue::Set(value.key.clone()),
            quantity_tenths: ActiveValue::Set(value.quantity.tenths()),
            last_supplier_id: ActiveValue::Set(value.last_supplier_id.map(|id| id.to_string())),
            last_invoice_number: ActiveValue::Set(value.last_invoice_number.clone()),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for StockBalance {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            ledger: StockLedgerKind::try_from(model.ledger.as_str())?,
            key: model.key,
            quantity: Quantity::from_tenths(model.quantity_tenths),
            last_supplier_id: model
                .last_supplier_id
                .and_then(|s| Uuid::parse_str(&s).ok()),
            last_invoice_number: model.last_invoice_number,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn presentation_round_trips() {
        for p in [Presentation::Granel, Presentation::HalfKilo, Presentation::Kilo] {
            assert_eq!(Presentation::try_from(p.as_str()).unwrap(), p);
        }
        assert!(matches!(
            Presentation::try_from("2kg"),
            Err(EngineError::InvalidKind(_))
        ));
    }

    #[test]
    fn ledger_kind_round_trips() {
        for l in [
            StockLedgerKind::Product,
            StockLedgerKind::Roll,
            StockLedgerKind::Supply,
        ] {
            assert_eq!(StockLedgerKind::try_from(l.as_str()).unwrap(), l);
        }
        assert!(matches!(
            StockLedgerKind::try_from("warehouse"),
            Err(EngineError::InvalidKind(_))
        ));
    }

    #[test]
    fn balance_from_model_rejects_unknown_ledger() {
        let model = Model {
            ledger: "warehouse".to_string(),
            key: "granel".to_string(),
            quantity_tenths: 0,
            last_supplier_id: None,
            last_invoice_number: None,
            updated_at: Utc.timestamp_opt(0, 0).unwrap(),
        };
        assert!(StockBalance::try_from(model).is_err());
    }
}
