//! Client registry.
//!
//! A client carries a prepaid credit balance that can be applied against open
//! sales. The balance is only ever increased by an explicit grant and only
//! ever decreased by a credit-balance payment.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Cents, EngineError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub company: Option<String>,
    /// Tax id, normalized to digits only. Unique across clients.
    pub cuit: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub credit_balance: Cents,
    pub created_at: DateTime<Utc>,
}

impl Client {
    pub fn new(
        name: String,
        company: Option<String>,
        cuit: String,
        address: Option<String>,
        phone: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            company,
            cuit,
            address,
            phone,
            credit_balance: Cents::ZERO,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "clients")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub company: Option<String>,
    pub cuit: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub credit_balance_cents: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sales::Entity")]
    Sales,
}

impl Related<super::sales::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sales.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Client> for ActiveModel {
    fn from(value: &Client) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            company: ActiveValue::Set(value.company.clone()),
            cuit: ActiveValue::Set(value.cuit.clone()),
            address: ActiveValue::Set(value.address.clone()),
            phone: ActiveValue::Set(value.phone.clone()),
            credit_balance_cents: ActiveValue::Set(value.credit_balance.cents()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Client {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("client not exists".to_string()))?,
            name: model.name,
            company: model.company,
            cuit: model.cuit,
            address: model.address,
            phone: model.phone,
            credit_balance: Cents::new(model.credit_balance_cents),
            created_at: model.created_at,
        })
    }
}
