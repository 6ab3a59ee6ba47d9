use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};

use crate::{Cents, Client, EngineError, ResultEngine, Supplier, clients, suppliers};

use super::{Engine, normalize_cuit, normalize_optional_text, normalize_required_text, with_tx};

#[derive(Clone, Debug)]
pub struct NewClient {
    pub name: String,
    pub company: Option<String>,
    pub cuit: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewSupplier {
    pub name: String,
    pub cuit: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl Engine {
    /// Registers a client. The CUIT is normalized to digits and must be
    /// unique; a second registration with the same CUIT fails with
    /// `AlreadyExists`.
    pub async fn new_client(
        &self,
        input: NewClient,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Client> {
        let name = normalize_required_text(&input.name, "client name")?;
        let cuit = normalize_cuit(&input.cuit)?;
        with_tx!(self, |db_tx| {
            let exists = clients::Entity::find()
                .filter(clients::Column::Cuit.eq(cuit.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::AlreadyExists(format!("cuit {cuit}")));
            }

            let client = Client::new(
                name,
                normalize_optional_text(input.company.as_deref()),
                cuit,
                normalize_optional_text(input.address.as_deref()),
                normalize_optional_text(input.phone.as_deref()),
                created_at,
            );
            clients::ActiveModel::from(&client).insert(&db_tx).await?;
            Ok(client)
        })
    }

    /// Registers a supplier, with the same CUIT discipline as clients.
    pub async fn new_supplier(
        &self,
        input: NewSupplier,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Supplier> {
        let name = normalize_required_text(&input.name, "supplier name")?;
        let cuit = normalize_cuit(&input.cuit)?;
        with_tx!(self, |db_tx| {
            let exists = suppliers::Entity::find()
                .filter(suppliers::Column::Cuit.eq(cuit.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::AlreadyExists(format!("cuit {cuit}")));
            }

            let supplier = Supplier::new(
                name,
                cuit,
                normalize_optional_text(input.address.as_deref()),
                normalize_optional_text(input.phone.as_deref()),
                created_at,
            );
            suppliers::ActiveModel::from(&supplier)
                .insert(&db_tx)
                .await?;
            Ok(supplier)
        })
    }

    /// Increases a client's prepaid credit balance.
    ///
    /// This is the only way credit grows; it shrinks only through
    /// [`Engine::apply_credit`].
    pub async fn grant_credit(&self, client_id: Uuid, amount: Cents) -> ResultEngine<Client> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "credit grant must be > 0".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            self.require_client(&db_tx, client_id).await?;

            let result = clients::Entity::update_many()
                .col_expr(
                    clients::Column::CreditBalanceCents,
                    Expr::col(clients::Column::CreditBalanceCents).add(amount.cents()),
                )
                .filter(clients::Column::Id.eq(client_id.to_string()))
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(EngineError::ConcurrencyConflict(
                    "client row vanished mid-update".to_string(),
                ));
            }

            let model = self.require_client(&db_tx, client_id).await?;
            Client::try_from(model)
        })
    }

    /// Client snapshot.
    pub async fn client(&self, client_id: Uuid) -> ResultEngine<Client> {
        let model = clients::Entity::find_by_id(client_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound("client not exists".to_string()))?;
        Client::try_from(model)
    }

    /// Supplier snapshot.
    pub async fn supplier(&self, supplier_id: Uuid) -> ResultEngine<Supplier> {
        let model = suppliers::Entity::find_by_id(supplier_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound("supplier not exists".to_string()))?;
        Supplier::try_from(model)
    }
}
