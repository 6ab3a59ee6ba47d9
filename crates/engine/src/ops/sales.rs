use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    Cents, EngineError, MovementKind, Payment, PaymentMethod, Presentation, Quantity, ResultEngine,
    Sale, SettlementStatus, StockLedgerKind, checks, clients, payments, sales,
};

use super::{Engine, MovementMeta, normalize_optional_text, with_tx};

#[derive(Clone, Debug)]
pub struct CreateSale {
    pub client_id: Uuid,
    pub presentation: Presentation,
    pub quantity: Quantity,
    pub unit_price: Cents,
    pub lot: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Sale snapshot with the figures derived from its payment log.
#[derive(Clone, Debug, PartialEq)]
pub struct SaleStatement {
    pub sale: Sale,
    pub total_paid: Cents,
    pub remaining: Cents,
    /// Amount paid in excess of the total.
    pub surplus: Cents,
}

impl Engine {
    /// Creates a sale and its outbound product movement as one transaction.
    ///
    /// The movement's reference ties back to the sale id, so read-side
    /// enrichment (client name, company) never needs to denormalize the
    /// movement record. If stock is short the whole operation rolls back and
    /// `InsufficientStock` reports the quantity actually available.
    pub async fn create_sale(&self, input: CreateSale) -> ResultEngine<Sale> {
        if !input.quantity.is_positive() {
            return Err(EngineError::InvalidQuantity(
                "sale quantity must be > 0".to_string(),
            ));
        }
        if input.unit_price.is_negative() {
            return Err(EngineError::InvalidAmount(
                "unit price must be >= 0".to_string(),
            ));
        }
        let total = input
            .unit_price
            .times_quantity(input.quantity)
            .ok_or_else(|| EngineError::InvalidAmount("sale total overflows".to_string()))?;
        let lot = normalize_optional_text(input.lot.as_deref());

        with_tx!(self, |db_tx| {
            let client = self.require_client(&db_tx, input.client_id).await?;

            if let Some(lot) = &lot {
                let exists = sales::Entity::find()
                    .filter(sales::Column::Lot.eq(lot.clone()))
                    .one(&db_tx)
                    .await?
                    .is_some();
                if exists {
                    return Err(EngineError::AlreadyExists(format!("lot {lot}")));
                }
            }

            let sale = Sale {
                id: Uuid::new_v4(),
                client_id: input.client_id,
                presentation: input.presentation,
                quantity: input.quantity,
                unit_price: input.unit_price,
                total,
                lot,
                notes: normalize_optional_text(input.notes.as_deref()),
                status: SettlementStatus::Pending,
                created_at: input.occurred_at,
            };

            let meta = MovementMeta {
                reference: format!("sale:{}", sale.id),
                counterparty: Some(client.name.clone()),
                occurred_at: input.occurred_at,
                supplier_id: None,
                invoice_number: None,
            };
            self.apply_movement_tx(
                &db_tx,
                StockLedgerKind::Product,
                input.presentation.as_str(),
                MovementKind::Outbound,
                input.quantity,
                &meta,
            )
            .await?;

            sales::ActiveModel::from(&sale).insert(&db_tx).await?;
            Ok(sale)
        })
    }

    /// Appends a payment to a sale and recomputes its status from the full
    /// payment log. Payments are never updated or deleted.
    ///
    /// A linked check is expiry-normalized as of the payment date before it
    /// is touched.
    pub async fn record_sale_payment(
        &self,
        sale_id: Uuid,
        amount: Cents,
        method: PaymentMethod,
        reference: Option<&str>,
        check_id: Option<Uuid>,
        paid_at: DateTime<Utc>,
    ) -> ResultEngine<Payment> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "payment amount must be > 0".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let sale_model = self.require_sale(&db_tx, sale_id).await?;
            if let Some(check_id) = check_id {
                let check_model = self.require_check(&db_tx, check_id).await?;
                self.normalize_check_expiry(&db_tx, check_model, paid_at.date_naive())
                    .await?;
            }

            let payment = Payment::new(
                sale_id,
                amount,
                method,
                normalize_optional_text(reference),
                check_id,
                paid_at,
            )?;
            payments::ActiveModel::from(&payment).insert(&db_tx).await?;

            // Back-reference from the check to the payment that it settles.
            if let Some(check_id) = check_id {
                let active = checks::ActiveModel {
                    id: ActiveValue::Set(check_id.to_string()),
                    sale_payment_id: ActiveValue::Set(Some(payment.id.to_string())),
                    ..Default::default()
                };
                active.update(&db_tx).await?;
            }

            self.recompute_sale_status(&db_tx, sale_id, Cents::new(sale_model.total_cents))
                .await?;
            Ok(payment)
        })
    }

    /// Applies a client's prepaid credit against one of their open sales.
    ///
    /// The applied amount is clamped to the sale's remaining balance; the
    /// credit decrement and the payment append are one atomic unit.
    pub async fn apply_credit(
        &self,
        client_id: Uuid,
        sale_id: Uuid,
        amount: Cents,
        paid_at: DateTime<Utc>,
    ) -> ResultEngine<Payment> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "credit amount must be > 0".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let client = self.require_client(&db_tx, client_id).await?;
            let sale_model = self.require_sale(&db_tx, sale_id).await?;
            if sale_model.client_id != client_id.to_string() {
                return Err(EngineError::SaleNotOwnedByClient(
                    "sale belongs to another client".to_string(),
                ));
            }

            let total = Cents::new(sale_model.total_cents);
            let paid = self.sale_total_paid(&db_tx, sale_id).await?;
            let remaining = total - paid;
            if !remaining.is_positive() {
                return Err(EngineError::SaleFullyPaid(sale_id.to_string()));
            }
            if Cents::new(client.credit_balance_cents) < amount {
                return Err(EngineError::InsufficientCredit(format!(
                    "{} available",
                    Cents::new(client.credit_balance_cents)
                )));
            }
            let to_apply = amount.min(remaining);

            // Guarded decrement: the fresh read above said there was enough,
            // so zero rows here means a concurrent writer got in between.
            let result = clients::Entity::update_many()
                .col_expr(
                    clients::Column::CreditBalanceCents,
                    Expr::col(clients::Column::CreditBalanceCents).sub(to_apply.cents()),
                )
                .filter(clients::Column::Id.eq(client_id.to_string()))
                .filter(clients::Column::CreditBalanceCents.gte(to_apply.cents()))
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(EngineError::ConcurrencyConflict(
                    "client credit changed concurrently".to_string(),
                ));
            }

            let payment = Payment::new(
                sale_id,
                to_apply,
                PaymentMethod::CreditBalance,
                None,
                None,
                paid_at,
            )?;
            payments::ActiveModel::from(&payment).insert(&db_tx).await?;

            self.recompute_sale_status(&db_tx, sale_id, total).await?;
            Ok(payment)
        })
    }

    /// Sale snapshot with totals derived from the payment log.
    pub async fn sale(&self, sale_id: Uuid) -> ResultEngine<SaleStatement> {
        with_tx!(self, |db_tx| {
            let model = self.require_sale(&db_tx, sale_id).await?;
            let total = Cents::new(model.total_cents);
            let paid = self.sale_total_paid(&db_tx, sale_id).await?;
            Ok(SaleStatement {
                sale: Sale::try_from(model)?,
                total_paid: paid,
                remaining: Cents::new((total - paid).cents().max(0)),
                surplus: Cents::new((paid - total).cents().max(0)),
            })
        })
    }

    /// Sum of all payments recorded against a sale.
    pub(super) async fn sale_total_paid(
        &self,
        db: &DatabaseTransaction,
        sale_id: Uuid,
    ) -> ResultEngine<Cents> {
        let rows = payments::Entity::find()
            .filter(payments::Column::SaleId.eq(sale_id.to_string()))
            .all(db)
            .await?;
        rows.iter()
            .try_fold(Cents::ZERO, |acc, row| {
                acc.checked_add(Cents::new(row.amount_cents))
            })
            .ok_or_else(|| EngineError::InvalidAmount("paid total overflows".to_string()))
    }

    /// Writes the status derived from the authoritative payment log; the
    /// previously stored value is never an input.
    async fn recompute_sale_status(
        &self,
        db: &DatabaseTransaction,
        sale_id: Uuid,
        total: Cents,
    ) -> ResultEngine<SettlementStatus> {
        let paid = self.sale_total_paid(db, sale_id).await?;
        let status = SettlementStatus::derive(total, paid);
        let active = sales::ActiveModel {
            id: ActiveValue::Set(sale_id.to_string()),
            status: ActiveValue::Set(status.as_str().to_string()),
            ..Default::default()
        };
        active.update(db).await?;
        Ok(status)
    }
}
