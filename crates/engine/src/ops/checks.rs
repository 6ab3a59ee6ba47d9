use chrono::{Duration, NaiveDate};
use uuid::Uuid;

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};

use crate::{
    Cents, Check, CheckStatus, EngineError, ResultEngine, checks, checks::append_note,
};

use super::{Engine, normalize_optional_text, normalize_required_text, with_tx};

#[derive(Clone, Debug)]
pub struct NewCheck {
    pub check_number: String,
    pub amount: Cents,
    pub electronic: bool,
    pub received_on: NaiveDate,
    pub due_on: NaiveDate,
    pub received_from: String,
    pub issued_by: String,
    pub notes: Option<String>,
}

impl Engine {
    /// Registers a received check in `pending` state. The check number must
    /// be unique across all non-deleted checks.
    pub async fn create_check(&self, input: NewCheck) -> ResultEngine<Check> {
        let check_number = normalize_required_text(&input.check_number, "check number")?;
        let received_from = normalize_required_text(&input.received_from, "received from")?;
        let issued_by = normalize_required_text(&input.issued_by, "issued by")?;

        with_tx!(self, |db_tx| {
            let exists = checks::Entity::find()
                .filter(checks::Column::CheckNumber.eq(check_number.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::DuplicateCheckNumber(check_number));
            }

            let check = Check::new(
                check_number,
                input.amount,
                input.electronic,
                input.received_on,
                input.due_on,
                received_from,
                issued_by,
                normalize_optional_text(input.notes.as_deref()),
            )?;
            checks::ActiveModel::from(&check).insert(&db_tx).await?;
            Ok(check)
        })
    }

    /// Returns a check, expiry-normalized as of `today`.
    pub async fn check(&self, check_id: Uuid, today: NaiveDate) -> ResultEngine<Check> {
        with_tx!(self, |db_tx| {
            let model = self.require_check(&db_tx, check_id).await?;
            let model = self.normalize_check_expiry(&db_tx, model, today).await?;
            Check::try_from(model)
        })
    }

    /// Moves a check to a new status, appending any notes.
    ///
    /// Expiry normalization runs first, but a manual transition out of
    /// `expired` (e.g. a late collection) is still legitimate and allowed.
    pub async fn update_check_status(
        &self,
        check_id: Uuid,
        new_status: CheckStatus,
        notes: Option<&str>,
        today: NaiveDate,
    ) -> ResultEngine<Check> {
        with_tx!(self, |db_tx| {
            let model = self.require_check(&db_tx, check_id).await?;
            let model = self.normalize_check_expiry(&db_tx, model, today).await?;

            let notes = append_note(model.notes.clone(), normalize_optional_text(notes));
            let active = checks::ActiveModel {
                id: ActiveValue::Set(model.id),
                status: ActiveValue::Set(new_status.as_str().to_string()),
                notes: ActiveValue::Set(notes),
                ..Default::default()
            };
            let updated = active.update(&db_tx).await?;
            Check::try_from(updated)
        })
    }

    /// Hands a check over to a third party, recording the delivery metadata.
    pub async fn deliver_check(
        &self,
        check_id: Uuid,
        delivered_to: &str,
        delivered_on: NaiveDate,
        delivered_for: Option<&str>,
        invoice_id: Option<Uuid>,
        today: NaiveDate,
    ) -> ResultEngine<Check> {
        let delivered_to = normalize_required_text(delivered_to, "delivered to")?;
        with_tx!(self, |db_tx| {
            let model = self.require_check(&db_tx, check_id).await?;
            let model = self.normalize_check_expiry(&db_tx, model, today).await?;
            if let Some(invoice_id) = invoice_id {
                self.require_invoice(&db_tx, invoice_id).await?;
            }

            let active = checks::ActiveModel {
                id: ActiveValue::Set(model.id),
                status: ActiveValue::Set(CheckStatus::Delivered.as_str().to_string()),
                delivered_to: ActiveValue::Set(Some(delivered_to)),
                delivered_on: ActiveValue::Set(Some(delivered_on)),
                delivered_for: ActiveValue::Set(normalize_optional_text(delivered_for)),
                delivered_invoice_id: ActiveValue::Set(invoice_id.map(|id| id.to_string())),
                ..Default::default()
            };
            let updated = active.update(&db_tx).await?;
            Check::try_from(updated)
        })
    }

    /// Hard-deletes a check. Collected checks are settled money and cannot
    /// be deleted.
    pub async fn delete_check(&self, check_id: Uuid, today: NaiveDate) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_check(&db_tx, check_id).await?;
            let model = self.normalize_check_expiry(&db_tx, model, today).await?;
            if model.status == CheckStatus::Collected.as_str() {
                return Err(EngineError::CannotDeleteCollected(model.check_number));
            }
            checks::Entity::delete_by_id(model.id).exec(&db_tx).await?;
            Ok(())
        })
    }

    /// Pending checks due within `within_days` of `today`, expiry already
    /// normalized, ordered by due date.
    pub async fn checks_due(
        &self,
        within_days: u32,
        today: NaiveDate,
    ) -> ResultEngine<Vec<Check>> {
        with_tx!(self, |db_tx| {
            let horizon = today + Duration::days(i64::from(within_days));
            let rows = checks::Entity::find()
                .filter(checks::Column::Status.eq(CheckStatus::Pending.as_str()))
                .filter(checks::Column::DueOn.lte(horizon))
                .order_by_asc(checks::Column::DueOn)
                .all(&db_tx)
                .await?;

            let mut out = Vec::with_capacity(rows.len());
            for model in rows {
                let model = self.normalize_check_expiry(&db_tx, model, today).await?;
                if model.status == CheckStatus::Pending.as_str() {
                    out.push(Check::try_from(model)?);
                }
            }
            Ok(out)
        })
    }

    /// Passive transition: a pending check past its due date is forced to
    /// `expired` before any other logic runs, and the change is persisted in
    /// the caller's transaction.
    pub(super) async fn normalize_check_expiry(
        &self,
        db: &DatabaseTransaction,
        model: checks::Model,
        today: NaiveDate,
    ) -> ResultEngine<checks::Model> {
        if model.status != CheckStatus::Pending.as_str() || model.due_on >= today {
            return Ok(model);
        }
        tracing::debug!(check = %model.id, number = %model.check_number, "check expired");
        let active = checks::ActiveModel {
            id: ActiveValue::Set(model.id.clone()),
            status: ActiveValue::Set(CheckStatus::Expired.as_str().to_string()),
            ..Default::default()
        };
        let updated = active.update(db).await?;
        Ok(updated)
    }
}
