use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*,
};

use crate::{
    Cents, EngineError, Invoice, InvoiceLine, MaterialKind, MovementKind, PaymentMethod, Quantity,
    ResultEngine, SettlementStatus, SupplierPayment, invoice_lines, invoices, supplier_payments,
};

use super::{Engine, MovementMeta, normalize_optional_text, normalize_required_text, with_tx};

/// Stored tax and total may drift from the values derived from the subtotal
/// by at most one currency unit before the repair pass rewrites them.
const TAX_TOLERANCE_CENTS: i64 = 100;

#[derive(Clone, Debug)]
pub struct NewInvoiceLine {
    pub description: String,
    pub material: MaterialKind,
    /// Ledger key for roll/supply lines; the description is used when absent.
    pub material_key: Option<String>,
    pub quantity: Quantity,
    pub unit_price: Cents,
}

#[derive(Clone, Debug)]
pub struct RecordInvoice {
    pub supplier_id: Uuid,
    pub number: String,
    pub issued_on: NaiveDate,
    pub lines: Vec<NewInvoiceLine>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Rollup of a supplier's invoiced/paid totals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SupplierBalance {
    pub invoiced: Cents,
    pub paid: Cents,
    pub outstanding: Cents,
}

/// Outcome of one tax-repair run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TaxRepairReport {
    pub corrected: u64,
    pub skipped: u64,
    /// Net change to invoice totals across all corrections.
    pub net_delta: Cents,
}

impl Engine {
    /// Records a supplier invoice: subtotal from the lines, 21% tax rounded
    /// to cents, total = subtotal + tax. Raw-material lines trigger inbound
    /// movements with provenance, all in the same transaction.
    pub async fn record_invoice(&self, input: RecordInvoice) -> ResultEngine<Invoice> {
        let number = normalize_required_text(&input.number, "invoice number")?;
        if input.lines.is_empty() {
            return Err(EngineError::InvalidAmount(
                "invoice needs at least one line".to_string(),
            ));
        }

        let mut prepared: Vec<(NewInvoiceLine, String, Cents)> =
            Vec::with_capacity(input.lines.len());
        let mut subtotal = Cents::ZERO;
        for line in input.lines {
            let description = normalize_required_text(&line.description, "line description")?;
            if !line.quantity.is_positive() {
                return Err(EngineError::InvalidQuantity(
                    "line quantity must be > 0".to_string(),
                ));
            }
            if line.unit_price.is_negative() {
                return Err(EngineError::InvalidAmount(
                    "line unit price must be >= 0".to_string(),
                ));
            }
            let line_total = line
                .unit_price
                .times_quantity(line.quantity)
                .ok_or_else(|| EngineError::InvalidAmount("line total overflows".to_string()))?;
            subtotal = subtotal
                .checked_add(line_total)
                .ok_or_else(|| EngineError::InvalidAmount("subtotal overflows".to_string()))?;
            prepared.push((line, description, line_total));
        }

        with_tx!(self, |db_tx| {
            let supplier = self.require_supplier(&db_tx, input.supplier_id).await?;

            let invoice = Invoice::new(
                input.supplier_id,
                number.clone(),
                input.issued_on,
                subtotal,
                normalize_optional_text(input.notes.as_deref()),
                input.occurred_at,
            );
            invoices::ActiveModel::from(&invoice).insert(&db_tx).await?;

            for (line, description, line_total) in prepared {
                let material_key = normalize_optional_text(line.material_key.as_deref());
                let row = InvoiceLine {
                    id: Uuid::new_v4(),
                    invoice_id: invoice.id,
                    description: description.clone(),
                    material: line.material,
                    material_key: material_key.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    total: line_total,
                };
                invoice_lines::ActiveModel::from(&row).insert(&db_tx).await?;

                if let Some(ledger) = line.material.ledger() {
                    let key = material_key.unwrap_or(description);
                    let meta = MovementMeta {
                        reference: format!("invoice:{number}"),
                        counterparty: Some(supplier.name.clone()),
                        occurred_at: input.occurred_at,
                        supplier_id: Some(input.supplier_id),
                        invoice_number: Some(number.clone()),
                    };
                    self.apply_movement_tx(
                        &db_tx,
                        ledger,
                        &key,
                        MovementKind::Inbound,
                        line.quantity,
                        &meta,
                    )
                    .await?;
                }
            }

            Ok(invoice)
        })
    }

    /// Appends a payment to an invoice and recomputes its status, same
    /// arithmetic as sale payments against the invoice total.
    pub async fn record_supplier_payment(
        &self,
        invoice_id: Uuid,
        amount: Cents,
        method: PaymentMethod,
        reference: Option<&str>,
        notes: Option<&str>,
        paid_at: DateTime<Utc>,
    ) -> ResultEngine<SupplierPayment> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "payment amount must be > 0".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let invoice_model = self.require_invoice(&db_tx, invoice_id).await?;

            let payment = SupplierPayment::new(
                invoice_id,
                amount,
                method,
                normalize_optional_text(reference),
                normalize_optional_text(notes),
                paid_at,
            )?;
            supplier_payments::ActiveModel::from(&payment)
                .insert(&db_tx)
                .await?;

            self.recompute_invoice_status(&db_tx, invoice_id, Cents::new(invoice_model.total_cents))
                .await?;
            Ok(payment)
        })
    }

    /// Invoice snapshot.
    pub async fn invoice(&self, invoice_id: Uuid) -> ResultEngine<Invoice> {
        let model = invoices::Entity::find_by_id(invoice_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound("invoice not exists".to_string()))?;
        Invoice::try_from(model)
    }

    /// Rollup of everything invoiced by and paid to one supplier.
    pub async fn supplier_balance(&self, supplier_id: Uuid) -> ResultEngine<SupplierBalance> {
        with_tx!(self, |db_tx| {
            self.require_supplier(&db_tx, supplier_id).await?;

            let invoice_rows = invoices::Entity::find()
                .filter(invoices::Column::SupplierId.eq(supplier_id.to_string()))
                .all(&db_tx)
                .await?;

            let mut invoiced = Cents::ZERO;
            let mut ids: Vec<String> = Vec::with_capacity(invoice_rows.len());
            for row in &invoice_rows {
                invoiced = invoiced
                    .checked_add(Cents::new(row.total_cents))
                    .ok_or_else(|| {
                        EngineError::InvalidAmount("invoiced total overflows".to_string())
                    })?;
                ids.push(row.id.clone());
            }

            let mut paid = Cents::ZERO;
            if !ids.is_empty() {
                let payment_rows = supplier_payments::Entity::find()
                    .filter(supplier_payments::Column::InvoiceId.is_in(ids))
                    .all(&db_tx)
                    .await?;
                for row in &payment_rows {
                    paid = paid
                        .checked_add(Cents::new(row.amount_cents))
                        .ok_or_else(|| {
                            EngineError::InvalidAmount("paid total overflows".to_string())
                        })?;
                }
            }

            Ok(SupplierBalance {
                invoiced,
                paid,
                outstanding: Cents::new((invoiced - paid).cents().max(0)),
            })
        })
    }

    /// Idempotent batch correction of corrupt invoice tax.
    ///
    /// An invoice is corrupt when its stored tax deviates from
    /// `round2(subtotal x 0.21)` by more than one currency unit, or when its
    /// stored total deviates from `subtotal + tax` by the same margin; both
    /// columns are rewritten from the subtotal. Bad rows are skipped and
    /// counted, never fail the whole batch; a second run right after is a
    /// no-op.
    pub async fn repair_invoice_tax(&self) -> ResultEngine<TaxRepairReport> {
        with_tx!(self, |db_tx| {
            let rows = invoices::Entity::find().all(&db_tx).await?;

            let mut report = TaxRepairReport::default();
            for model in rows {
                let subtotal = Cents::new(model.subtotal_cents);
                if subtotal.is_negative() {
                    tracing::warn!(
                        invoice = %model.id,
                        number = %model.number,
                        subtotal = %subtotal,
                        "repair skipped: negative subtotal"
                    );
                    report.skipped += 1;
                    continue;
                }

                let expected_tax = subtotal.tax_21();
                let stored_tax = Cents::new(model.tax_cents);
                let Some(expected_total) = subtotal.checked_add(expected_tax) else {
                    tracing::warn!(
                        invoice = %model.id,
                        number = %model.number,
                        "repair skipped: corrected total overflows"
                    );
                    report.skipped += 1;
                    continue;
                };
                let old_total = Cents::new(model.total_cents);

                // Either stored figure drifting past the tolerance marks the
                // row corrupt.
                let tax_ok = (stored_tax - expected_tax).abs().cents() <= TAX_TOLERANCE_CENTS;
                let total_ok = (old_total - expected_total).abs().cents() <= TAX_TOLERANCE_CENTS;
                if tax_ok && total_ok {
                    continue;
                }

                let active = invoices::ActiveModel {
                    id: ActiveValue::Set(model.id.clone()),
                    tax_cents: ActiveValue::Set(expected_tax.cents()),
                    total_cents: ActiveValue::Set(expected_total.cents()),
                    ..Default::default()
                };
                active.update(&db_tx).await?;

                tracing::info!(
                    invoice = %model.id,
                    number = %model.number,
                    old_tax = %stored_tax,
                    new_tax = %expected_tax,
                    old_total = %old_total,
                    new_total = %expected_total,
                    "invoice tax repaired"
                );
                report.corrected += 1;
                report.net_delta += expected_total - old_total;
            }

            Ok(report)
        })
    }

    async fn recompute_invoice_status(
        &self,
        db: &DatabaseTransaction,
        invoice_id: Uuid,
        total: Cents,
    ) -> ResultEngine<SettlementStatus> {
        let rows = supplier_payments::Entity::find()
            .filter(supplier_payments::Column::InvoiceId.eq(invoice_id.to_string()))
            .all(db)
            .await?;
        let paid = rows
            .iter()
            .try_fold(Cents::ZERO, |acc, row| {
                acc.checked_add(Cents::new(row.amount_cents))
            })
            .ok_or_else(|| EngineError::InvalidAmount("paid total overflows".to_string()))?;

        let status = SettlementStatus::derive(total, paid);
        let active = invoices::ActiveModel {
            id: ActiveValue::Set(invoice_id.to_string()),
            status: ActiveValue::Set(status.as_str().to_string()),
            ..Default::default()
        };
        active.update(db).await?;
        Ok(status)
    }
}
