use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, DbErr, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*,
    sea_query::{Expr, OnConflict},
};

use crate::{
    EngineError, Movement, MovementKind, Presentation, Quantity, ResultEngine, StockBalance,
    StockLedgerKind, movements, stock_balances,
};

use super::{Engine, normalize_required_text, with_tx};

/// Context recorded alongside a movement: when it happened, why, and on whose
/// account. Provenance fields are stamped onto the balance row for inbound
/// movements that originate from a supplier invoice.
#[derive(Clone, Debug)]
pub struct MovementMeta {
    pub reference: String,
    pub counterparty: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub supplier_id: Option<Uuid>,
    pub invoice_number: Option<String>,
}

impl MovementMeta {
    /// Meta for a hand-entered movement with no counterparty.
    pub fn manual(reference: &str, occurred_at: DateTime<Utc>) -> Self {
        Self {
            reference: reference.to_string(),
            counterparty: None,
            occurred_at,
            supplier_id: None,
            invoice_number: None,
        }
    }
}

/// Outbound trend over the velocity window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Growing,
    Shrinking,
    Stable,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Growing => "growing",
            Self::Shrinking => "shrinking",
            Self::Stable => "stable",
        }
    }
}

/// Read-side aggregate over a key's movements in a time window.
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerVelocity {
    pub inbound: Quantity,
    pub outbound: Quantity,
    /// Outbound units per day over the whole window.
    pub throughput_per_day: f64,
    pub trend: Trend,
}

/// Filters for listing movements.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct MovementListFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// If present, acts as an allow-list of kinds to return.
    pub kinds: Option<Vec<MovementKind>>,
}

fn validate_list_filter(filter: &MovementListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidAmount(
            "invalid range: from must be < to".to_string(),
        ));
    }
    if filter.kinds.as_ref().is_some_and(|k| k.is_empty()) {
        return Err(EngineError::InvalidAmount(
            "kinds must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct MovementsCursor {
    occurred_at: DateTime<Utc>,
    movement_id: String,
}

impl MovementsCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid movements cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid movements cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid movements cursor".to_string()))
    }
}

/// Product keys come from the closed presentation set; roll/supply keys are
/// free-form labels.
fn normalize_ledger_key(ledger: StockLedgerKind, key: &str) -> ResultEngine<String> {
    match ledger {
        StockLedgerKind::Product => {
            Ok(Presentation::try_from(key)?.as_str().to_string())
        }
        StockLedgerKind::Roll | StockLedgerKind::Supply => {
            normalize_required_text(key, "ledger key")
        }
    }
}

impl Engine {
    /// Applies one movement to a ledger key and returns the new balance.
    ///
    /// The balance row is created at quantity 0 on first sight (upsert
    /// semantics). For outbound/consumption kinds the decrement is a single
    /// conditional update — "subtract only if enough remains" — so a
    /// concurrent caller can never observe a stale balance or drive it
    /// negative.
    pub async fn apply_movement(
        &self,
        ledger: StockLedgerKind,
        key: &str,
        kind: MovementKind,
        quantity: Quantity,
        meta: MovementMeta,
    ) -> ResultEngine<StockBalance> {
        with_tx!(self, |db_tx| {
            self.apply_movement_tx(&db_tx, ledger, key, kind, quantity, &meta)
                .await
        })
    }

    /// Transaction-scoped movement application, shared with sale/invoice
    /// compound writes.
    pub(super) async fn apply_movement_tx(
        &self,
        db: &DatabaseTransaction,
        ledger: StockLedgerKind,
        key: &str,
        kind: MovementKind,
        quantity: Quantity,
        meta: &MovementMeta,
    ) -> ResultEngine<StockBalance> {
        if !quantity.is_positive() {
            return Err(EngineError::InvalidQuantity(
                "movement quantity must be > 0".to_string(),
            ));
        }
        let key = normalize_ledger_key(ledger, key)?;

        let pk = (ledger.as_str().to_string(), key.clone());
        let existing = stock_balances::Entity::find_by_id(pk.clone()).one(db).await?;
        if existing.is_none() {
            let fresh = stock_balances::ActiveModel {
                ledger: ActiveValue::Set(ledger.as_str().to_string()),
                key: ActiveValue::Set(key.clone()),
                quantity_tenths: ActiveValue::Set(0),
                last_supplier_id: ActiveValue::Set(None),
                last_invoice_number: ActiveValue::Set(None),
                updated_at: ActiveValue::Set(meta.occurred_at),
            };
            // A concurrent caller may have created the row since the read;
            // whoever loses that race just moves on to the guarded update.
            let inserted = stock_balances::Entity::insert(fresh)
                .on_conflict(
                    OnConflict::columns([
                        stock_balances::Column::Ledger,
                        stock_balances::Column::Key,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec(db)
                .await;
            match inserted {
                Ok(_) | Err(DbErr::RecordNotInserted) => {}
                Err(err) => return Err(err.into()),
            }
        }

        if kind.is_inbound() {
            let mut update = stock_balances::Entity::update_many()
                .col_expr(
                    stock_balances::Column::QuantityTenths,
                    Expr::col(stock_balances::Column::QuantityTenths).add(quantity.tenths()),
                )
                .col_expr(
                    stock_balances::Column::UpdatedAt,
                    Expr::value(meta.occurred_at),
                )
                .filter(stock_balances::Column::Ledger.eq(ledger.as_str()))
                .filter(stock_balances::Column::Key.eq(key.clone()));
            if let Some(supplier_id) = meta.supplier_id {
                update = update.col_expr(
                    stock_balances::Column::LastSupplierId,
                    Expr::value(supplier_id.to_string()),
                );
            }
            if let Some(number) = &meta.invoice_number {
                update = update.col_expr(
                    stock_balances::Column::LastInvoiceNumber,
                    Expr::value(number.clone()),
                );
            }
            let result = update.exec(db).await?;
            if result.rows_affected == 0 {
                return Err(EngineError::ConcurrencyConflict(
                    "stock balance row vanished mid-update".to_string(),
                ));
            }
        } else {
            // Decrement only if enough remains; zero rows affected means the
            // guard failed and we re-read to tell why.
            let result = stock_balances::Entity::update_many()
                .col_expr(
                    stock_balances::Column::QuantityTenths,
                    Expr::col(stock_balances::Column::QuantityTenths).sub(quantity.tenths()),
                )
                .col_expr(
                    stock_balances::Column::UpdatedAt,
                    Expr::value(meta.occurred_at),
                )
                .filter(stock_balances::Column::Ledger.eq(ledger.as_str()))
                .filter(stock_balances::Column::Key.eq(key.clone()))
                .filter(stock_balances::Column::QuantityTenths.gte(quantity.tenths()))
                .exec(db)
                .await?;
            if result.rows_affected == 0 {
                let available = stock_balances::Entity::find_by_id(pk.clone())
                    .one(db)
                    .await?
                    .map(|m| Quantity::from_tenths(m.quantity_tenths))
                    .ok_or_else(|| {
                        EngineError::ConcurrencyConflict(
                            "stock balance row vanished mid-update".to_string(),
                        )
                    })?;
                return Err(EngineError::InsufficientStock { available });
            }
        }

        let movement = Movement::new(
            ledger,
            key.clone(),
            kind,
            quantity,
            meta.occurred_at,
            meta.reference.clone(),
            meta.counterparty.clone(),
        )?;
        movements::ActiveModel::from(&movement).insert(db).await?;

        tracing::debug!(
            ledger = ledger.as_str(),
            key = %key,
            kind = kind.as_str(),
            quantity = %quantity,
            reference = %meta.reference,
            "movement applied"
        );

        let model = stock_balances::Entity::find_by_id(pk)
            .one(db)
            .await?
            .ok_or_else(|| {
                EngineError::ConcurrencyConflict(
                    "stock balance row vanished mid-update".to_string(),
                )
            })?;
        StockBalance::try_from(model)
    }

    /// Current balance for one key.
    pub async fn stock_balance(
        &self,
        ledger: StockLedgerKind,
        key: &str,
    ) -> ResultEngine<StockBalance> {
        let key = normalize_ledger_key(ledger, key)?;
        let model = stock_balances::Entity::find_by_id((ledger.as_str().to_string(), key))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound("stock balance not exists".to_string()))?;
        StockBalance::try_from(model)
    }

    /// All balances of one ledger, ordered by key.
    pub async fn stock_balances(
        &self,
        ledger: StockLedgerKind,
    ) -> ResultEngine<Vec<StockBalance>> {
        let models = stock_balances::Entity::find()
            .filter(stock_balances::Column::Ledger.eq(ledger.as_str()))
            .order_by_asc(stock_balances::Column::Key)
            .all(&self.database)
            .await?;
        models.into_iter().map(StockBalance::try_from).collect()
    }

    /// Aggregates a key's movements over the trailing `window_days` into
    /// totals, throughput per day, and a trend classification.
    ///
    /// Trend compares the last 7 days of outbound against the remainder of
    /// the window: growing above 1.2x, shrinking below 0.8x, stable between.
    /// Windows of seven days or less leave no remainder and always report
    /// stable. Pure read-model, snapshot reads are fine.
    pub async fn ledger_velocity(
        &self,
        ledger: StockLedgerKind,
        key: &str,
        window_days: u32,
        now: DateTime<Utc>,
    ) -> ResultEngine<LedgerVelocity> {
        if window_days == 0 {
            return Err(EngineError::InvalidQuantity(
                "window must cover at least one day".to_string(),
            ));
        }
        let key = normalize_ledger_key(ledger, key)?;
        let since = now - Duration::days(i64::from(window_days));

        let rows = movements::Entity::find()
            .filter(movements::Column::Ledger.eq(ledger.as_str()))
            .filter(movements::Column::Key.eq(key))
            .filter(movements::Column::OccurredAt.gte(since))
            .filter(movements::Column::OccurredAt.lte(now))
            .all(&self.database)
            .await?;

        let recent_split = now - Duration::days(7);
        let mut inbound_tenths = 0i64;
        let mut outbound_tenths = 0i64;
        let mut recent_outbound_tenths = 0i64;
        for row in rows {
            let kind = MovementKind::try_from(row.kind.as_str())?;
            if kind.is_inbound() {
                inbound_tenths += row.quantity_tenths;
            } else {
                outbound_tenths += row.quantity_tenths;
                if row.occurred_at >= recent_split {
                    recent_outbound_tenths += row.quantity_tenths;
                }
            }
        }

        // A window of seven days or less has no earlier stretch to compare
        // the recent outbound against, so no trend can be read from it.
        let rest_outbound_tenths = outbound_tenths - recent_outbound_tenths;
        let trend = if window_days <= 7 {
            Trend::Stable
        } else if recent_outbound_tenths * 10 > rest_outbound_tenths * 12 {
            Trend::Growing
        } else if recent_outbound_tenths * 10 < rest_outbound_tenths * 8 {
            Trend::Shrinking
        } else {
            Trend::Stable
        };

        Ok(LedgerVelocity {
            inbound: Quantity::from_tenths(inbound_tenths),
            outbound: Quantity::from_tenths(outbound_tenths),
            throughput_per_day: (outbound_tenths as f64 / 10.0) / f64::from(window_days),
            trend,
        })
    }

    /// Lists a ledger's movements newest → older, with cursor-based
    /// pagination by `(occurred_at DESC, id DESC)`.
    pub async fn list_movements(
        &self,
        ledger: StockLedgerKind,
        key: Option<&str>,
        limit: u64,
        cursor: Option<&str>,
        filter: &MovementListFilter,
    ) -> ResultEngine<(Vec<Movement>, Option<String>)> {
        with_tx!(self, |db_tx| {
            validate_list_filter(filter)?;

            let limit_plus_one = limit.saturating_add(1);
            let mut query = movements::Entity::find()
                .filter(movements::Column::Ledger.eq(ledger.as_str()))
                .order_by_desc(movements::Column::OccurredAt)
                .order_by_desc(movements::Column::Id)
                .limit(limit_plus_one);

            if let Some(key) = key {
                let key = normalize_ledger_key(ledger, key)?;
                query = query.filter(movements::Column::Key.eq(key));
            }
            if let Some(from) = filter.from {
                query = query.filter(movements::Column::OccurredAt.gte(from));
            }
            if let Some(to) = filter.to {
                query = query.filter(movements::Column::OccurredAt.lt(to));
            }
            if let Some(kinds) = &filter.kinds {
                let kinds: Vec<String> = kinds.iter().map(|k| k.as_str().to_string()).collect();
                query = query.filter(movements::Column::Kind.is_in(kinds));
            }

            if let Some(cursor) = cursor {
                let cursor = MovementsCursor::decode(cursor)?;
                query = query.filter(
                    Condition::any()
                        .add(movements::Column::OccurredAt.lt(cursor.occurred_at))
                        .add(
                            Condition::all()
                                .add(movements::Column::OccurredAt.eq(cursor.occurred_at))
                                .add(movements::Column::Id.lt(cursor.movement_id)),
                        ),
                );
            }

            let rows: Vec<movements::Model> = query.all(&db_tx).await?;
            let has_more = rows.len() > limit as usize;

            let mut out: Vec<Movement> = Vec::with_capacity(rows.len().min(limit as usize));
            for model in rows.into_iter().take(limit as usize) {
                out.push(Movement::try_from(model)?);
            }

            let next_cursor = out.last().map(|m| MovementsCursor {
                occurred_at: m.occurred_at,
                movement_id: m.id.to_string(),
            });
            let next_cursor = if has_more {
                next_cursor.map(|c| c.encode()).transpose()?
            } else {
                None
            };

            Ok((out, next_cursor))
        })
    }
}
