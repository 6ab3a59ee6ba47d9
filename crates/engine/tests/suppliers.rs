use chrono::{NaiveDate, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Cents, Engine, EngineError, MaterialKind, NewInvoiceLine, NewSupplier, PaymentMethod,
    Quantity, RecordInvoice, SettlementStatus, StockLedgerKind, Supplier,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn seed_supplier(engine: &Engine) -> Supplier {
    engine
        .new_supplier(
            NewSupplier {
                name: "Textil Sur".to_string(),
                cuit: "30-55566677-8".to_string(),
                address: None,
                phone: None,
            },
            Utc::now(),
        )
        .await
        .unwrap()
}

fn issued_on() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

#[tokio::test]
async fn invoice_derives_tax_and_total_from_the_lines() {
    let (engine, _db) = engine_with_db().await;
    let supplier = seed_supplier(&engine).await;

    let invoice = engine
        .record_invoice(RecordInvoice {
            supplier_id: supplier.id,
            number: "A-0001".to_string(),
            issued_on: issued_on(),
            lines: vec![NewInvoiceLine {
                description: "flete".to_string(),
                material: MaterialKind::Other,
                material_key: None,
                quantity: Quantity::from_units(1),
                unit_price: Cents::new(11_000_00),
            }],
            notes: None,
            occurred_at: Utc::now(),
        })
        .await
        .unwrap();

    assert_eq!(invoice.subtotal, Cents::new(11_000_00));
    assert_eq!(invoice.tax, Cents::new(2310_00));
    assert_eq!(invoice.total, Cents::new(13_310_00));
    assert_eq!(invoice.status, SettlementStatus::Pending);
}

#[tokio::test]
async fn material_lines_enter_stock_with_provenance() {
    let (engine, _db) = engine_with_db().await;
    let supplier = seed_supplier(&engine).await;

    engine
        .record_invoice(RecordInvoice {
            supplier_id: supplier.id,
            number: "A-0002".to_string(),
            issued_on: issued_on(),
            lines: vec![
                NewInvoiceLine {
                    description: "lycra negra 180g".to_string(),
                    material: MaterialKind::Roll,
                    material_key: Some("lycra negra".to_string()),
                    quantity: Quantity::from_units(50),
                    unit_price: Cents::new(4500_00),
                },
                NewInvoiceLine {
                    description: "flete".to_string(),
                    material: MaterialKind::Other,
                    material_key: None,
                    quantity: Quantity::from_units(1),
                    unit_price: Cents::new(800_00),
                },
            ],
            notes: None,
            occurred_at: Utc::now(),
        })
        .await
        .unwrap();

    let balance = engine
        .stock_balance(StockLedgerKind::Roll, "lycra negra")
        .await
        .unwrap();
    assert_eq!(balance.quantity, Quantity::from_units(50));
    assert_eq!(balance.last_supplier_id, Some(supplier.id));
    assert_eq!(balance.last_invoice_number.as_deref(), Some("A-0002"));

    // The freight line feeds no ledger.
    let result = engine.stock_balance(StockLedgerKind::Supply, "flete").await;
    assert!(matches!(result, Err(EngineError::NotFound(_))));
}

#[tokio::test]
async fn supply_lines_without_key_fall_back_to_the_description() {
    let (engine, _db) = engine_with_db().await;
    let supplier = seed_supplier(&engine).await;

    engine
        .record_invoice(RecordInvoice {
            supplier_id: supplier.id,
            number: "A-0003".to_string(),
            issued_on: issued_on(),
            lines: vec![NewInvoiceLine {
                description: "hilo poliester".to_string(),
                material: MaterialKind::Supply,
                material_key: None,
                quantity: Quantity::from_units(200),
                unit_price: Cents::new(30_00),
            }],
            notes: None,
            occurred_at: Utc::now(),
        })
        .await
        .unwrap();

    let balance = engine
        .stock_balance(StockLedgerKind::Supply, "hilo poliester")
        .await
        .unwrap();
    assert_eq!(balance.quantity, Quantity::from_units(200));
}

#[tokio::test]
async fn invoice_without_lines_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let supplier = seed_supplier(&engine).await;

    let result = engine
        .record_invoice(RecordInvoice {
            supplier_id: supplier.id,
            number: "A-0004".to_string(),
            issued_on: issued_on(),
            lines: vec![],
            notes: None,
            occurred_at: Utc::now(),
        })
        .await;
    assert!(matches!(result, Err(EngineError::InvalidAmount(_))));
}

#[tokio::test]
async fn payments_walk_the_invoice_through_partial_to_paid() {
    let (engine, _db) = engine_with_db().await;
    let supplier = seed_supplier(&engine).await;

    let invoice = engine
        .record_invoice(RecordInvoice {
            supplier_id: supplier.id,
            number: "A-0005".to_string(),
            issued_on: issued_on(),
            lines: vec![NewInvoiceLine {
                description: "servicio".to_string(),
                material: MaterialKind::Other,
                material_key: None,
                quantity: Quantity::from_units(1),
                unit_price: Cents::new(1000_00),
            }],
            notes: None,
            occurred_at: Utc::now(),
        })
        .await
        .unwrap();
    assert_eq!(invoice.total, Cents::new(1210_00));

    engine
        .record_supplier_payment(
            invoice.id,
            Cents::new(1000_00),
            PaymentMethod::Transfer,
            Some("transfer #17"),
            None,
            Utc::now(),
        )
        .await
        .unwrap();
    let current = engine.invoice(invoice.id).await.unwrap();
    assert_eq!(current.status, SettlementStatus::Partial);

    engine
        .record_supplier_payment(
            invoice.id,
            Cents::new(210_00),
            PaymentMethod::Cash,
            None,
            None,
            Utc::now(),
        )
        .await
        .unwrap();
    let current = engine.invoice(invoice.id).await.unwrap();
    assert_eq!(current.status, SettlementStatus::Paid);

    let balance = engine.supplier_balance(supplier.id).await.unwrap();
    assert_eq!(balance.invoiced, Cents::new(1210_00));
    assert_eq!(balance.paid, Cents::new(1210_00));
    assert_eq!(balance.outstanding, Cents::ZERO);
}

#[tokio::test]
async fn supplier_balance_reports_outstanding_debt() {
    let (engine, _db) = engine_with_db().await;
    let supplier = seed_supplier(&engine).await;

    let invoice = engine
        .record_invoice(RecordInvoice {
            supplier_id: supplier.id,
            number: "A-0006".to_string(),
            issued_on: issued_on(),
            lines: vec![NewInvoiceLine {
                description: "servicio".to_string(),
                material: MaterialKind::Other,
                material_key: None,
                quantity: Quantity::from_units(1),
                unit_price: Cents::new(2000_00),
            }],
            notes: None,
            occurred_at: Utc::now(),
        })
        .await
        .unwrap();

    engine
        .record_supplier_payment(
            invoice.id,
            Cents::new(500_00),
            PaymentMethod::Cash,
            None,
            None,
            Utc::now(),
        )
        .await
        .unwrap();

    let balance = engine.supplier_balance(supplier.id).await.unwrap();
    assert_eq!(balance.invoiced, Cents::new(2420_00));
    assert_eq!(balance.paid, Cents::new(500_00));
    assert_eq!(balance.outstanding, Cents::new(1920_00));
}

#[tokio::test]
async fn tax_repair_rewrites_corrupt_rows_and_is_idempotent() {
    let (engine, db) = engine_with_db().await;
    let supplier = seed_supplier(&engine).await;

    let invoice = engine
        .record_invoice(RecordInvoice {
            supplier_id: supplier.id,
            number: "A-0007".to_string(),
            issued_on: issued_on(),
            lines: vec![NewInvoiceLine {
                description: "servicio".to_string(),
                material: MaterialKind::Other,
                material_key: None,
                quantity: Quantity::from_units(1),
                unit_price: Cents::new(11_000_00),
            }],
            notes: None,
            occurred_at: Utc::now(),
        })
        .await
        .unwrap();

    // Simulate legacy corruption: tax zeroed out, total collapsed to the
    // subtotal.
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "UPDATE invoices SET tax_cents = 0, total_cents = subtotal_cents WHERE id = ?",
        vec![invoice.id.to_string().into()],
    ))
    .await
    .unwrap();

    let report = engine.repair_invoice_tax().await.unwrap();
    assert_eq!(report.corrected, 1);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.net_delta, Cents::new(2310_00));

    let repaired = engine.invoice(invoice.id).await.unwrap();
    assert_eq!(repaired.tax, Cents::new(2310_00));
    assert_eq!(repaired.total, Cents::new(13_310_00));

    // A second pass finds nothing left to do.
    let report = engine.repair_invoice_tax().await.unwrap();
    assert_eq!(report.corrected, 0);
    assert_eq!(report.net_delta, Cents::ZERO);
}

#[tokio::test]
async fn tax_repair_catches_a_corrupt_total_with_intact_tax() {
    let (engine, db) = engine_with_db().await;
    let supplier = seed_supplier(&engine).await;

    let invoice = engine
        .record_invoice(RecordInvoice {
            supplier_id: supplier.id,
            number: "A-0011".to_string(),
            issued_on: issued_on(),
            lines: vec![NewInvoiceLine {
                description: "servicio".to_string(),
                material: MaterialKind::Other,
                material_key: None,
                quantity: Quantity::from_units(1),
                unit_price: Cents::new(11_000_00),
            }],
            notes: None,
            occurred_at: Utc::now(),
        })
        .await
        .unwrap();

    // Tax column still correct, total collapsed to the subtotal.
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "UPDATE invoices SET total_cents = subtotal_cents WHERE id = ?",
        vec![invoice.id.to_string().into()],
    ))
    .await
    .unwrap();

    let report = engine.repair_invoice_tax().await.unwrap();
    assert_eq!(report.corrected, 1);
    assert_eq!(report.net_delta, Cents::new(2310_00));

    let repaired = engine.invoice(invoice.id).await.unwrap();
    assert_eq!(repaired.tax, Cents::new(2310_00));
    assert_eq!(repaired.total, Cents::new(13_310_00));
}

#[tokio::test]
async fn tax_repair_tolerates_one_currency_unit_of_drift() {
    let (engine, db) = engine_with_db().await;
    let supplier = seed_supplier(&engine).await;

    let invoice = engine
        .record_invoice(RecordInvoice {
            supplier_id: supplier.id,
            number: "A-0008".to_string(),
            issued_on: issued_on(),
            lines: vec![NewInvoiceLine {
                description: "servicio".to_string(),
                material: MaterialKind::Other,
                material_key: None,
                quantity: Quantity::from_units(1),
                unit_price: Cents::new(1000_00),
            }],
            notes: None,
            occurred_at: Utc::now(),
        })
        .await
        .unwrap();

    // Off by exactly one unit (100 cents): inside the tolerance, left alone.
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "UPDATE invoices SET tax_cents = tax_cents - 100 WHERE id = ?",
        vec![invoice.id.to_string().into()],
    ))
    .await
    .unwrap();

    let report = engine.repair_invoice_tax().await.unwrap();
    assert_eq!(report.corrected, 0);

    let untouched = engine.invoice(invoice.id).await.unwrap();
    assert_eq!(untouched.tax, Cents::new(209_00));
}

#[tokio::test]
async fn tax_repair_skips_negative_subtotals() {
    let (engine, db) = engine_with_db().await;
    let supplier = seed_supplier(&engine).await;

    let invoice = engine
        .record_invoice(RecordInvoice {
            supplier_id: supplier.id,
            number: "A-0009".to_string(),
            issued_on: issued_on(),
            lines: vec![NewInvoiceLine {
                description: "servicio".to_string(),
                material: MaterialKind::Other,
                material_key: None,
                quantity: Quantity::from_units(1),
                unit_price: Cents::new(1000_00),
            }],
            notes: None,
            occurred_at: Utc::now(),
        })
        .await
        .unwrap();

    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "UPDATE invoices SET subtotal_cents = -500 WHERE id = ?",
        vec![invoice.id.to_string().into()],
    ))
    .await
    .unwrap();

    let report = engine.repair_invoice_tax().await.unwrap();
    assert_eq!(report.corrected, 0);
    assert_eq!(report.skipped, 1);
}

#[tokio::test]
async fn invoice_for_unknown_supplier_is_rejected() {
    let (engine, _db) = engine_with_db().await;

    let result = engine
        .record_invoice(RecordInvoice {
            supplier_id: uuid::Uuid::new_v4(),
            number: "A-0010".to_string(),
            issued_on: issued_on(),
            lines: vec![NewInvoiceLine {
                description: "servicio".to_string(),
                material: MaterialKind::Other,
                material_key: None,
                quantity: Quantity::from_units(1),
                unit_price: Cents::new(100),
            }],
            notes: None,
            occurred_at: Utc::now(),
        })
        .await;
    assert!(matches!(result, Err(EngineError::NotFound(_))));
}
