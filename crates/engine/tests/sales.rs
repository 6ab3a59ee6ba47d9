use chrono::Utc;
use sea_orm::{Database, DatabaseConnection};

use engine::{
    Cents, Client, CreateSale, Engine, EngineError, MovementKind, MovementListFilter,
    MovementMeta, NewClient, PaymentMethod, Presentation, Quantity, SettlementStatus,
    StockLedgerKind,
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

async fn seed_client(engine: &Engine, name: &str, cuit: &str) -> Client {
    engine
        .new_client(
            NewClient {
                name: name.to_string(),
                company: None,
                cuit: cuit.to_string(),
                address: None,
                phone: None,
            },
            Utc::now(),
        )
        .await
        .unwrap()
}

async fn seed_stock(engine: &Engine, presentation: Presentation, units: i64) {
    engine
        .apply_movement(
            StockLedgerKind::Product,
            presentation.as_str(),
            MovementKind::Inbound,
            Quantity::from_units(units),
            MovementMeta::manual("production", Utc::now()),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn create_sale_decrements_stock_and_logs_the_movement() {
    let (engine, _db) = engine_with_db().await;
    let client = seed_client(&engine, "Alicia", "20-12345678-9").await;
    seed_stock(&engine, Presentation::Granel, 100).await;

    let sale = engine
        .create_sale(CreateSale {
            client_id: client.id,
            presentation: Presentation::Granel,
            quantity: Quantity::from_units(40),
            unit_price: Cents::new(25_00),
            lot: Some("L-001".to_string()),
            notes: None,
            occurred_at: Utc::now(),
        })
        .await
        .unwrap();
    assert_eq!(sale.total, Cents::new(1000_00));
    assert_eq!(sale.status, SettlementStatus::Pending);

    let balance = engine
        .stock_balance(StockLedgerKind::Product, "granel")
        .await
        .unwrap();
    assert_eq!(balance.quantity, Quantity::from_units(60));

    let (movements, _) = engine
        .list_movements(
            StockLedgerKind::Product,
            Some("granel"),
            10,
            None,
            &MovementListFilter::default(),
        )
        .await
        .unwrap();
    let outbound = movements
        .iter()
        .find(|m| m.kind == MovementKind::Outbound)
        .unwrap();
    assert_eq!(outbound.reference, format!("sale:{}", sale.id));
    assert_eq!(outbound.counterparty.as_deref(), Some("Alicia"));
}

#[tokio::test]
async fn short_stock_rolls_back_the_whole_sale() {
    let (engine, _db) = engine_with_db().await;
    let client = seed_client(&engine, "Alicia", "20-12345678-9").await;
    seed_stock(&engine, Presentation::Granel, 500).await;

    let result = engine
        .create_sale(CreateSale {
            client_id: client.id,
            presentation: Presentation::Granel,
            quantity: Quantity::from_units(600),
            unit_price: Cents::new(25_00),
            lot: None,
            notes: None,
            occurred_at: Utc::now(),
        })
        .await;
    assert_eq!(
        result.unwrap_err(),
        EngineError::InsufficientStock {
            available: Quantity::from_units(500)
        }
    );

    // Neither the sale nor its movement survive the rollback.
    let balance = engine
        .stock_balance(StockLedgerKind::Product, "granel")
        .await
        .unwrap();
    assert_eq!(balance.quantity, Quantity::from_units(500));
    let (movements, _) = engine
        .list_movements(
            StockLedgerKind::Product,
            Some("granel"),
            10,
            None,
            &MovementListFilter::default(),
        )
        .await
        .unwrap();
    assert_eq!(movements.len(), 1);
}

#[tokio::test]
async fn payments_walk_the_sale_through_pending_partial_paid() {
    let (engine, _db) = engine_with_db().await;
    let client = seed_client(&engine, "Alicia", "20-12345678-9").await;
    seed_stock(&engine, Presentation::Kilo, 200).await;

    let sale = engine
        .create_sale(CreateSale {
            client_id: client.id,
            presentation: Presentation::Kilo,
            quantity: Quantity::from_units(100),
            unit_price: Cents::new(100_00),
            lot: None,
            notes: None,
            occurred_at: Utc::now(),
        })
        .await
        .unwrap();
    assert_eq!(sale.total, Cents::new(10_000_00));

    engine
        .record_sale_payment(
            sale.id,
            Cents::new(4000_00),
            PaymentMethod::Cash,
            None,
            None,
            Utc::now(),
        )
        .await
        .unwrap();
    let statement = engine.sale(sale.id).await.unwrap();
    assert_eq!(statement.sale.status, SettlementStatus::Partial);
    assert_eq!(statement.remaining, Cents::new(6000_00));

    engine
        .record_sale_payment(
            sale.id,
            Cents::new(6000_00),
            PaymentMethod::Transfer,
            Some("transfer #991"),
            None,
            Utc::now(),
        )
        .await
        .unwrap();
    let statement = engine.sale(sale.id).await.unwrap();
    assert_eq!(statement.sale.status, SettlementStatus::Paid);
    assert_eq!(statement.remaining, Cents::ZERO);
    assert_eq!(statement.surplus, Cents::ZERO);

    // One cent over: still paid, the surplus is reported, never clamped away.
    engine
        .record_sale_payment(
            sale.id,
            Cents::new(1),
            PaymentMethod::Cash,
            None,
            None,
            Utc::now(),
        )
        .await
        .unwrap();
    let statement = engine.sale(sale.id).await.unwrap();
    assert_eq!(statement.sale.status, SettlementStatus::Paid);
    assert_eq!(statement.total_paid, Cents::new(10_000_01));
    assert_eq!(statement.surplus, Cents::new(1));
}

#[tokio::test]
async fn non_positive_payment_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let client = seed_client(&engine, "Alicia", "20-12345678-9").await;
    seed_stock(&engine, Presentation::Granel, 10).await;

    let sale = engine
        .create_sale(CreateSale {
            client_id: client.id,
            presentation: Presentation::Granel,
            quantity: Quantity::from_units(1),
            unit_price: Cents::new(100),
            lot: None,
            notes: None,
            occurred_at: Utc::now(),
        })
        .await
        .unwrap();

    let result = engine
        .record_sale_payment(
            sale.id,
            Cents::ZERO,
            PaymentMethod::Cash,
            None,
            None,
            Utc::now(),
        )
        .await;
    assert!(matches!(result, Err(EngineError::InvalidAmount(_))));
}

#[tokio::test]
async fn duplicate_lot_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let client = seed_client(&engine, "Alicia", "20-12345678-9").await;
    seed_stock(&engine, Presentation::Granel, 100).await;

    let base = CreateSale {
        client_id: client.id,
        presentation: Presentation::Granel,
        quantity: Quantity::from_units(10),
        unit_price: Cents::new(25_00),
        lot: Some("L-007".to_string()),
        notes: None,
        occurred_at: Utc::now(),
    };
    engine.create_sale(base.clone()).await.unwrap();

    let result = engine.create_sale(base).await;
    assert!(matches!(result, Err(EngineError::AlreadyExists(_))));

    // The duplicate must not have touched stock.
    let balance = engine
        .stock_balance(StockLedgerKind::Product, "granel")
        .await
        .unwrap();
    assert_eq!(balance.quantity, Quantity::from_units(90));
}

#[tokio::test]
async fn duplicate_cuit_is_rejected_even_with_different_formatting() {
    let (engine, _db) = engine_with_db().await;
    seed_client(&engine, "Alicia", "20-12345678-9").await;

    let result = engine
        .new_client(
            NewClient {
                name: "Alicia otra vez".to_string(),
                company: None,
                cuit: "20123456789".to_string(),
                address: None,
                phone: None,
            },
            Utc::now(),
        )
        .await;
    assert!(matches!(result, Err(EngineError::AlreadyExists(_))));
}

#[tokio::test]
async fn credit_application_is_clamped_and_conserved() {
    let (engine, _db) = engine_with_db().await;
    let client = seed_client(&engine, "Alicia", "20-12345678-9").await;
    seed_stock(&engine, Presentation::Granel, 100).await;

    let client = engine
        .grant_credit(client.id, Cents::new(500_00))
        .await
        .unwrap();
    assert_eq!(client.credit_balance, Cents::new(500_00));

    let sale = engine
        .create_sale(CreateSale {
            client_id: client.id,
            presentation: Presentation::Granel,
            quantity: Quantity::from_units(10),
            unit_price: Cents::new(20_00),
            lot: None,
            notes: None,
            occurred_at: Utc::now(),
        })
        .await
        .unwrap();
    assert_eq!(sale.total, Cents::new(200_00));

    // Asking for 300 against a 200 sale applies only the remaining 200.
    let payment = engine
        .apply_credit(client.id, sale.id, Cents::new(300_00), Utc::now())
        .await
        .unwrap();
    assert_eq!(payment.amount, Cents::new(200_00));
    assert_eq!(payment.method, PaymentMethod::CreditBalance);

    let client = engine.client(client.id).await.unwrap();
    assert_eq!(client.credit_balance, Cents::new(300_00));
    let statement = engine.sale(sale.id).await.unwrap();
    assert_eq!(statement.sale.status, SettlementStatus::Paid);

    // The sale is settled now, further credit must be refused.
    let result = engine
        .apply_credit(client.id, sale.id, Cents::new(50_00), Utc::now())
        .await;
    assert!(matches!(result, Err(EngineError::SaleFullyPaid(_))));
}

#[tokio::test]
async fn credit_application_requires_enough_balance() {
    let (engine, _db) = engine_with_db().await;
    let client = seed_client(&engine, "Alicia", "20-12345678-9").await;
    seed_stock(&engine, Presentation::Granel, 100).await;

    engine
        .grant_credit(client.id, Cents::new(50_00))
        .await
        .unwrap();
    let sale = engine
        .create_sale(CreateSale {
            client_id: client.id,
            presentation: Presentation::Granel,
            quantity: Quantity::from_units(10),
            unit_price: Cents::new(20_00),
            lot: None,
            notes: None,
            occurred_at: Utc::now(),
        })
        .await
        .unwrap();

    let result = engine
        .apply_credit(client.id, sale.id, Cents::new(100_00), Utc::now())
        .await;
    assert!(matches!(result, Err(EngineError::InsufficientCredit(_))));

    // Nothing moved.
    let client = engine.client(client.id).await.unwrap();
    assert_eq!(client.credit_balance, Cents::new(50_00));
    let statement = engine.sale(sale.id).await.unwrap();
    assert_eq!(statement.total_paid, Cents::ZERO);
}

#[tokio::test]
async fn credit_cannot_cross_client_boundaries() {
    let (engine, _db) = engine_with_db().await;
    let alicia = seed_client(&engine, "Alicia", "20-12345678-9").await;
    let bruno = seed_client(&engine, "Bruno", "23-98765432-1").await;
    seed_stock(&engine, Presentation::Granel, 100).await;

    engine
        .grant_credit(bruno.id, Cents::new(500_00))
        .await
        .unwrap();
    let sale = engine
        .create_sale(CreateSale {
            client_id: alicia.id,
            presentation: Presentation::Granel,
            quantity: Quantity::from_units(10),
            unit_price: Cents::new(20_00),
            lot: None,
            notes: None,
            occurred_at: Utc::now(),
        })
        .await
        .unwrap();

    let result = engine
        .apply_credit(bruno.id, sale.id, Cents::new(100_00), Utc::now())
        .await;
    assert!(matches!(result, Err(EngineError::SaleNotOwnedByClient(_))));
}

#[tokio::test]
async fn grant_credit_rejects_non_positive_amounts() {
    let (engine, _db) = engine_with_db().await;
    let client = seed_client(&engine, "Alicia", "20-12345678-9").await;

    let result = engine.grant_credit(client.id, Cents::ZERO).await;
    assert!(matches!(result, Err(EngineError::InvalidAmount(_))));
    let result = engine.grant_credit(client.id, Cents::new(-100)).await;
    assert!(matches!(result, Err(EngineError::InvalidAmount(_))));
}

#[tokio::test]
async fn sale_for_unknown_client_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    seed_stock(&engine, Presentation::Granel, 100).await;

    let result = engine
        .create_sale(CreateSale {
            client_id: uuid::Uuid::new_v4(),
            presentation: Presentation::Granel,
            quantity: Quantity::from_units(10),
            unit_price: Cents::new(20_00),
            lot: None,
            notes: None,
            occurred_at: Utc::now(),
        })
        .await;
    assert!(matches!(result, Err(EngineError::NotFound(_))));
}
