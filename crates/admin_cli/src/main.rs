use std::error::Error;

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use sea_orm::{Database, DatabaseConnection};

use engine::{
    Cents, CheckStatus, CreateSale, Engine, MaterialKind, MovementKind, MovementListFilter,
    MovementMeta, NewCheck, NewClient, NewInvoiceLine, NewSupplier, PaymentMethod, Presentation,
    Quantity, RecordInvoice, StockLedgerKind,
};
use migration::MigratorTrait;
use uuid::Uuid;

mod settings;

#[derive(Parser, Debug)]
#[command(name = "urdimbre_admin")]
#[command(about = "Admin utilities for the Urdimbre ledger (stock, sales, suppliers, checks)")]
struct Cli {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,

    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Client(Client),
    Supplier(Supplier),
    Stock(Stock),
    Sale(Sale),
    Invoice(Invoice),
    Check(Check),
}

#[derive(Args, Debug)]
struct Client {
    #[command(subcommand)]
    command: ClientCommand,
}

#[derive(Subcommand, Debug)]
enum ClientCommand {
    Create(ClientCreateArgs),
    Show { id: Uuid },
    /// Grant prepaid credit to a client.
    Credit { id: Uuid, amount: Cents },
}

#[derive(Args, Debug)]
struct ClientCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    cuit: String,
    #[arg(long)]
    company: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    phone: Option<String>,
}

#[derive(Args, Debug)]
struct Supplier {
    #[command(subcommand)]
    command: SupplierCommand,
}

#[derive(Subcommand, Debug)]
enum SupplierCommand {
    Create(SupplierCreateArgs),
    /// Invoiced/paid/outstanding rollup for one supplier.
    Balance { id: Uuid },
}

#[derive(Args, Debug)]
struct SupplierCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    cuit: String,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    phone: Option<String>,
}

#[derive(Args, Debug)]
struct Stock {
    #[command(subcommand)]
    command: StockCommand,
}

#[derive(Subcommand, Debug)]
enum StockCommand {
    /// Record an inbound movement by hand.
    In(StockMoveArgs),
    /// Record an outbound movement by hand.
    Out(StockMoveArgs),
    /// Record a production consumption by hand.
    Consume(StockMoveArgs),
    /// Show all balances of one ledger.
    Show {
        #[arg(long, value_parser = parse_ledger)]
        ledger: StockLedgerKind,
    },
    /// Throughput and trend for one ledger key.
    Velocity {
        #[arg(long, value_parser = parse_ledger)]
        ledger: StockLedgerKind,
        #[arg(long)]
        key: String,
        #[arg(long, default_value_t = 30)]
        window_days: u32,
    },
    /// Export a ledger's movement log to CSV.
    Export {
        #[arg(long, value_parser = parse_ledger)]
        ledger: StockLedgerKind,
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        output: String,
    },
}

#[derive(Args, Debug)]
struct StockMoveArgs {
    #[arg(long, value_parser = parse_ledger)]
    ledger: StockLedgerKind,
    #[arg(long)]
    key: String,
    #[arg(long)]
    quantity: Quantity,
    #[arg(long, default_value = "manual")]
    reference: String,
}

#[derive(Args, Debug)]
struct Sale {
    #[command(subcommand)]
    command: SaleCommand,
}

#[derive(Subcommand, Debug)]
enum SaleCommand {
    Create(SaleCreateArgs),
    Show { id: Uuid },
    /// Record a payment against a sale.
    Pay(SalePayArgs),
    /// Apply the client's prepaid credit against a sale.
    Credit {
        #[arg(long)]
        client: Uuid,
        #[arg(long)]
        sale: Uuid,
        #[arg(long)]
        amount: Cents,
    },
}

#[derive(Args, Debug)]
struct SaleCreateArgs {
    #[arg(long)]
    client: Uuid,
    #[arg(long, value_parser = parse_presentation)]
    presentation: Presentation,
    #[arg(long)]
    quantity: Quantity,
    #[arg(long)]
    unit_price: Cents,
    #[arg(long)]
    lot: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args, Debug)]
struct SalePayArgs {
    #[arg(long)]
    sale: Uuid,
    #[arg(long)]
    amount: Cents,
    #[arg(long, value_parser = parse_method)]
    method: PaymentMethod,
    #[arg(long)]
    reference: Option<String>,
    /// Check settling this payment, when the method is `check`.
    #[arg(long)]
    check: Option<Uuid>,
}

#[derive(Args, Debug)]
struct Invoice {
    #[command(subcommand)]
    command: InvoiceCommand,
}

#[derive(Subcommand, Debug)]
enum InvoiceCommand {
    Record(InvoiceRecordArgs),
    Show { id: Uuid },
    /// Record a payment against an invoice.
    Pay(InvoicePayArgs),
    /// Rewrite stored tax wherever it deviates from 21% of the subtotal.
    RepairTax,
}

#[derive(Args, Debug)]
struct InvoiceRecordArgs {
    #[arg(long)]
    supplier: Uuid,
    #[arg(long)]
    number: String,
    #[arg(long)]
    issued_on: NaiveDate,
    /// Line item, `description|material|quantity|unit_price[|ledger key]`.
    /// Repeat for multiple lines.
    #[arg(long = "line", value_parser = parse_invoice_line, required = true)]
    lines: Vec<NewInvoiceLine>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args, Debug)]
struct InvoicePayArgs {
    #[arg(long)]
    invoice: Uuid,
    #[arg(long)]
    amount: Cents,
    #[arg(long, value_parser = parse_method)]
    method: PaymentMethod,
    #[arg(long)]
    reference: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args, Debug)]
struct Check {
    #[command(subcommand)]
    command: CheckCommand,
}

#[derive(Subcommand, Debug)]
enum CheckCommand {
    Create(CheckCreateArgs),
    Show { id: Uuid },
    /// Move a check to a new status.
    Status {
        id: Uuid,
        #[arg(long, value_parser = parse_check_status)]
        status: CheckStatus,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Hand a check over to a third party.
    Deliver {
        id: Uuid,
        #[arg(long)]
        to: String,
        #[arg(long)]
        on: NaiveDate,
        #[arg(long = "for")]
        purpose: Option<String>,
        #[arg(long)]
        invoice: Option<Uuid>,
    },
    Delete { id: Uuid },
    /// Pending checks due within the next N days.
    Due {
        #[arg(long, default_value_t = 7)]
        within_days: u32,
    },
}

#[derive(Args, Debug)]
struct CheckCreateArgs {
    #[arg(long)]
    number: String,
    #[arg(long)]
    amount: Cents,
    #[arg(long)]
    electronic: bool,
    #[arg(long)]
    received_on: NaiveDate,
    #[arg(long)]
    due_on: NaiveDate,
    #[arg(long)]
    received_from: String,
    #[arg(long)]
    issued_by: String,
    #[arg(long)]
    notes: Option<String>,
}

fn parse_ledger(raw: &str) -> Result<StockLedgerKind, String> {
    StockLedgerKind::try_from(raw).map_err(|err| err.to_string())
}

fn parse_presentation(raw: &str) -> Result<Presentation, String> {
    Presentation::try_from(raw).map_err(|err| err.to_string())
}

fn parse_method(raw: &str) -> Result<PaymentMethod, String> {
    PaymentMethod::try_from(raw).map_err(|err| err.to_string())
}

fn parse_check_status(raw: &str) -> Result<CheckStatus, String> {
    CheckStatus::try_from(raw).map_err(|err| err.to_string())
}

fn parse_material(raw: &str) -> Result<MaterialKind, String> {
    MaterialKind::try_from(raw).map_err(|err| err.to_string())
}

fn parse_invoice_line(raw: &str) -> Result<NewInvoiceLine, String> {
    let parts: Vec<&str> = raw.split('|').collect();
    if parts.len() < 4 || parts.len() > 5 {
        return Err(
            "expected description|material|quantity|unit_price[|ledger key]".to_string(),
        );
    }
    Ok(NewInvoiceLine {
        description: parts[0].to_string(),
        material: parse_material(parts[1])?,
        material_key: parts.get(4).map(|key| (*key).to_string()),
        quantity: parts[2].parse().map_err(|err: engine::EngineError| err.to_string())?,
        unit_price: parts[3].parse().map_err(|err: engine::EngineError| err.to_string())?,
    })
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

async fn export_movements(
    engine: &Engine,
    ledger: StockLedgerKind,
    key: Option<&str>,
    output: &str,
) -> Result<u64, Box<dyn Error + Send + Sync>> {
    let mut writer = csv::Writer::from_path(output)?;
    writer.write_record([
        "id",
        "ledger",
        "key",
        "kind",
        "quantity",
        "occurred_at",
        "reference",
        "counterparty",
    ])?;

    let mut written = 0u64;
    let mut cursor: Option<String> = None;
    loop {
        let (page, next) = engine
            .list_movements(
                ledger,
                key,
                500,
                cursor.as_deref(),
                &MovementListFilter::default(),
            )
            .await?;
        for movement in &page {
            writer.write_record([
                movement.id.to_string(),
                movement.ledger.as_str().to_string(),
                movement.key.clone(),
                movement.kind.as_str().to_string(),
                movement.quantity.to_string(),
                movement.occurred_at.to_rfc3339(),
                movement.reference.clone(),
                movement.counterparty.clone().unwrap_or_default(),
            ])?;
            written += 1;
        }
        match next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    writer.flush()?;
    Ok(written)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let mut settings = settings::load(cli.config.as_deref())?;
    if let Some(database_url) = cli.database_url {
        settings.database_url = database_url;
    }

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "urdimbre_admin={level},engine={level}",
            level = settings.level
        ))
        .init();

    let db = connect_db(&settings.database_url).await?;
    let engine = Engine::builder().database(db.clone()).build().await?;

    match cli.command {
        Command::Client(Client { command }) => match command {
            ClientCommand::Create(args) => {
                let client = engine
                    .new_client(
                        NewClient {
                            name: args.name,
                            company: args.company,
                            cuit: args.cuit,
                            address: args.address,
                            phone: args.phone,
                        },
                        Utc::now(),
                    )
                    .await?;
                println!("created client: {} ({})", client.name, client.id);
            }
            ClientCommand::Show { id } => {
                let client = engine.client(id).await?;
                println!(
                    "{} cuit={} credit={}",
                    client.name, client.cuit, client.credit_balance
                );
            }
            ClientCommand::Credit { id, amount } => {
                let client = engine.grant_credit(id, amount).await?;
                println!("credit balance: {}", client.credit_balance);
            }
        },
        Command::Supplier(Supplier { command }) => match command {
            SupplierCommand::Create(args) => {
                let supplier = engine
                    .new_supplier(
                        NewSupplier {
                            name: args.name,
                            cuit: args.cuit,
                            address: args.address,
                            phone: args.phone,
                        },
                        Utc::now(),
                    )
                    .await?;
                println!("created supplier: {} ({})", supplier.name, supplier.id);
            }
            SupplierCommand::Balance { id } => {
                let balance = engine.supplier_balance(id).await?;
                println!(
                    "invoiced={} paid={} outstanding={}",
                    balance.invoiced, balance.paid, balance.outstanding
                );
            }
        },
        Command::Stock(Stock { command }) => match command {
            StockCommand::In(args) => {
                let balance = engine
                    .apply_movement(
                        args.ledger,
                        &args.key,
                        MovementKind::Inbound,
                        args.quantity,
                        MovementMeta::manual(&args.reference, Utc::now()),
                    )
                    .await?;
                println!("{} {} = {}", balance.ledger.as_str(), balance.key, balance.quantity);
            }
            StockCommand::Out(args) => {
                let balance = engine
                    .apply_movement(
                        args.ledger,
                        &args.key,
                        MovementKind::Outbound,
                        args.quantity,
                        MovementMeta::manual(&args.reference, Utc::now()),
                    )
                    .await?;
                println!("{} {} = {}", balance.ledger.as_str(), balance.key, balance.quantity);
            }
            StockCommand::Consume(args) => {
                let balance = engine
                    .apply_movement(
                        args.ledger,
                        &args.key,
                        MovementKind::Consumption,
                        args.quantity,
                        MovementMeta::manual(&args.reference, Utc::now()),
                    )
                    .await?;
                println!("{} {} = {}", balance.ledger.as_str(), balance.key, balance.quantity);
            }
            StockCommand::Show { ledger } => {
                for balance in engine.stock_balances(ledger).await? {
                    println!("{} = {}", balance.key, balance.quantity);
                }
            }
            StockCommand::Velocity {
                ledger,
                key,
                window_days,
            } => {
                let velocity = engine
                    .ledger_velocity(ledger, &key, window_days, Utc::now())
                    .await?;
                println!(
                    "in={} out={} throughput={:.1}/day trend={}",
                    velocity.inbound,
                    velocity.outbound,
                    velocity.throughput_per_day,
                    velocity.trend.as_str()
                );
            }
            StockCommand::Export {
                ledger,
                key,
                output,
            } => {
                let written = export_movements(&engine, ledger, key.as_deref(), &output).await?;
                println!("exported {written} movements to {output}");
            }
        },
        Command::Sale(Sale { command }) => match command {
            SaleCommand::Create(args) => {
                let sale = engine
                    .create_sale(CreateSale {
                        client_id: args.client,
                        presentation: args.presentation,
                        quantity: args.quantity,
                        unit_price: args.unit_price,
                        lot: args.lot,
                        notes: args.notes,
                        occurred_at: Utc::now(),
                    })
                    .await?;
                println!("created sale: {} total={}", sale.id, sale.total);
            }
            SaleCommand::Show { id } => {
                let statement = engine.sale(id).await?;
                println!(
                    "total={} paid={} remaining={} surplus={} status={}",
                    statement.sale.total,
                    statement.total_paid,
                    statement.remaining,
                    statement.surplus,
                    statement.sale.status.as_str()
                );
            }
            SaleCommand::Pay(args) => {
                engine
                    .record_sale_payment(
                        args.sale,
                        args.amount,
                        args.method,
                        args.reference.as_deref(),
                        args.check,
                        Utc::now(),
                    )
                    .await?;
                let statement = engine.sale(args.sale).await?;
                println!(
                    "paid={} remaining={} status={}",
                    statement.total_paid,
                    statement.remaining,
                    statement.sale.status.as_str()
                );
            }
            SaleCommand::Credit {
                client,
                sale,
                amount,
            } => {
                let payment = engine.apply_credit(client, sale, amount, Utc::now()).await?;
                println!("applied {} from credit balance", payment.amount);
            }
        },
        Command::Invoice(Invoice { command }) => match command {
            InvoiceCommand::Record(args) => {
                let invoice = engine
                    .record_invoice(RecordInvoice {
                        supplier_id: args.supplier,
                        number: args.number,
                        issued_on: args.issued_on,
                        lines: args.lines,
                        notes: args.notes,
                        occurred_at: Utc::now(),
                    })
                    .await?;
                println!(
                    "recorded invoice {}: subtotal={} tax={} total={}",
                    invoice.number, invoice.subtotal, invoice.tax, invoice.total
                );
            }
            InvoiceCommand::Show { id } => {
                let invoice = engine.invoice(id).await?;
                println!(
                    "{} issued={} subtotal={} tax={} total={} status={}",
                    invoice.number,
                    invoice.issued_on,
                    invoice.subtotal,
                    invoice.tax,
                    invoice.total,
                    invoice.status.as_str()
                );
            }
            InvoiceCommand::Pay(args) => {
                engine
                    .record_supplier_payment(
                        args.invoice,
                        args.amount,
                        args.method,
                        args.reference.as_deref(),
                        args.notes.as_deref(),
                        Utc::now(),
                    )
                    .await?;
                let invoice = engine.invoice(args.invoice).await?;
                println!("status={}", invoice.status.as_str());
            }
            InvoiceCommand::RepairTax => {
                let report = engine.repair_invoice_tax().await?;
                println!(
                    "corrected={} skipped={} net_delta={}",
                    report.corrected, report.skipped, report.net_delta
                );
            }
        },
        Command::Check(Check { command }) => match command {
            CheckCommand::Create(args) => {
                let check = engine
                    .create_check(NewCheck {
                        check_number: args.number,
                        amount: args.amount,
                        electronic: args.electronic,
                        received_on: args.received_on,
                        due_on: args.due_on,
                        received_from: args.received_from,
                        issued_by: args.issued_by,
                        notes: args.notes,
                    })
                    .await?;
                println!("created check {} ({})", check.check_number, check.id);
            }
            CheckCommand::Show { id } => {
                let check = engine.check(id, Utc::now().date_naive()).await?;
                println!(
                    "{} amount={} due={} status={}",
                    check.check_number,
                    check.amount,
                    check.due_on,
                    check.status.as_str()
                );
            }
            CheckCommand::Status { id, status, notes } => {
                let check = engine
                    .update_check_status(id, status, notes.as_deref(), Utc::now().date_naive())
                    .await?;
                println!("{} -> {}", check.check_number, check.status.as_str());
            }
            CheckCommand::Deliver {
                id,
                to,
                on,
                purpose,
                invoice,
            } => {
                let check = engine
                    .deliver_check(
                        id,
                        &to,
                        on,
                        purpose.as_deref(),
                        invoice,
                        Utc::now().date_naive(),
                    )
                    .await?;
                println!("delivered {} to {}", check.check_number, to);
            }
            CheckCommand::Delete { id } => {
                engine.delete_check(id, Utc::now().date_naive()).await?;
                println!("deleted check {id}");
            }
            CheckCommand::Due { within_days } => {
                for check in engine.checks_due(within_days, Utc::now().date_naive()).await? {
                    println!(
                        "{} due={} amount={} from={}",
                        check.check_number, check.due_on, check.amount, check.received_from
                    );
                }
            }
        },
    }

    Ok(())
}
