//! Initial schema migration - creates all tables from scratch.
//!
//! Complete schema for the ledger & settlement engine:
//!
//! - `clients` / `suppliers`: counterparties, keyed by normalized CUIT
//! - `stock_balances`: current quantity per (ledger, key)
//! - `movements`: append-only quantity change log
//! - `sales` / `payments`: sale settlement
//! - `invoices` / `invoice_lines` / `supplier_payments`: supplier settlement
//! - `checks`: received check lifecycle

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Clients {
    Table,
    Id,
    Name,
    Company,
    Cuit,
    Address,
    Phone,
    CreditBalanceCents,
    CreatedAt,
}

#[derive(Iden)]
enum Suppliers {
    Table,
    Id,
    Name,
    Cuit,
    Address,
    Phone,
    CreatedAt,
}

#[derive(Iden)]
enum StockBalances {
    Table,
    Ledger,
    Key,
    QuantityTenths,
    LastSupplierId,
    LastInvoiceNumber,
    UpdatedAt,
}

#[derive(Iden)]
enum Movements {
    Table,
    Id,
    Ledger,
    Key,
    Kind,
    QuantityTenths,
    OccurredAt,
    Reference,
    Counterparty,
}

#[derive(Iden)]
enum Sales {
    Table,
    Id,
    ClientId,
    Presentation,
    QuantityTenths,
    UnitPriceCents,
    TotalCents,
    Lot,
    Notes,
    Status,
    CreatedAt,
}

#[derive(Iden)]
enum Payments {
    Table,
    Id,
    SaleId,
    AmountCents,
    Method,
    Reference,
    CheckId,
    PaidAt,
}

#[derive(Iden)]
enum Invoices {
    Table,
    Id,
    SupplierId,
    Number,
    IssuedOn,
    SubtotalCents,
    TaxCents,
    TotalCents,
    Status,
    Notes,
    CreatedAt,
}

#[derive(Iden)]
enum InvoiceLines {
    Table,
    Id,
    InvoiceId,
    Description,
    Material,
    MaterialKey,
    QuantityTenths,
    UnitPriceCents,
    TotalCents,
}

#[derive(Iden)]
enum SupplierPayments {
    Table,
    Id,
    InvoiceId,
    AmountCents,
    Method,
    Reference,
    Notes,
    PaidAt,
}

#[derive(Iden)]
enum Checks {
    Table,
    Id,
    CheckNumber,
    AmountCents,
    Electronic,
    ReceivedOn,
    DueOn,
    ReceivedFrom,
    IssuedBy,
    Status,
    Notes,
    SalePaymentId,
    SupplierPaymentId,
    DeliveredTo,
    DeliveredOn,
    DeliveredFor,
    DeliveredInvoiceId,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Clients
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Clients::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Clients::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Clients::Name).string().not_null())
                    .col(ColumnDef::new(Clients::Company).string())
                    .col(ColumnDef::new(Clients::Cuit).string().not_null())
                    .col(ColumnDef::new(Clients::Address).string())
                    .col(ColumnDef::new(Clients::Phone).string())
                    .col(
                        ColumnDef::new(Clients::CreditBalanceCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Clients::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-clients-cuit-unique")
                    .table(Clients::Table)
                    .col(Clients::Cuit)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Suppliers
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Suppliers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Suppliers::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Suppliers::Name).string().not_null())
                    .col(ColumnDef::new(Suppliers::Cuit).string().not_null())
                    .col(ColumnDef::new(Suppliers::Address).string())
                    .col(ColumnDef::new(Suppliers::Phone).string())
                    .col(ColumnDef::new(Suppliers::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-suppliers-cuit-unique")
                    .table(Suppliers::Table)
                    .col(Suppliers::Cuit)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Stock Balances
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(StockBalances::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(StockBalances::Ledger).string().not_null())
                    .col(ColumnDef::new(StockBalances::Key).string().not_null())
                    .col(
                        ColumnDef::new(StockBalances::QuantityTenths)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(StockBalances::LastSupplierId).string())
                    .col(ColumnDef::new(StockBalances::LastInvoiceNumber).string())
                    .col(
                        ColumnDef::new(StockBalances::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(StockBalances::Ledger)
                            .col(StockBalances::Key),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Movements
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Movements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Movements::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Movements::Ledger).string().not_null())
                    .col(ColumnDef::new(Movements::Key).string().not_null())
                    .col(ColumnDef::new(Movements::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Movements::QuantityTenths)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Movements::OccurredAt).timestamp().not_null())
                    .col(ColumnDef::new(Movements::Reference).string().not_null())
                    .col(ColumnDef::new(Movements::Counterparty).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-movements-ledger-key-occurred_at")
                    .table(Movements::Table)
                    .col(Movements::Ledger)
                    .col(Movements::Key)
                    .col(Movements::OccurredAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-movements-occurred_at")
                    .table(Movements::Table)
                    .col(Movements::OccurredAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Sales
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Sales::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sales::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Sales::ClientId).string().not_null())
                    .col(ColumnDef::new(Sales::Presentation).string().not_null())
                    .col(
                        ColumnDef::new(Sales::QuantityTenths)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sales::UnitPriceCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Sales::TotalCents).big_integer().not_null())
                    .col(ColumnDef::new(Sales::Lot).string())
                    .col(ColumnDef::new(Sales::Notes).string())
                    .col(ColumnDef::new(Sales::Status).string().not_null())
                    .col(ColumnDef::new(Sales::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sales-client_id")
                            .from(Sales::Table, Sales::ClientId)
                            .to(Clients::Table, Clients::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-sales-lot-unique")
                    .table(Sales::Table)
                    .col(Sales::Lot)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-sales-client_id")
                    .table(Sales::Table)
                    .col(Sales::ClientId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Payments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Payments::SaleId).string().not_null())
                    .col(ColumnDef::new(Payments::AmountCents).big_integer().not_null())
                    .col(ColumnDef::new(Payments::Method).string().not_null())
                    .col(ColumnDef::new(Payments::Reference).string())
                    .col(ColumnDef::new(Payments::CheckId).string())
                    .col(ColumnDef::new(Payments::PaidAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-sale_id")
                            .from(Payments::Table, Payments::SaleId)
                            .to(Sales::Table, Sales::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payments-sale_id")
                    .table(Payments::Table)
                    .col(Payments::SaleId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Invoices
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Invoices::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Invoices::SupplierId).string().not_null())
                    .col(ColumnDef::new(Invoices::Number).string().not_null())
                    .col(ColumnDef::new(Invoices::IssuedOn).date().not_null())
                    .col(
                        ColumnDef::new(Invoices::SubtotalCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Invoices::TaxCents).big_integer().not_null())
                    .col(ColumnDef::new(Invoices::TotalCents).big_integer().not_null())
                    .col(ColumnDef::new(Invoices::Status).string().not_null())
                    .col(ColumnDef::new(Invoices::Notes).string())
                    .col(ColumnDef::new(Invoices::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-invoices-supplier_id")
                            .from(Invoices::Table, Invoices::SupplierId)
                            .to(Suppliers::Table, Suppliers::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invoices-supplier_id")
                    .table(Invoices::Table)
                    .col(Invoices::SupplierId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. Invoice Lines
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(InvoiceLines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InvoiceLines::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(InvoiceLines::InvoiceId).string().not_null())
                    .col(
                        ColumnDef::new(InvoiceLines::Description)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InvoiceLines::Material).string().not_null())
                    .col(ColumnDef::new(InvoiceLines::MaterialKey).string())
                    .col(
                        ColumnDef::new(InvoiceLines::QuantityTenths)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvoiceLines::UnitPriceCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvoiceLines::TotalCents)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-invoice_lines-invoice_id")
                            .from(InvoiceLines::Table, InvoiceLines::InvoiceId)
                            .to(Invoices::Table, Invoices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invoice_lines-invoice_id")
                    .table(InvoiceLines::Table)
                    .col(InvoiceLines::InvoiceId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 9. Supplier Payments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SupplierPayments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SupplierPayments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SupplierPayments::InvoiceId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SupplierPayments::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SupplierPayments::Method).string().not_null())
                    .col(ColumnDef::new(SupplierPayments::Reference).string())
                    .col(ColumnDef::new(SupplierPayments::Notes).string())
                    .col(
                        ColumnDef::new(SupplierPayments::PaidAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-supplier_payments-invoice_id")
                            .from(SupplierPayments::Table, SupplierPayments::InvoiceId)
                            .to(Invoices::Table, Invoices::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-supplier_payments-invoice_id")
                    .table(SupplierPayments::Table)
                    .col(SupplierPayments::InvoiceId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 10. Checks
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Checks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Checks::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Checks::CheckNumber).string().not_null())
                    .col(ColumnDef::new(Checks::AmountCents).big_integer().not_null())
                    .col(ColumnDef::new(Checks::Electronic).boolean().not_null())
                    .col(ColumnDef::new(Checks::ReceivedOn).date().not_null())
                    .col(ColumnDef::new(Checks::DueOn).date().not_null())
                    .col(ColumnDef::new(Checks::ReceivedFrom).string().not_null())
                    .col(ColumnDef::new(Checks::IssuedBy).string().not_null())
                    .col(ColumnDef::new(Checks::Status).string().not_null())
                    .col(ColumnDef::new(Checks::Notes).string())
                    .col(ColumnDef::new(Checks::SalePaymentId).string())
                    .col(ColumnDef::new(Checks::SupplierPaymentId).string())
                    .col(ColumnDef::new(Checks::DeliveredTo).string())
                    .col(ColumnDef::new(Checks::DeliveredOn).date())
                    .col(ColumnDef::new(Checks::DeliveredFor).string())
                    .col(ColumnDef::new(Checks::DeliveredInvoiceId).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-checks-check_number-unique")
                    .table(Checks::Table)
                    .col(Checks::CheckNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-checks-status-due_on")
                    .table(Checks::Table)
                    .col(Checks::Status)
                    .col(Checks::DueOn)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(Checks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SupplierPayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InvoiceLines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sales::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Movements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StockBalances::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Suppliers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Clients::Table).to_owned())
            .await?;
        Ok(())
    }
}
