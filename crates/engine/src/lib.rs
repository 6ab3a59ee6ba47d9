//! Ledger & settlement engine for a small factory.
//!
//! The engine keeps four things mutually consistent as independent callers
//! race on the same keys:
//!
//! - three stock ledgers (finished product, raw-material rolls, supplies)
//!   that never go negative and reconcile exactly with their append-only
//!   movement logs;
//! - sale settlement: payment status and client credit balances derived from
//!   an append-only payment log;
//! - supplier settlement: invoice status from payments, with 21% VAT
//!   computed at record time and repairable in batch;
//! - the check lifecycle state machine with read-time expiry normalization.
//!
//! All operations go through [`Engine`], a stateless handle over a database
//! connection. Compound operations run inside a single database transaction.

pub use checks::{Check, CheckStatus};
pub use clients::Client;
pub use error::EngineError;
pub use invoice_lines::{InvoiceLine, MaterialKind};
pub use invoices::Invoice;
pub use money::Cents;
pub use movements::{Movement, MovementKind};
pub use ops::{
    CreateSale, Engine, EngineBuilder, LedgerVelocity, MovementListFilter, MovementMeta, NewCheck,
    NewClient, NewInvoiceLine, NewSupplier, RecordInvoice, SaleStatement, SupplierBalance,
    TaxRepairReport, Trend,
};
pub use payments::{Payment, PaymentMethod};
pub use quantity::Quantity;
pub use sales::{Sale, SettlementStatus};
pub use stock_balances::{Presentation, StockBalance, StockLedgerKind};
pub use supplier_payments::SupplierPayment;
pub use suppliers::Supplier;

mod checks;
mod clients;
mod error;
mod invoice_lines;
mod invoices;
mod money;
mod movements;
mod ops;
mod payments;
mod quantity;
mod sales;
mod stock_balances;
mod supplier_payments;
mod suppliers;

type ResultEngine<T> = Result<T, EngineError>;
