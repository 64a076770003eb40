//! # Repository Module
//!
//! Database repository implementations for Dukaan POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Command (apps/dukaan)                                                 │
//! │       │                                                                 │
//! │       │  ctx.db.sales().record_sale(&request)                          │
//! │       ▼                                                                 │
//! │  SaleRepository          ProductRepository      ReportRepository       │
//! │  ├── record_sale         ├── add / update       ├── dashboard          │
//! │  ├── get_by_id           ├── delete             ├── invoices           │
//! │  └── get_items           ├── list / facets      ├── gst_summary        │
//! │                          └── bulk_import        └── export_rows        │
//! │       │                                                                 │
//! │       │  SQL (runtime-checked, no compile-time database needed)        │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalogue CRUD, import, barcodes
//! - [`SaleRepository`](sale::SaleRepository) - The sale engine
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Daily invoice numbering
//! - [`SettingsRepository`](settings::SettingsRepository) - Store profile
//! - [`ReportRepository`](report::ReportRepository) - Read-only aggregates
//! - [`BackupRepository`](backup::BackupRepository) - Full dump and restore

pub mod backup;
pub mod invoice;
pub mod product;
pub mod report;
pub mod sale;
pub mod settings;

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::DbResult;

/// Opens a transaction that takes the database write lock up front.
///
/// A deferred `BEGIN` whose first statement is a read fails with
/// `SQLITE_BUSY` instead of waiting when another connection commits first.
/// `BEGIN IMMEDIATE` waits on `busy_timeout` instead, so concurrent writers
/// queue up.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Trimmed value of an optional text field, `None` when blank.
pub(crate) fn supplied(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
