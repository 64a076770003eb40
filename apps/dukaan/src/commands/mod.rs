//! # Commands Module
//!
//! Every operation the UI layer can invoke. Each command takes the
//! [`AppContext`](crate::state::AppContext) plus typed request values.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (exports, read fallback)
//! ├── sale.rs      ◄─── record_sale
//! ├── invoice.rs   ◄─── invoice numbers, invoice list and details
//! ├── product.rs   ◄─── catalogue CRUD, barcode, bulk import
//! ├── report.rs    ◄─── dashboard, GST summary, export rows
//! ├── settings.rs  ◄─── store profile, label printer, config
//! ├── backup.rs    ◄─── full dump export/import
//! └── database.rs  ◄─── path resolution info, legacy migration
//! ```
//!
//! ## Result Shapes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Write commands   → Result<T, ApiError>                                │
//! │                     failure carries a displayable message              │
//! │                                                                         │
//! │  Read commands    → T                                                  │
//! │                     failure is logged and T::default() returned, so    │
//! │                     a report view shows "no data" instead of failing   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod backup;
pub mod database;
pub mod invoice;
pub mod product;
pub mod report;
pub mod sale;
pub mod settings;

use dukaan_db::DbResult;
use tracing::error;

/// Unwraps a read result, logging the failure and falling back to empty.
pub(crate) fn or_empty<T: Default>(command: &str, result: DbResult<T>) -> T {
    result.unwrap_or_else(|e| {
        error!(command, error = %e, "Read command failed, returning empty result");
        T::default()
    })
}
