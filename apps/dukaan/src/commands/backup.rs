//! # Backup Commands
//!
//! Full dump and restore. Unlike the report reads, a failed export is an
//! error: an empty backup must never pass for a real one.

use dukaan_core::FullDump;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppContext;

/// Row counts of a dump, for confirmation messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DumpCounts {
    pub products: usize,
    pub sales: usize,
    pub sale_items: usize,
}

impl From<&FullDump> for DumpCounts {
    fn from(dump: &FullDump) -> Self {
        DumpCounts {
            products: dump.products.len(),
            sales: dump.sales.len(),
            sale_items: dump.sale_items.len(),
        }
    }
}

/// Every product, sale, sale item and the store profile.
pub async fn export_full_dump(ctx: &AppContext) -> Result<FullDump, ApiError> {
    debug!("export_full_dump command");
    Ok(ctx.db().backup().export_full_dump().await?)
}

/// Replaces all products, sales and sale items with the dump's rows in one
/// transaction. On failure nothing changes.
pub async fn import_full_dump(ctx: &AppContext, dump: FullDump) -> Result<DumpCounts, ApiError> {
    debug!("import_full_dump command");
    ctx.db().backup().import_full_dump(&dump).await?;
    Ok(DumpCounts::from(&dump))
}

/// Writes a JSON backup to `path`. Returns the bytes written.
pub async fn export_backup_file(ctx: &AppContext, path: &Path) -> Result<usize, ApiError> {
    debug!(path = %path.display(), "export_backup_file command");
    Ok(ctx.db().backup().export_to_file(path).await?)
}

/// Restores the JSON backup at `path`.
pub async fn import_backup_file(ctx: &AppContext, path: &Path) -> Result<DumpCounts, ApiError> {
    debug!(path = %path.display(), "import_backup_file command");
    let dump = ctx.db().backup().import_from_file(path).await?;
    let counts = DumpCounts::from(&dump);
    info!(?counts, path = %path.display(), "Backup restored");
    Ok(counts)
}
