//! # Invoice Commands
//!
//! Invoice numbers and the invoice history views.

use dukaan_core::{InvoiceDetails, InvoiceSummary, Page, Paged, ReportFilter};
use tracing::debug;

use crate::commands::or_empty;
use crate::error::ApiError;
use crate::state::AppContext;

/// Issues the next invoice number from the daily counter.
///
/// A number issued here and never attached to a sale stays consumed.
/// `record_sale` issues its own number inside the sale's transaction.
pub async fn next_invoice_number(ctx: &AppContext) -> Result<String, ApiError> {
    debug!("next_invoice_number command");
    Ok(ctx.db().invoices().next_invoice_number().await?)
}

/// Invoices, newest first, filtered by date range and invoice/customer text.
pub async fn list_invoices(ctx: &AppContext, filter: ReportFilter, page: Page) -> Paged<InvoiceSummary> {
    debug!(?filter, page = page.page, "list_invoices command");
    or_empty("list_invoices", ctx.db().reports().invoices(&filter, page).await)
}

/// Header and line items of one sale, `None` when it does not exist.
pub async fn invoice_details(ctx: &AppContext, sale_id: i64) -> Option<InvoiceDetails> {
    debug!(sale_id, "invoice_details command");
    or_empty("invoice_details", ctx.db().reports().invoice_details(sale_id).await)
}
