//! # Report Commands
//!
//! Read-only views over sales. None of these fail: a storage error is
//! logged and an empty result returned.

use dukaan_core::{DashboardStats, ExportRow, GstSummaryRow, GstTotals, ReportFilter};
use tracing::debug;

use crate::commands::or_empty;
use crate::state::AppContext;

/// Today/month/year sales, catalogue size, low stock, top products and the
/// twelve-month series.
pub async fn dashboard_stats(ctx: &AppContext) -> DashboardStats {
    debug!("dashboard_stats command");
    or_empty("dashboard_stats", ctx.db().reports().dashboard().await)
}

/// GST grouped by HSN code and rate.
pub async fn gst_summary(ctx: &AppContext, filter: ReportFilter) -> Vec<GstSummaryRow> {
    debug!(?filter, "gst_summary command");
    or_empty("gst_summary", ctx.db().reports().gst_summary(&filter).await)
}

pub async fn gst_totals(ctx: &AppContext, filter: ReportFilter) -> GstTotals {
    debug!(?filter, "gst_totals command");
    or_empty("gst_totals", ctx.db().reports().gst_totals(&filter).await)
}

/// One row per sale item joined with its sale, for spreadsheet export.
pub async fn export_invoice_rows(ctx: &AppContext, filter: ReportFilter) -> Vec<ExportRow> {
    debug!(?filter, "export_invoice_rows command");
    or_empty("export_invoice_rows", ctx.db().reports().export_rows(&filter).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::sale::record_sale;
    use crate::commands::testing::{context, line, stocked};
    use chrono::NaiveDate;
    use dukaan_core::{Money, SaleRequest};

    #[tokio::test]
    async fn test_reports_over_one_sale() {
        let ctx = context().await;
        let biscuits = stocked(&ctx, "BRIT-GD", "Britannia Good Day", 118, 10).await;
        record_sale(
            &ctx,
            SaleRequest {
                items: vec![line(&biscuits, 1)],
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let stats = dashboard_stats(&ctx).await;
        assert_eq!(stats.today_invoices, 1);
        assert_eq!(stats.today_sales, Money::from_rupees(118, 0));

        let today = NaiveDate::from_ymd_opt(2025, 7, 28).unwrap();
        let filter = ReportFilter {
            from: Some(today),
            to: Some(today),
            ..Default::default()
        };

        let totals = gst_totals(&ctx, filter.clone()).await;
        assert_eq!(totals.taxable_value, Money::from_rupees(100, 0));
        assert_eq!(totals.cgst, Money::from_rupees(9, 0));
        assert_eq!(totals.sgst, Money::from_rupees(9, 0));

        let slabs = gst_summary(&ctx, filter.clone()).await;
        assert_eq!(slabs.len(), 1);
        assert_eq!(slabs[0].hsn_code, "1905");

        let rows = export_invoice_rows(&ctx, filter).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].item_name, "Britannia Good Day");
    }

    #[tokio::test]
    async fn test_dashboard_is_zero_after_failure() {
        let ctx = context().await;
        ctx.close().await;

        assert_eq!(dashboard_stats(&ctx).await, DashboardStats::default());
        assert_eq!(gst_totals(&ctx, ReportFilter::default()).await, GstTotals::default());
    }
}
