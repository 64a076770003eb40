//! # Report Repository
//!
//! Read-only aggregates over sales and sale items. Nothing here writes.
//!
//! ## Filters
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ReportFilter { from, to, search }                                     │
//! │                                                                         │
//! │  (?1 IS NULL OR date(s.timestamp) >= ?1)     inclusive lower bound     │
//! │  (?2 IS NULL OR date(s.timestamp) <= ?2)     inclusive upper bound     │
//! │  (?3 IS NULL OR s.invoice_no LIKE ?3                                   │
//! │              OR s.customer_name LIKE ?3)     substring, '%term%'       │
//! │                                                                         │
//! │  date() also reads the ISO-8601 timestamps of older files.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Money columns are summed with `TOTAL()` and rounded to paise in SQL
//! before they become [`Money`].
//!
//! Multi-query reads (dashboard, invoice details) run inside one read
//! transaction so a sale committed midway cannot show up in half the
//! figures.

use chrono::{Datelike, Months, NaiveDate};
use dukaan_core::clock::DATE_FORMAT;
use dukaan_core::{
    Clock, DashboardStats, ExportRow, GstSummaryRow, GstTotals, InvoiceDetails, InvoiceSummary, Money,
    MonthlySales, Page, Paged, ReportFilter, Sale, SaleItem, TopProduct,
};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::sync::Arc;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::sale::{SaleItemRow, SaleRow, SALE_ITEM_SELECT, SALE_SELECT};
use crate::repository::supplied;

/// Products at or below this stock count as low on the dashboard.
pub const LOW_STOCK_THRESHOLD: i64 = 5;

/// Rows in the dashboard's best-seller list.
pub const TOP_PRODUCTS_LIMIT: i64 = 5;

const SALES_FILTER: &str = r#"
    (?1 IS NULL OR date(s.timestamp) >= ?1)
    AND (?2 IS NULL OR date(s.timestamp) <= ?2)
    AND (?3 IS NULL OR s.invoice_no LIKE ?3 OR s.customer_name LIKE ?3)
"#;

/// Repository for reporting queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        ReportRepository { pool, clock }
    }

    // =========================================================================
    // Dashboard
    // =========================================================================

    /// Home screen figures for the clock's current day, month and year.
    pub async fn dashboard(&self) -> DbResult<DashboardStats> {
        let today = self.clock.today();
        let mut tx = self.pool.begin().await?;

        let (today_sales, today_invoices): (f64, i64) =
            sqlx::query_as("SELECT ROUND(TOTAL(total), 2), COUNT(*) FROM sales WHERE date(timestamp) = ?1")
                .bind(today.format(DATE_FORMAT).to_string())
                .fetch_one(&mut *tx)
                .await?;

        let month_sales: f64 =
            sqlx::query_scalar("SELECT ROUND(TOTAL(total), 2) FROM sales WHERE strftime('%Y-%m', timestamp) = ?1")
                .bind(today.format("%Y-%m").to_string())
                .fetch_one(&mut *tx)
                .await?;

        let year_sales: f64 =
            sqlx::query_scalar("SELECT ROUND(TOTAL(total), 2) FROM sales WHERE strftime('%Y', timestamp) = ?1")
                .bind(today.format("%Y").to_string())
                .fetch_one(&mut *tx)
                .await?;

        let (total_products, low_stock_products): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), CAST(TOTAL(CASE WHEN stock <= ?1 THEN 1 ELSE 0 END) AS INTEGER) FROM products",
        )
        .bind(LOW_STOCK_THRESHOLD)
        .fetch_one(&mut *tx)
        .await?;

        let top_products = top_products(&mut tx).await?;
        let monthly_sales = monthly_sales(&mut tx, twelve_months_back(today)).await?;

        tx.commit().await?;

        debug!(%today, today_invoices, "Dashboard computed");

        Ok(DashboardStats {
            today_sales: Money::from_decimal(today_sales),
            today_invoices,
            month_sales: Money::from_decimal(month_sales),
            year_sales: Money::from_decimal(year_sales),
            total_products,
            low_stock_products,
            top_products,
            monthly_sales,
        })
    }

    // =========================================================================
    // Invoices
    // =========================================================================

    /// Invoice list, newest first.
    pub async fn invoices(&self, filter: &ReportFilter, page: Page) -> DbResult<Paged<InvoiceSummary>> {
        let (from, to, search) = filter_args(filter);

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM sales s WHERE {SALES_FILTER}"))
            .bind(from.as_deref())
            .bind(to.as_deref())
            .bind(search.as_deref())
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<InvoiceSummaryRow> = sqlx::query_as(&format!(
            r#"
            SELECT s.id,
                   s.invoice_no,
                   CAST(s.timestamp AS TEXT) AS timestamp,
                   CAST(s.total AS REAL) AS total,
                   s.payment_method,
                   s.customer_name,
                   s.customer_phone,
                   (SELECT COUNT(*) FROM sale_items si WHERE si.sale_id = s.id) AS item_count
              FROM sales s
             WHERE {SALES_FILTER}
             ORDER BY s.id DESC
             LIMIT ?4 OFFSET ?5
            "#
        ))
        .bind(from.as_deref())
        .bind(to.as_deref())
        .bind(search.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Paged {
            items: rows.into_iter().map(InvoiceSummary::from).collect(),
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    /// One invoice with its lines, or `None` for an unknown id.
    pub async fn invoice_details(&self, sale_id: i64) -> DbResult<Option<InvoiceDetails>> {
        let mut tx = self.pool.begin().await?;

        let sale: Option<SaleRow> = sqlx::query_as(&format!("{SALE_SELECT} WHERE id = ?1"))
            .bind(sale_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(sale) = sale else {
            return Ok(None);
        };

        let items: Vec<SaleItemRow> = sqlx::query_as(&format!("{SALE_ITEM_SELECT} WHERE sale_id = ?1 ORDER BY id"))
            .bind(sale_id)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(InvoiceDetails {
            sale: Sale::from(sale),
            items: items.into_iter().map(SaleItem::from).collect(),
        }))
    }

    // =========================================================================
    // GST
    // =========================================================================

    /// GST liability per (HSN code, rate) slab. Lines without an HSN code
    /// group under `""`.
    pub async fn gst_summary(&self, filter: &ReportFilter) -> DbResult<Vec<GstSummaryRow>> {
        let (from, to, search) = filter_args(filter);

        let rows: Vec<GstSlabRow> = sqlx::query_as(&format!(
            r#"
            SELECT COALESCE(NULLIF(TRIM(CAST(si.hsn_code AS TEXT)), ''), '') AS hsn_code,
                   CAST(COALESCE(si.gst_percent, 0) AS REAL) AS gst_percent,
                   CAST(TOTAL(si.quantity) AS INTEGER) AS quantity,
                   ROUND(TOTAL(si.taxable_value), 2) AS taxable_value,
                   ROUND(TOTAL(si.cgst), 2) AS cgst,
                   ROUND(TOTAL(si.sgst), 2) AS sgst,
                   ROUND(TOTAL(si.gst_amount), 2) AS gst_amount,
                   ROUND(TOTAL(COALESCE(si.taxable_value, 0) + COALESCE(si.gst_amount, 0)), 2) AS total
              FROM sale_items si
              JOIN sales s ON s.id = si.sale_id
             WHERE {SALES_FILTER}
             GROUP BY 1, 2
             ORDER BY 1, 2
            "#
        ))
        .bind(from.as_deref())
        .bind(to.as_deref())
        .bind(search.as_deref())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(GstSummaryRow::from).collect())
    }

    /// Grand totals for the GST report footer.
    pub async fn gst_totals(&self, filter: &ReportFilter) -> DbResult<GstTotals> {
        let (from, to, search) = filter_args(filter);

        let row: GstTotalsRow = sqlx::query_as(&format!(
            r#"
            SELECT COUNT(DISTINCT s.id) AS invoice_count,
                   ROUND(TOTAL(si.taxable_value), 2) AS taxable_value,
                   ROUND(TOTAL(si.cgst), 2) AS cgst,
                   ROUND(TOTAL(si.sgst), 2) AS sgst,
                   ROUND(TOTAL(si.gst_amount), 2) AS gst_amount,
                   ROUND(TOTAL(COALESCE(si.taxable_value, 0) + COALESCE(si.gst_amount, 0)), 2) AS total
              FROM sales s
              JOIN sale_items si ON si.sale_id = s.id
             WHERE {SALES_FILTER}
            "#
        ))
        .bind(from.as_deref())
        .bind(to.as_deref())
        .bind(search.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(GstTotals::from(row))
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// One row per sale item, joined with its sale header, in sale order.
    pub async fn export_rows(&self, filter: &ReportFilter) -> DbResult<Vec<ExportRow>> {
        let (from, to, search) = filter_args(filter);

        let rows: Vec<ExportRowDb> = sqlx::query_as(&format!(
            r#"
            SELECT s.invoice_no,
                   CAST(s.timestamp AS TEXT) AS timestamp,
                   s.payment_method,
                   s.customer_name,
                   s.customer_phone,
                   s.customer_gstin,
                   si.name AS item_name,
                   CAST(si.hsn_code AS TEXT) AS hsn_code,
                   CAST(si.quantity AS INTEGER) AS quantity,
                   CAST(si.price AS REAL) AS price,
                   CAST(COALESCE(si.gst_percent, 0) AS REAL) AS gst_percent,
                   CAST(COALESCE(si.taxable_value, 0) AS REAL) AS taxable_value,
                   CAST(COALESCE(si.cgst, 0) AS REAL) AS cgst,
                   CAST(COALESCE(si.sgst, 0) AS REAL) AS sgst,
                   CAST(COALESCE(si.gst_amount, 0) AS REAL) AS gst_amount,
                   ROUND(COALESCE(si.taxable_value, 0) + COALESCE(si.gst_amount, 0), 2) AS line_total
              FROM sales s
              JOIN sale_items si ON si.sale_id = s.id
             WHERE {SALES_FILTER}
             ORDER BY s.id, si.id
            "#
        ))
        .bind(from.as_deref())
        .bind(to.as_deref())
        .bind(search.as_deref())
        .fetch_all(&self.pool)
        .await?;

        debug!(rows = rows.len(), "Export rows fetched");
        Ok(rows.into_iter().map(ExportRow::from).collect())
    }
}

fn filter_args(filter: &ReportFilter) -> (Option<String>, Option<String>, Option<String>) {
    (
        filter.from.map(|d| d.format(DATE_FORMAT).to_string()),
        filter.to.map(|d| d.format(DATE_FORMAT).to_string()),
        supplied(&filter.search).map(|s| format!("%{s}%")),
    )
}

/// First day of the month eleven months before `today`'s month.
fn twelve_months_back(today: NaiveDate) -> NaiveDate {
    let first = today.with_day(1).unwrap_or(today);
    first.checked_sub_months(Months::new(11)).unwrap_or(first)
}

async fn top_products(conn: &mut SqliteConnection) -> DbResult<Vec<TopProduct>> {
    let rows: Vec<(String, i64, f64)> = sqlx::query_as(
        r#"
        SELECT name,
               CAST(TOTAL(quantity) AS INTEGER),
               ROUND(TOTAL(price * quantity), 2)
          FROM sale_items
         GROUP BY name
         ORDER BY 2 DESC, 3 DESC, name
         LIMIT ?1
        "#,
    )
    .bind(TOP_PRODUCTS_LIMIT)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(name, quantity, revenue)| TopProduct {
            name,
            quantity,
            revenue: Money::from_decimal(revenue),
        })
        .collect())
}

async fn monthly_sales(conn: &mut SqliteConnection, since: NaiveDate) -> DbResult<Vec<MonthlySales>> {
    let rows: Vec<(String, f64, i64)> = sqlx::query_as(
        r#"
        SELECT strftime('%Y-%m', timestamp),
               ROUND(TOTAL(total), 2),
               COUNT(*)
          FROM sales
         WHERE date(timestamp) >= ?1
         GROUP BY 1
         ORDER BY 1
        "#,
    )
    .bind(since.format(DATE_FORMAT).to_string())
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(month, total, invoices)| MonthlySales {
            month,
            total: Money::from_decimal(total),
            invoices,
        })
        .collect())
}

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, FromRow)]
struct InvoiceSummaryRow {
    id: i64,
    invoice_no: Option<String>,
    timestamp: String,
    total: f64,
    payment_method: Option<String>,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    item_count: i64,
}

impl From<InvoiceSummaryRow> for InvoiceSummary {
    fn from(row: InvoiceSummaryRow) -> Self {
        InvoiceSummary {
            id: row.id,
            invoice_no: row.invoice_no,
            timestamp: row.timestamp,
            total: Money::from_decimal(row.total),
            payment_method: row.payment_method,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            item_count: row.item_count,
        }
    }
}

#[derive(Debug, FromRow)]
struct GstSlabRow {
    hsn_code: String,
    gst_percent: f64,
    quantity: i64,
    taxable_value: f64,
    cgst: f64,
    sgst: f64,
    gst_amount: f64,
    total: f64,
}

impl From<GstSlabRow> for GstSummaryRow {
    fn from(row: GstSlabRow) -> Self {
        GstSummaryRow {
            hsn_code: row.hsn_code,
            gst_percent: row.gst_percent,
            quantity: row.quantity,
            taxable_value: Money::from_decimal(row.taxable_value),
            cgst: Money::from_decimal(row.cgst),
            sgst: Money::from_decimal(row.sgst),
            gst_amount: Money::from_decimal(row.gst_amount),
            total: Money::from_decimal(row.total),
        }
    }
}

#[derive(Debug, FromRow)]
struct GstTotalsRow {
    invoice_count: i64,
    taxable_value: f64,
    cgst: f64,
    sgst: f64,
    gst_amount: f64,
    total: f64,
}

impl From<GstTotalsRow> for GstTotals {
    fn from(row: GstTotalsRow) -> Self {
        GstTotals {
            invoice_count: row.invoice_count,
            taxable_value: Money::from_decimal(row.taxable_value),
            cgst: Money::from_decimal(row.cgst),
            sgst: Money::from_decimal(row.sgst),
            gst_amount: Money::from_decimal(row.gst_amount),
            total: Money::from_decimal(row.total),
        }
    }
}

#[derive(Debug, FromRow)]
struct ExportRowDb {
    invoice_no: Option<String>,
    timestamp: String,
    payment_method: Option<String>,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    customer_gstin: Option<String>,
    item_name: String,
    hsn_code: Option<String>,
    quantity: i64,
    price: f64,
    gst_percent: f64,
    taxable_value: f64,
    cgst: f64,
    sgst: f64,
    gst_amount: f64,
    line_total: f64,
}

impl From<ExportRowDb> for ExportRow {
    fn from(row: ExportRowDb) -> Self {
        ExportRow {
            invoice_no: row.invoice_no,
            timestamp: row.timestamp,
            payment_method: row.payment_method,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            customer_gstin: row.customer_gstin,
            item_name: row.item_name,
            hsn_code: row.hsn_code,
            quantity: row.quantity,
            price: Money::from_decimal(row.price),
            gst_percent: row.gst_percent,
            taxable_value: Money::from_decimal(row.taxable_value),
            cgst: Money::from_decimal(row.cgst),
            sgst: Money::from_decimal(row.sgst),
            gst_amount: Money::from_decimal(row.gst_amount),
            line_total: Money::from_decimal(row.line_total),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
