//! # Sale Repository
//!
//! The sale engine: turns a cart into a persisted sale with GST-split line
//! items and applies stock decrements, all or nothing.
//!
//! ## Write Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate_sale_request          (no transaction yet)                   │
//! │  compute_line × N               (pure, dukaan-core::gst)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                 │
//! │   ├── ensure sales columns      (schema manager, no-op when current)   │
//! │   ├── issue invoice number      (unless the caller supplied one)       │
//! │   ├── INSERT sales              total = Σ(taxable_value + gst_amount)  │
//! │   └── for each line:                                                   │
//! │        ├── INSERT sale_items                                           │
//! │        └── UPDATE products SET stock = stock - qty                     │
//! │              (skipped when no product row resolves)                    │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction: nothing is written,    │
//! │  no stock moves, the invoice number is not consumed.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sales are immutable once written. There is no update or delete path.

use dukaan_core::clock::format_timestamp;
use dukaan_core::gst::{compute_line, sale_total, LineAmounts};
use dukaan_core::validation::validate_sale_request;
use dukaan_core::{Clock, Money, Sale, SaleItem, SaleItemRequest, SaleReceipt, SaleRequest, StockPolicy};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::invoice::issue_invoice_number;
use crate::repository::{begin_write, supplied};

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    stock_policy: StockPolicy,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>, stock_policy: StockPolicy) -> Self {
        SaleRepository {
            pool,
            clock,
            stock_policy,
        }
    }

    /// Records a sale atomically.
    ///
    /// ## Returns
    /// * `Ok(SaleReceipt)` - the new sale id and the invoice number used
    /// * `Err(DbError::Validation)` - empty cart or bad line, nothing written
    /// * `Err(DbError::InsufficientStock)` - only under
    ///   [`StockPolicy::RejectInsufficient`], nothing written
    /// * any other `Err` - storage failure, nothing written
    ///
    /// The engine does not retry.
    pub async fn record_sale(&self, request: &SaleRequest) -> DbResult<SaleReceipt> {
        validate_sale_request(request)?;

        let lines: Vec<LineAmounts> = request
            .items
            .iter()
            .map(|item| compute_line(item.price, item.quantity, item.gst_percent, item.discount_percent))
            .collect();
        let total = sale_total(&lines);

        let mut tx = begin_write(&self.pool).await?;

        migrations::ensure_table_columns(&mut tx, "sales").await?;

        let invoice_no = match supplied(&request.invoice_no) {
            Some(no) => no.to_string(),
            None => issue_invoice_number(&mut tx, self.clock.today()).await?,
        };
        let timestamp = format_timestamp(request.timestamp.unwrap_or_else(|| self.clock.now()));

        let sale_id = sqlx::query(
            r#"
            INSERT INTO sales (
                total, timestamp, invoice_no, payment_method,
                customer_name, customer_phone, customer_gstin
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(total.to_decimal())
        .bind(&timestamp)
        .bind(&invoice_no)
        .bind(request.payment_method.as_str())
        .bind(supplied(&request.customer_name))
        .bind(supplied(&request.customer_phone))
        .bind(supplied(&request.customer_gstin))
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for (item, line) in request.items.iter().zip(&lines) {
            insert_item(&mut tx, sale_id, item, line).await?;
            self.decrement_stock(&mut tx, item).await?;
        }

        tx.commit().await?;

        info!(
            sale_id,
            invoice_no = %invoice_no,
            total = %total,
            items = lines.len(),
            "Sale recorded"
        );

        Ok(SaleReceipt {
            sale_id,
            invoice_no,
            total,
        })
    }

    /// Applies the stock decrement for one line under the configured policy.
    async fn decrement_stock(&self, conn: &mut SqliteConnection, item: &SaleItemRequest) -> DbResult<()> {
        let Some(product_row) = resolve_product_row(&mut *conn, item).await? else {
            debug!(name = %item.name, "No product row for line, stock unchanged");
            return Ok(());
        };

        let updated = match self.stock_policy {
            StockPolicy::AllowNegative => {
                sqlx::query("UPDATE products SET stock = stock - ?1 WHERE id = ?2")
                    .bind(item.quantity)
                    .bind(product_row)
                    .execute(&mut *conn)
                    .await?
            }
            StockPolicy::RejectInsufficient => {
                sqlx::query("UPDATE products SET stock = stock - ?1 WHERE id = ?2 AND stock >= ?1")
                    .bind(item.quantity)
                    .bind(product_row)
                    .execute(&mut *conn)
                    .await?
            }
        };

        if updated.rows_affected() == 0 && self.stock_policy == StockPolicy::RejectInsufficient {
            warn!(product_row, requested = item.quantity, "Insufficient stock, rolling back sale");
            return Err(DbError::InsufficientStock {
                product: item.name.trim().to_string(),
                requested: item.quantity,
            });
        }

        Ok(())
    }

    /// Gets a sale header by id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Sale>> {
        let row: Option<SaleRow> = sqlx::query_as(&format!("{SALE_SELECT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Sale::from))
    }

    /// Gets all items of a sale in insertion order.
    pub async fn get_items(&self, sale_id: i64) -> DbResult<Vec<SaleItem>> {
        let rows: Vec<SaleItemRow> =
            sqlx::query_as(&format!("{SALE_ITEM_SELECT} WHERE sale_id = ?1 ORDER BY id"))
                .bind(sale_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(SaleItem::from).collect())
    }

    /// Counts recorded sales.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn insert_item(
    conn: &mut SqliteConnection,
    sale_id: i64,
    item: &SaleItemRequest,
    line: &LineAmounts,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_items (
            sale_id, product_id, name, price, quantity, hsn_code, gst_percent,
            taxable_value, gst_amount, cgst, sgst
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(sale_id)
    .bind(supplied(&item.product_code))
    .bind(item.name.trim())
    .bind(line.unit_price.to_decimal())
    .bind(line.quantity)
    .bind(supplied(&item.hsn_code))
    .bind(item.gst_percent)
    .bind(line.tax.taxable_value.to_decimal())
    .bind(line.tax.gst_amount.to_decimal())
    .bind(line.tax.cgst.to_decimal())
    .bind(line.tax.sgst.to_decimal())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Finds the product row a line refers to: the explicit row id if it
/// exists, else the product code.
async fn resolve_product_row(conn: &mut SqliteConnection, item: &SaleItemRequest) -> DbResult<Option<i64>> {
    if let Some(id) = item.product_row_id {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        if found.is_some() {
            return Ok(found);
        }
    }

    match supplied(&item.product_code) {
        Some(code) => {
            let found: Option<i64> = sqlx::query_scalar("SELECT id FROM products WHERE product_id = ?1")
                .bind(code)
                .fetch_optional(&mut *conn)
                .await?;
            Ok(found)
        }
        None => Ok(None),
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

pub(crate) const SALE_SELECT: &str = r#"
    SELECT id,
           CAST(total AS REAL) AS total,
           CAST(timestamp AS TEXT) AS timestamp,
           invoice_no, payment_method,
           customer_name, customer_phone, customer_gstin
      FROM sales
"#;

pub(crate) const SALE_ITEM_SELECT: &str = r#"
    SELECT id, sale_id, product_id, name,
           CAST(price AS REAL) AS price,
           CAST(quantity AS INTEGER) AS quantity,
           hsn_code,
           CAST(COALESCE(gst_percent, 0) AS REAL) AS gst_percent,
           CAST(COALESCE(taxable_value, 0) AS REAL) AS taxable_value,
           CAST(COALESCE(gst_amount, 0) AS REAL) AS gst_amount,
           CAST(COALESCE(cgst, 0) AS REAL) AS cgst,
           CAST(COALESCE(sgst, 0) AS REAL) AS sgst
      FROM sale_items
"#;

#[derive(Debug, FromRow)]
pub(crate) struct SaleRow {
    id: i64,
    total: f64,
    timestamp: String,
    invoice_no: Option<String>,
    payment_method: Option<String>,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    customer_gstin: Option<String>,
}

impl From<SaleRow> for Sale {
    fn from(row: SaleRow) -> Self {
        Sale {
            id: row.id,
            total: Money::from_decimal(row.total),
            timestamp: row.timestamp,
            invoice_no: row.invoice_no,
            payment_method: row.payment_method,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            customer_gstin: row.customer_gstin,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct SaleItemRow {
    id: i64,
    sale_id: i64,
    product_id: Option<String>,
    name: String,
    price: f64,
    quantity: i64,
    hsn_code: Option<String>,
    gst_percent: f64,
    taxable_value: f64,
    gst_amount: f64,
    cgst: f64,
    sgst: f64,
}

impl From<SaleItemRow> for SaleItem {
    fn from(row: SaleItemRow) -> Self {
        SaleItem {
            id: row.id,
            sale_id: row.sale_id,
            product_id: row.product_id,
            name: row.name,
            price: Money::from_decimal(row.price),
            quantity: row.quantity,
            hsn_code: row.hsn_code,
            gst_percent: row.gst_percent,
            taxable_value: Money::from_decimal(row.taxable_value),
            gst_amount: Money::from_decimal(row.gst_amount),
            cgst: Money::from_decimal(row.cgst),
            sgst: Money::from_decimal(row.sgst),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
