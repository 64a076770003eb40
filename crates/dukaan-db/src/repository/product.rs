//! # Product Repository
//!
//! Database operations for the catalogue.
//!
//! ## Key Operations
//! - CRUD by row id
//! - Scanner lookup by barcode
//! - Filtered, paginated listing (newest first) and filter facets
//! - Bulk import with per-row skip
//! - In-store barcode assignment
//!
//! ## Barcode Assignment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_product { barcode_value: None }                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                 │
//! │   ├── SELECT barcode_value FROM products WHERE barcode_value LIKE '200%'│
//! │   │     → highest valid in-store serial (0 when none)                  │
//! │   ├── in_store_barcode(max + 1)         e.g. 2000000000428             │
//! │   └── INSERT products (..., barcode_value)                             │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  The serial lives in the data, so a restart or a restored backup       │
//! │  never hands out a code that is already printed on a shelf label.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use dukaan_core::barcode::{in_store_barcode, in_store_serial};
use dukaan_core::validation::validate_product;
use dukaan_core::{ImportSummary, Money, Page, Paged, Product, ProductFacets, ProductFilter, ProductInput};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{begin_write, supplied};

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// // Scanner path
/// let product = repo.find_by_barcode("8901030865278").await?;
///
/// // Catalogue screen
/// let page = repo.list(&ProductFilter::default(), Page::default()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Adds a product. A blank barcode gets the next in-store EAN-13.
    ///
    /// ## Returns
    /// * `Ok(Product)` - the stored product
    /// * `Err(DbError::Validation)` - bad input, nothing written
    /// * `Err(DbError::UniqueViolation)` - product code or barcode taken
    pub async fn add(&self, input: &ProductInput) -> DbResult<Product> {
        validate_product(input)?;

        let mut tx = begin_write(&self.pool).await?;

        let barcode = match supplied(&input.barcode_value) {
            Some(code) => code.to_string(),
            None => {
                let serial = next_in_store_serial(&mut tx).await?;
                in_store_barcode(serial)?
            }
        };

        let id = insert_product(&mut tx, input, &barcode)
            .await
            .map_err(|e| describe_duplicate(e, input, &barcode))?;

        tx.commit().await?;

        info!(id, name = %input.name.trim(), barcode = %barcode, "Product added");
        self.require(id).await
    }

    /// Replaces every editable field of a product.
    ///
    /// A blank barcode keeps the one already assigned.
    pub async fn update(&self, id: i64, input: &ProductInput) -> DbResult<Product> {
        validate_product(input)?;

        debug!(id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                product_id = ?2,
                name = ?3,
                price = ?4,
                stock = ?5,
                category = ?6,
                sub_category = ?7,
                brand = ?8,
                model_name = ?9,
                unit = ?10,
                hsn_code = ?11,
                gst_percent = ?12,
                barcode_value = COALESCE(?13, barcode_value)
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(supplied(&input.product_id))
        .bind(input.name.trim())
        .bind(input.price.to_decimal())
        .bind(input.stock)
        .bind(supplied(&input.category))
        .bind(supplied(&input.sub_category))
        .bind(supplied(&input.brand))
        .bind(supplied(&input.model_name))
        .bind(supplied(&input.unit))
        .bind(supplied(&input.hsn_code))
        .bind(input.gst_percent)
        .bind(supplied(&input.barcode_value))
        .execute(&self.pool)
        .await
        .map_err(|e| describe_duplicate(e.into(), input, supplied(&input.barcode_value).unwrap_or_default()))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id.to_string()));
        }

        self.require(id).await
    }

    /// Deletes a product. Past sale items keep their snapshot.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id.to_string()));
        }

        info!(id, "Product deleted");
        Ok(())
    }

    /// Gets a product by its row id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!("{PRODUCT_SELECT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Product::from))
    }

    /// Scanner lookup.
    pub async fn find_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let barcode = barcode.trim();
        if barcode.is_empty() {
            return Ok(None);
        }

        let row: Option<ProductRow> = sqlx::query_as(&format!("{PRODUCT_SELECT} WHERE barcode_value = ?1"))
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Product::from))
    }

    /// Lists products newest first.
    ///
    /// Category, sub-category and brand match exactly; `search` is a
    /// substring of name, barcode or product code.
    pub async fn list(&self, filter: &ProductFilter, page: Page) -> DbResult<Paged<Product>> {
        let search = supplied(&filter.search).map(|s| format!("%{s}%"));

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products {LIST_FILTER}"))
            .bind(supplied(&filter.category))
            .bind(supplied(&filter.sub_category))
            .bind(supplied(&filter.brand))
            .bind(search.as_deref())
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<ProductRow> =
            sqlx::query_as(&format!("{PRODUCT_SELECT} {LIST_FILTER} ORDER BY id DESC LIMIT ?5 OFFSET ?6"))
                .bind(supplied(&filter.category))
                .bind(supplied(&filter.sub_category))
                .bind(supplied(&filter.brand))
                .bind(search.as_deref())
                .bind(page.limit())
                .bind(page.offset())
                .fetch_all(&self.pool)
                .await?;

        debug!(total, returned = rows.len(), "Listed products");

        Ok(Paged {
            items: rows.into_iter().map(Product::from).collect(),
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    /// Distinct non-blank categories, sub-categories and brands.
    pub async fn facets(&self) -> DbResult<ProductFacets> {
        Ok(ProductFacets {
            categories: self.distinct("category").await?,
            sub_categories: self.distinct("sub_category").await?,
            brands: self.distinct("brand").await?,
        })
    }

    async fn distinct(&self, column: &str) -> DbResult<Vec<String>> {
        let values: Vec<String> = sqlx::query_scalar(&format!(
            "SELECT DISTINCT TRIM({column}) FROM products \
             WHERE {column} IS NOT NULL AND TRIM({column}) <> '' ORDER BY 1"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(values)
    }

    /// Replaces a product's barcode with a fresh in-store code.
    pub async fn regenerate_barcode(&self, id: i64) -> DbResult<String> {
        let mut tx = begin_write(&self.pool).await?;

        let serial = next_in_store_serial(&mut tx).await?;
        let barcode = in_store_barcode(serial)?;

        let result = sqlx::query("UPDATE products SET barcode_value = ?1 WHERE id = ?2")
            .bind(&barcode)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id.to_string()));
        }

        tx.commit().await?;

        info!(id, barcode = %barcode, "Barcode regenerated");
        Ok(barcode)
    }

    /// Imports rows in one transaction.
    ///
    /// Invalid rows and rows whose product code or barcode already exists
    /// are skipped and counted; everything else is inserted.
    pub async fn bulk_import(&self, rows: &[ProductInput]) -> DbResult<ImportSummary> {
        let mut summary = ImportSummary::default();
        let mut tx = begin_write(&self.pool).await?;
        let mut next_serial = next_in_store_serial(&mut tx).await?;

        for (index, input) in rows.iter().enumerate() {
            if let Err(e) = validate_product(input) {
                warn!(row = index + 1, error = %e, "Skipping invalid import row");
                summary.skipped += 1;
                continue;
            }

            let code = supplied(&input.product_id);
            let barcode = supplied(&input.barcode_value);
            if is_taken(&mut tx, code, barcode).await? {
                debug!(row = index + 1, "Skipping duplicate import row");
                summary.skipped += 1;
                continue;
            }

            let barcode = match barcode {
                Some(code) => {
                    if let Some(serial) = in_store_serial(code) {
                        next_serial = next_serial.max(serial + 1);
                    }
                    code.to_string()
                }
                None => {
                    let code = in_store_barcode(next_serial)?;
                    next_serial += 1;
                    code
                }
            };

            insert_product(&mut tx, input, &barcode).await?;
            summary.imported += 1;
        }

        tx.commit().await?;

        info!(imported = summary.imported, skipped = summary.skipped, "Bulk import finished");
        Ok(summary)
    }

    /// Counts catalogue rows.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn require(&self, id: i64) -> DbResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id.to_string()))
    }
}

async fn insert_product(conn: &mut SqliteConnection, input: &ProductInput, barcode: &str) -> DbResult<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO products (
            product_id, name, price, stock, category, sub_category, brand,
            model_name, unit, hsn_code, gst_percent, barcode_value
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(supplied(&input.product_id))
    .bind(input.name.trim())
    .bind(input.price.to_decimal())
    .bind(input.stock)
    .bind(supplied(&input.category))
    .bind(supplied(&input.sub_category))
    .bind(supplied(&input.brand))
    .bind(supplied(&input.model_name))
    .bind(supplied(&input.unit))
    .bind(supplied(&input.hsn_code))
    .bind(input.gst_percent)
    .bind(barcode)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();
    Ok(id)
}

async fn is_taken(conn: &mut SqliteConnection, code: Option<&str>, barcode: Option<&str>) -> DbResult<bool> {
    let hits: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM products \
         WHERE (?1 IS NOT NULL AND product_id = ?1) OR (?2 IS NOT NULL AND barcode_value = ?2)",
    )
    .bind(code)
    .bind(barcode)
    .fetch_one(&mut *conn)
    .await?;
    Ok(hits > 0)
}

/// Highest in-store serial already assigned, plus one.
async fn next_in_store_serial(conn: &mut SqliteConnection) -> DbResult<u64> {
    let codes: Vec<String> =
        sqlx::query_scalar("SELECT CAST(barcode_value AS TEXT) FROM products WHERE barcode_value LIKE '200%'")
            .fetch_all(&mut *conn)
            .await?;

    let max = codes.iter().filter_map(|c| in_store_serial(c)).max().unwrap_or(0);
    Ok(max + 1)
}

/// Fills in which value collided when SQLite reports a unique violation.
fn describe_duplicate(err: DbError, input: &ProductInput, barcode: &str) -> DbError {
    match err {
        DbError::UniqueViolation { field, .. } if field.ends_with("barcode_value") => {
            DbError::duplicate("barcode", barcode)
        }
        DbError::UniqueViolation { field, .. } if field.ends_with("product_id") => {
            DbError::duplicate("product code", supplied(&input.product_id).unwrap_or_default())
        }
        other => other,
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

pub(crate) const PRODUCT_SELECT: &str = r#"
    SELECT id,
           CAST(product_id AS TEXT) AS product_id,
           name,
           CAST(price AS REAL) AS price,
           CAST(COALESCE(stock, 0) AS INTEGER) AS stock,
           category, sub_category, brand, model_name, unit,
           CAST(hsn_code AS TEXT) AS hsn_code,
           CAST(COALESCE(gst_percent, 0) AS REAL) AS gst_percent,
           CAST(barcode_value AS TEXT) AS barcode_value
      FROM products
"#;

const LIST_FILTER: &str = r#"
    WHERE (?1 IS NULL OR category = ?1)
      AND (?2 IS NULL OR sub_category = ?2)
      AND (?3 IS NULL OR brand = ?3)
      AND (?4 IS NULL OR name LIKE ?4 OR barcode_value LIKE ?4 OR product_id LIKE ?4)
"#;

#[derive(Debug, FromRow)]
pub(crate) struct ProductRow {
    id: i64,
    product_id: Option<String>,
    name: String,
    price: f64,
    stock: i64,
    category: Option<String>,
    sub_category: Option<String>,
    brand: Option<String>,
    model_name: Option<String>,
    unit: Option<String>,
    hsn_code: Option<String>,
    gst_percent: f64,
    barcode_value: Option<String>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            product_id: row.product_id,
            name: row.name,
            price: Money::from_decimal(row.price),
            stock: row.stock,
            category: row.category,
            sub_category: row.sub_category,
            brand: row.brand,
            model_name: row.model_name,
            unit: row.unit,
            hsn_code: row.hsn_code,
            gst_percent: row.gst_percent,
            barcode_value: row.barcode_value,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn input(name: &str, rupees: i64) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            price: Money::from_rupees(rupees, 0),
            stock: 10,
            gst_percent: 18.0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_add_and_get() {
        let db = test_db().await;
        let mut new = input("  Philips Trimmer BT1232  ", 1_499);
        new.product_id = Some("PH-1232".to_string());
        new.category = Some("Personal Care".to_string());
        new.hsn_code = Some("8510".to_string());
        new.barcode_value = Some("8710103912345".to_string());

        let added = db.products().add(&new).await.unwrap();
        assert_eq!(added.name, "Philips Trimmer BT1232");
        assert_eq!(added.price.paise(), 149_900);
        assert_eq!(added.barcode_value.as_deref(), Some("8710103912345"));

        let fetched = db.products().get_by_id(added.id).await.unwrap().unwrap();
        assert_eq!(fetched, added);
        assert!(db.products().get_by_id(9_999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blank_barcode_gets_sequential_in_store_code() {
        let db = test_db().await;

        let first = db.products().add(&input("Loose Rice 1kg", 60)).await.unwrap();
        let second = db.products().add(&input("Loose Dal 1kg", 120)).await.unwrap();

        assert_eq!(first.barcode_value, Some(in_store_barcode(1).unwrap()));
        assert_eq!(second.barcode_value, Some(in_store_barcode(2).unwrap()));

        let found = db
            .products()
            .find_by_barcode(second.barcode_value.as_deref().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, second.id);
    }

    #[tokio::test]
    async fn test_serial_continues_after_existing_codes() {
        let db = test_db().await;
        let mut existing = input("Printed earlier", 10);
        existing.barcode_value = Some(in_store_barcode(41).unwrap());
        db.products().add(&existing).await.unwrap();

        let next = db.products().add(&input("New item", 10)).await.unwrap();
        assert_eq!(next.barcode_value, Some(in_store_barcode(42).unwrap()));

        let regenerated = db.products().regenerate_barcode(next.id).await.unwrap();
        assert_eq!(regenerated, in_store_barcode(43).unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_codes_rejected() {
        let db = test_db().await;
        let mut first = input("Amul Butter 500g", 275);
        first.product_id = Some("AMUL-500".to_string());
        db.products().add(&first).await.unwrap();

        let mut clash = input("Amul Butter (copy)", 275);
        clash.product_id = Some("AMUL-500".to_string());
        let err = db.products().add(&clash).await.unwrap_err();

        match err {
            DbError::UniqueViolation { field, value } => {
                assert_eq!(field, "product code");
                assert_eq!(value, "AMUL-500");
            }
            other => panic!("expected unique violation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_input_rejected() {
        let db = test_db().await;
        let err = db.products().add(&input("   ", 10)).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_keeps_barcode_when_blank() {
        let db = test_db().await;
        let added = db.products().add(&input("Godrej Soap", 40)).await.unwrap();

        let mut edit = input("Godrej No.1 Soap", 45);
        edit.stock = 24;
        let updated = db.products().update(added.id, &edit).await.unwrap();

        assert_eq!(updated.name, "Godrej No.1 Soap");
        assert_eq!(updated.price.paise(), 4_500);
        assert_eq!(updated.stock, 24);
        assert_eq!(updated.barcode_value, added.barcode_value);

        let err = db.products().update(9_999, &edit).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete() {
        let db = test_db().await;
        let added = db.products().add(&input("Dettol 250ml", 99)).await.unwrap();

        db.products().delete(added.id).await.unwrap();
        assert!(db.products().get_by_id(added.id).await.unwrap().is_none());
        assert!(matches!(
            db.products().delete(added.id).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_list_filters_and_pages_newest_first() {
        let db = test_db().await;
        for (name, category, brand) in [
            ("Havells Fan", "Appliances", "Havells"),
            ("Havells Iron", "Appliances", "Havells"),
            ("Bajaj Mixer", "Appliances", "Bajaj"),
            ("Classmate Notebook", "Stationery", "ITC"),
        ] {
            let mut p = input(name, 100);
            p.category = Some(category.to_string());
            p.brand = Some(brand.to_string());
            db.products().add(&p).await.unwrap();
        }

        let all = db.products().list(&ProductFilter::default(), Page::new(1, 3)).await.unwrap();
        assert_eq!(all.total, 4);
        assert_eq!(all.items.len(), 3);
        assert_eq!(all.items[0].name, "Classmate Notebook");

        let second_page = db.products().list(&ProductFilter::default(), Page::new(2, 3)).await.unwrap();
        assert_eq!(second_page.items.len(), 1);
        assert_eq!(second_page.items[0].name, "Havells Fan");

        let havells = ProductFilter {
            brand: Some("Havells".to_string()),
            ..Default::default()
        };
        assert_eq!(db.products().list(&havells, Page::default()).await.unwrap().total, 2);

        let search = ProductFilter {
            category: Some("Appliances".to_string()),
            search: Some("mix".to_string()),
            ..Default::default()
        };
        let found = db.products().list(&search, Page::default()).await.unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.items[0].name, "Bajaj Mixer");

        let facets = db.products().facets().await.unwrap();
        assert_eq!(facets.categories, vec!["Appliances", "Stationery"]);
        assert_eq!(facets.brands, vec!["Bajaj", "Havells", "ITC"]);
        assert!(facets.sub_categories.is_empty());
    }

    #[tokio::test]
    async fn test_bulk_import_skips_bad_and_duplicate_rows() {
        let db = test_db().await;
        let mut existing = input("Already there", 10);
        existing.product_id = Some("SKU-1".to_string());
        db.products().add(&existing).await.unwrap();

        let mut dup = input("Duplicate code", 10);
        dup.product_id = Some("SKU-1".to_string());
        let mut bad = input("Negative stock", 10);
        bad.stock = -4;
        let mut repeated = input("Repeated in file", 10);
        repeated.product_id = Some("SKU-2".to_string());

        let rows = vec![
            input("Surf Excel 1kg", 220),
            dup,
            bad,
            repeated.clone(),
            repeated,
            input("Vim Bar", 10),
        ];

        let summary = db.products().bulk_import(&rows).await.unwrap();
        assert_eq!(summary, ImportSummary { imported: 3, skipped: 3 });
        assert_eq!(db.products().count().await.unwrap(), 4);

        // Imported rows without a barcode got distinct in-store codes
        let page = db.products().list(&ProductFilter::default(), Page::default()).await.unwrap();
        let mut codes: Vec<_> = page.items.iter().filter_map(|p| p.barcode_value.clone()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 4);
    }
}
