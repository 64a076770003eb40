//! # Backup Repository
//!
//! Full-table dump and restore of the catalogue, sales and store profile.
//!
//! ## Restore
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                 │
//! │   ├── DELETE sale_items, sales, products     (child tables first)      │
//! │   ├── INSERT products    with their original ids                       │
//! │   ├── INSERT sales       with their original ids                       │
//! │   ├── INSERT sale_items  (foreign keys checked against the new sales)  │
//! │   └── upsert store profile (only when the dump carries one)            │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  A dump that fails anywhere leaves the current data untouched.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The invoice counter and `schema_version` are not part of a dump.

use dukaan_core::{FullDump, Product, Sale, SaleItem};
use sqlx::{SqliteConnection, SqlitePool};
use std::path::Path;
use tracing::{info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::product::{ProductRow, PRODUCT_SELECT};
use crate::repository::sale::{SaleItemRow, SaleRow, SALE_ITEM_SELECT, SALE_SELECT};
use crate::repository::begin_write;
use crate::repository::settings::{read_settings, write_settings};

/// Repository for backup and restore.
#[derive(Debug, Clone)]
pub struct BackupRepository {
    pool: SqlitePool,
}

impl BackupRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BackupRepository { pool }
    }

    /// Reads every product, sale, sale item and the store profile from one
    /// snapshot.
    pub async fn export_full_dump(&self) -> DbResult<FullDump> {
        let mut tx = self.pool.begin().await?;

        let products: Vec<ProductRow> = sqlx::query_as(&format!("{PRODUCT_SELECT} ORDER BY id"))
            .fetch_all(&mut *tx)
            .await?;
        let sales: Vec<SaleRow> = sqlx::query_as(&format!("{SALE_SELECT} ORDER BY id"))
            .fetch_all(&mut *tx)
            .await?;
        let sale_items: Vec<SaleItemRow> = sqlx::query_as(&format!("{SALE_ITEM_SELECT} ORDER BY id"))
            .fetch_all(&mut *tx)
            .await?;
        let store_settings = read_settings(&mut tx).await?;

        tx.commit().await?;

        let dump = FullDump {
            products: products.into_iter().map(Product::from).collect(),
            sales: sales.into_iter().map(Sale::from).collect(),
            sale_items: sale_items.into_iter().map(SaleItem::from).collect(),
            store_settings,
        };

        info!(
            products = dump.products.len(),
            sales = dump.sales.len(),
            sale_items = dump.sale_items.len(),
            "Full dump exported"
        );
        Ok(dump)
    }

    /// Replaces products, sales and sale items with the dump's rows.
    pub async fn import_full_dump(&self, dump: &FullDump) -> DbResult<()> {
        let mut tx = begin_write(&self.pool).await?;

        for table in ["sale_items", "sales", "products"] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await?;
        }

        for product in &dump.products {
            insert_product(&mut tx, product).await?;
        }
        for sale in &dump.sales {
            insert_sale(&mut tx, sale).await?;
        }
        for item in &dump.sale_items {
            insert_sale_item(&mut tx, item).await?;
        }

        if let Some(settings) = &dump.store_settings {
            write_settings(&mut tx, settings).await?;
        }

        tx.commit().await?;

        info!(
            products = dump.products.len(),
            sales = dump.sales.len(),
            sale_items = dump.sale_items.len(),
            "Full dump imported"
        );
        Ok(())
    }

    /// Writes the dump as pretty JSON. Returns the bytes written.
    pub async fn export_to_file(&self, path: &Path) -> DbResult<usize> {
        let dump = self.export_full_dump().await?;
        let json = serde_json::to_vec_pretty(&dump).map_err(|e| DbError::Internal(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &json).await?;

        info!(path = %path.display(), bytes = json.len(), "Backup written");
        Ok(json.len())
    }

    /// Reads a JSON dump and restores it.
    pub async fn import_from_file(&self, path: &Path) -> DbResult<FullDump> {
        let bytes = tokio::fs::read(path).await?;
        let dump: FullDump = serde_json::from_slice(&bytes).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Unreadable backup file");
            DbError::Validation(format!("Invalid backup file: {e}"))
        })?;

        self.import_full_dump(&dump).await?;
        Ok(dump)
    }
}

async fn insert_product(conn: &mut SqliteConnection, p: &Product) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO products (
            id, product_id, name, price, stock, category, sub_category, brand,
            model_name, unit, hsn_code, gst_percent, barcode_value
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(p.id)
    .bind(&p.product_id)
    .bind(&p.name)
    .bind(p.price.to_decimal())
    .bind(p.stock)
    .bind(&p.category)
    .bind(&p.sub_category)
    .bind(&p.brand)
    .bind(&p.model_name)
    .bind(&p.unit)
    .bind(&p.hsn_code)
    .bind(p.gst_percent)
    .bind(&p.barcode_value)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_sale(conn: &mut SqliteConnection, s: &Sale) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales (
            id, total, timestamp, invoice_no, payment_method,
            customer_name, customer_phone, customer_gstin
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(s.id)
    .bind(s.total.to_decimal())
    .bind(&s.timestamp)
    .bind(&s.invoice_no)
    .bind(&s.payment_method)
    .bind(&s.customer_name)
    .bind(&s.customer_phone)
    .bind(&s.customer_gstin)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_sale_item(conn: &mut SqliteConnection, i: &SaleItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_items (
            id, sale_id, product_id, name, price, quantity, hsn_code, gst_percent,
            taxable_value, gst_amount, cgst, sgst
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(i.id)
    .bind(i.sale_id)
    .bind(&i.product_id)
    .bind(&i.name)
    .bind(i.price.to_decimal())
    .bind(i.quantity)
    .bind(&i.hsn_code)
    .bind(i.gst_percent)
    .bind(i.taxable_value.to_decimal())
    .bind(i.gst_amount.to_decimal())
    .bind(i.cgst.to_decimal())
    .bind(i.sgst.to_decimal())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use dukaan_core::{Money, ProductInput, SaleItemRequest, SaleRequest, StoreSettings};

    async fn populated() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let product = db
            .products()
            .add(&ProductInput {
                product_id: Some("BRIT-GD".to_string()),
                name: "Britannia Good Day".to_string(),
                price: Money::from_rupees(30, 0),
                stock: 48,
                gst_percent: 18.0,
                hsn_code: Some("1905".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let request = SaleRequest {
            items: vec![SaleItemRequest {
                product_row_id: Some(product.id),
                product_code: product.product_id.clone(),
                name: product.name.clone(),
                price: product.price,
                quantity: 4,
                gst_percent: 18.0,
                hsn_code: product.hsn_code.clone(),
                ..Default::default()
            }],
            customer_phone: Some("9876543210".to_string()),
            ..Default::default()
        };
        db.sales().record_sale(&request).await.unwrap();

        db.settings()
            .upsert(&StoreSettings {
                store_name: Some("Gupta Kirana".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        db
    }

    #[tokio::test]
    async fn test_dump_restores_into_fresh_database() {
        let source = populated().await;
        let dump = source.backup().export_full_dump().await.unwrap();
        assert_eq!(dump.products.len(), 1);
        assert_eq!(dump.products[0].stock, 44);
        assert_eq!(dump.sale_items.len(), 1);

        let target = Database::new(DbConfig::in_memory()).await.unwrap();
        target.backup().import_full_dump(&dump).await.unwrap();

        assert_eq!(target.backup().export_full_dump().await.unwrap(), dump);
        assert_eq!(
            target.settings().get().await.unwrap().store_name.as_deref(),
            Some("Gupta Kirana")
        );
    }

    #[tokio::test]
    async fn test_import_replaces_existing_rows() {
        let db = populated().await;
        db.backup().import_full_dump(&FullDump::default()).await.unwrap();

        let after = db.backup().export_full_dump().await.unwrap();
        assert!(after.products.is_empty());
        assert!(after.sales.is_empty());
        assert!(after.sale_items.is_empty());
        // No profile in the dump leaves the current one in place
        assert!(after.store_settings.is_some_and(|s| s.store_name.is_some()));
    }

    #[tokio::test]
    async fn test_broken_dump_leaves_data_untouched() {
        let db = populated().await;
        let before = db.backup().export_full_dump().await.unwrap();

        let mut broken = before.clone();
        broken.sales.clear();

        let err = db.backup().import_full_dump(&broken).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }), "{err:?}");
        assert_eq!(db.backup().export_full_dump().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backups").join("dukaan-backup.json");

        let source = populated().await;
        let written = source.backup().export_to_file(&path).await.unwrap();
        assert!(written > 0);

        let target = Database::new(DbConfig::in_memory()).await.unwrap();
        let restored = target.backup().import_from_file(&path).await.unwrap();
        assert_eq!(restored.sales.len(), 1);
        assert_eq!(target.sales().count().await.unwrap(), 1);

        std::fs::write(&path, b"not json").unwrap();
        let err = target.backup().import_from_file(&path).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert_eq!(target.sales().count().await.unwrap(), 1);
    }
}
