//! # Schema Manager
//!
//! Brings any database file written by any earlier release up to the current
//! schema, on every startup, without losing data.
//!
//! ## How It Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      init_schema (one transaction)                      │
//! │                                                                         │
//! │  1. CREATE TABLE IF NOT EXISTS  products, sales, sale_items,           │
//! │                                 store_settings, invoice_counter,       │
//! │                                 invoice_daily_counter                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. For every column a later release introduced:                       │
//! │       pragma_table_info(table) has it?  ── yes ──► skip                │
//! │                      │ no                                               │
//! │                      ▼                                                  │
//! │       ALTER TABLE table ADD COLUMN ...     (never drop, never rename)  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. INSERT OR IGNORE the singleton counter rows                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  4. CREATE INDEX IF NOT EXISTS ...                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  5. Versioned data migrations: run N only if stored version < N,       │
//! │     then store N                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT  (failure here is fatal to startup)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Adding a Column
//! Append it to the table's `CREATE TABLE` and to [`COLUMN_ADDITIONS`].
//! `ALTER TABLE ... ADD COLUMN` cannot add `UNIQUE`, so uniqueness of
//! `product_id` and `barcode_value` only exists on files created fresh.
//!
//! ## Adding a Data Migration
//! Append a [`Migration`] with the next version number. **Never** edit or
//! renumber a shipped one.

use chrono::NaiveDate;
use dukaan_core::clock::DATE_FORMAT;
use dukaan_core::SINGLETON_ID;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};

// =============================================================================
// Tables
// =============================================================================

const CREATE_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        product_id      TEXT UNIQUE,
        name            TEXT NOT NULL,
        price           REAL NOT NULL,
        stock           INTEGER NOT NULL DEFAULT 0,
        category        TEXT,
        sub_category    TEXT,
        brand           TEXT,
        model_name      TEXT,
        unit            TEXT,
        hsn_code        TEXT,
        gst_percent     REAL DEFAULT 0,
        barcode_value   TEXT UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sales (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        total           REAL NOT NULL,
        timestamp       TEXT NOT NULL,
        invoice_no      TEXT,
        payment_method  TEXT,
        customer_name   TEXT,
        customer_phone  TEXT,
        customer_gstin  TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sale_items (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        sale_id         INTEGER NOT NULL REFERENCES sales(id),
        product_id      TEXT,
        name            TEXT NOT NULL,
        price           REAL NOT NULL,
        quantity        INTEGER NOT NULL,
        hsn_code        TEXT,
        gst_percent     REAL DEFAULT 0,
        taxable_value   REAL DEFAULT 0,
        gst_amount      REAL DEFAULT 0,
        cgst            REAL,
        sgst            REAL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS store_settings (
        id                  INTEGER PRIMARY KEY CHECK (id = 1),
        store_name          TEXT,
        store_address       TEXT,
        store_subtitle      TEXT,
        store_phone         TEXT,
        store_gstin         TEXT,
        store_footer        TEXT,
        store_fssai         TEXT,
        schema_version      INTEGER NOT NULL DEFAULT 0,
        label_printer_name  TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS invoice_counter (
        id              INTEGER PRIMARY KEY CHECK (id = 1),
        current_number  INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS invoice_daily_counter (
        id                    INTEGER PRIMARY KEY CHECK (id = 1),
        last_reset_date       TEXT NOT NULL,
        current_daily_number  INTEGER NOT NULL DEFAULT 0
    )
    "#,
];

/// Columns added after a table's first release: `(table, column, declaration)`.
///
/// Order within a table is the order they are appended to old files.
pub const COLUMN_ADDITIONS: &[(&str, &str, &str)] = &[
    ("products", "product_id", "TEXT"),
    ("products", "stock", "INTEGER NOT NULL DEFAULT 0"),
    ("products", "category", "TEXT"),
    ("products", "sub_category", "TEXT"),
    ("products", "brand", "TEXT"),
    ("products", "model_name", "TEXT"),
    ("products", "unit", "TEXT"),
    ("products", "hsn_code", "TEXT"),
    ("products", "gst_percent", "REAL DEFAULT 0"),
    ("products", "barcode_value", "TEXT"),
    ("sales", "invoice_no", "TEXT"),
    ("sales", "payment_method", "TEXT"),
    ("sales", "customer_name", "TEXT"),
    ("sales", "customer_phone", "TEXT"),
    ("sales", "customer_gstin", "TEXT"),
    ("sale_items", "product_id", "TEXT"),
    ("sale_items", "hsn_code", "TEXT"),
    ("sale_items", "gst_percent", "REAL DEFAULT 0"),
    ("sale_items", "taxable_value", "REAL DEFAULT 0"),
    ("sale_items", "gst_amount", "REAL DEFAULT 0"),
    ("sale_items", "cgst", "REAL"),
    ("sale_items", "sgst", "REAL"),
    ("store_settings", "store_name", "TEXT"),
    ("store_settings", "store_address", "TEXT"),
    ("store_settings", "store_subtitle", "TEXT"),
    ("store_settings", "store_phone", "TEXT"),
    ("store_settings", "store_gstin", "TEXT"),
    ("store_settings", "store_footer", "TEXT"),
    ("store_settings", "store_fssai", "TEXT"),
    ("store_settings", "schema_version", "INTEGER NOT NULL DEFAULT 0"),
    ("store_settings", "label_printer_name", "TEXT"),
    ("invoice_daily_counter", "current_daily_number", "INTEGER NOT NULL DEFAULT 0"),
];

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_products_category ON products(category)",
    "CREATE INDEX IF NOT EXISTS idx_products_sub_category ON products(sub_category)",
    "CREATE INDEX IF NOT EXISTS idx_products_brand ON products(brand)",
    "CREATE INDEX IF NOT EXISTS idx_products_id_desc ON products(id DESC)",
    "CREATE INDEX IF NOT EXISTS idx_sales_id_desc ON sales(id DESC)",
    "CREATE INDEX IF NOT EXISTS idx_sale_items_sale_id ON sale_items(sale_id)",
];

// =============================================================================
// Versioned Data Migrations
// =============================================================================

/// A one-time data fix, applied once per file.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub statements: &'static [&'static str],
}

/// Every data migration, in version order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "baseline",
        statements: &[],
    },
    Migration {
        version: 2,
        name: "backfill_gst_split",
        statements: &[
            "UPDATE sale_items SET cgst = ROUND(COALESCE(gst_amount, 0) / 2.0, 2) WHERE cgst IS NULL",
            "UPDATE sale_items SET sgst = ROUND(COALESCE(gst_amount, 0) / 2.0, 2) WHERE sgst IS NULL",
        ],
    },
];

/// Version a file has after [`init_schema`].
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

// =============================================================================
// Entry Points
// =============================================================================

/// Creates or upgrades the schema. Call once per process start, before any
/// other database access.
///
/// ## Safety
/// - Idempotent: a file already at the current schema is left unchanged
/// - Transactional: nothing is applied unless everything is
///
/// ## Arguments
/// * `today` - seeds `invoice_daily_counter` on files that lack the row
pub async fn init_schema(pool: &SqlitePool, today: NaiveDate) -> DbResult<()> {
    info!("Checking database schema");

    let mut tx = pool
        .begin_with("BEGIN IMMEDIATE")
        .await
        .map_err(|e| DbError::MigrationFailed(e.to_string()))?;

    apply_all(&mut tx, today)
        .await
        .map_err(|e| DbError::MigrationFailed(e.to_string()))?;

    tx.commit()
        .await
        .map_err(|e| DbError::MigrationFailed(e.to_string()))?;

    info!(version = latest_version(), "Database schema is current");
    Ok(())
}

async fn apply_all(conn: &mut SqliteConnection, today: NaiveDate) -> DbResult<()> {
    for ddl in CREATE_TABLES {
        sqlx::query(ddl).execute(&mut *conn).await?;
    }

    for table in tables_with_additions() {
        ensure_table_columns(&mut *conn, table).await?;
    }

    seed_singletons(&mut *conn, today).await?;

    for ddl in CREATE_INDEXES {
        sqlx::query(ddl).execute(&mut *conn).await?;
    }

    apply_data_migrations(&mut *conn).await
}

fn tables_with_additions() -> Vec<&'static str> {
    let mut tables: Vec<&'static str> = Vec::new();
    for (table, _, _) in COLUMN_ADDITIONS {
        if !tables.contains(table) {
            tables.push(*table);
        }
    }
    tables
}

/// Lists a table's column names.
pub async fn table_columns(conn: &mut SqliteConnection, table: &str) -> DbResult<Vec<String>> {
    let columns: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info(?1)")
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;
    Ok(columns)
}

/// Adds every column of [`COLUMN_ADDITIONS`] that `table` is missing.
///
/// Returns how many columns were added.
pub async fn ensure_table_columns(conn: &mut SqliteConnection, table: &str) -> DbResult<usize> {
    let existing = table_columns(&mut *conn, table).await?;
    let mut added = 0;

    for (_, column, decl) in COLUMN_ADDITIONS.iter().filter(|(t, _, _)| *t == table) {
        if existing.iter().any(|c| c.eq_ignore_ascii_case(column)) {
            continue;
        }

        let ddl = format!("ALTER TABLE {table} ADD COLUMN {column} {decl}");
        sqlx::query(&ddl).execute(&mut *conn).await?;
        info!(table, column, "Added missing column");
        added += 1;
    }

    Ok(added)
}

async fn seed_singletons(conn: &mut SqliteConnection, today: NaiveDate) -> DbResult<()> {
    sqlx::query("INSERT OR IGNORE INTO invoice_counter (id, current_number) VALUES (?1, 0)")
        .bind(SINGLETON_ID)
        .execute(&mut *conn)
        .await?;

    let seeded = sqlx::query(
        "INSERT OR IGNORE INTO invoice_daily_counter (id, last_reset_date, current_daily_number) \
         VALUES (?1, ?2, 0)",
    )
    .bind(SINGLETON_ID)
    .bind(today.format(DATE_FORMAT).to_string())
    .execute(&mut *conn)
    .await?;

    if seeded.rows_affected() > 0 {
        debug!(%today, "Seeded invoice daily counter");
    }
    Ok(())
}

async fn read_version(conn: &mut SqliteConnection) -> DbResult<i64> {
    let version: Option<Option<i64>> =
        sqlx::query_scalar("SELECT schema_version FROM store_settings WHERE id = ?1")
            .bind(SINGLETON_ID)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(version.flatten().unwrap_or(0))
}

async fn write_version(conn: &mut SqliteConnection, version: i64) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO store_settings (id, schema_version) VALUES (?1, ?2) \
         ON CONFLICT(id) DO UPDATE SET schema_version = excluded.schema_version",
    )
    .bind(SINGLETON_ID)
    .bind(version)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn apply_data_migrations(conn: &mut SqliteConnection) -> DbResult<()> {
    let current = read_version(&mut *conn).await?;

    if current > latest_version() {
        warn!(
            stored = current,
            known = latest_version(),
            "Database was written by a newer release"
        );
        return Ok(());
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        info!(version = migration.version, name = migration.name, "Applying data migration");
        for statement in migration.statements {
            sqlx::query(statement).execute(&mut *conn).await?;
        }
        write_version(&mut *conn, migration.version).await?;
    }

    Ok(())
}

/// Returns the data migration version stored in the file.
pub async fn schema_version(pool: &SqlitePool) -> DbResult<i64> {
    let mut conn = pool.acquire().await?;
    read_version(&mut conn).await
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 28).unwrap()
    }

    async fn bare_db() -> Database {
        Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap()
    }

    async fn count(pool: &SqlitePool, sql: &str) -> i64 {
        sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
    }

    #[tokio::test]
    async fn test_fresh_database_gets_full_schema() {
        let db = bare_db().await;
        init_schema(db.pool(), today()).await.unwrap();

        for table in [
            "products",
            "sales",
            "sale_items",
            "store_settings",
            "invoice_counter",
            "invoice_daily_counter",
        ] {
            let mut conn = db.pool().acquire().await.unwrap();
            assert!(!table_columns(&mut conn, table).await.unwrap().is_empty(), "{table}");
        }

        let reset: String =
            sqlx::query_scalar("SELECT last_reset_date FROM invoice_daily_counter WHERE id = 1")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(reset, "2025-07-28");
        assert_eq!(schema_version(db.pool()).await.unwrap(), latest_version());
    }

    #[tokio::test]
    async fn test_schema_idempotent_on_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dukaan.db");
        let db = Database::new(DbConfig::new(&path).run_migrations(false))
            .await
            .unwrap();

        init_schema(db.pool(), today()).await.unwrap();
        sqlx::query("INSERT INTO products (name, price, stock) VALUES ('Parle-G 250g', 25, 40)")
            .execute(db.pool())
            .await
            .unwrap();

        let snapshot = |pool: SqlitePool| async move {
            let mut conn = pool.acquire().await.unwrap();
            let mut columns = Vec::new();
            for table in ["products", "sales", "sale_items", "store_settings"] {
                columns.push(table_columns(&mut conn, table).await.unwrap());
            }
            drop(conn);
            let indexes = count(&pool, "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index'").await;
            let rows = count(
                &pool,
                "SELECT (SELECT COUNT(*) FROM products) + (SELECT COUNT(*) FROM sales) \
                 + (SELECT COUNT(*) FROM store_settings) + (SELECT COUNT(*) FROM invoice_daily_counter)",
            )
            .await;
            (columns, indexes, rows)
        };

        let first = snapshot(db.pool().clone()).await;
        for _ in 0..3 {
            init_schema(db.pool(), today()).await.unwrap();
        }
        assert_eq!(snapshot(db.pool().clone()).await, first);
    }

    #[tokio::test]
    async fn test_upgrades_legacy_tables_in_place() {
        let db = bare_db().await;
        let pool = db.pool();

        for ddl in [
            "CREATE TABLE products (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, price REAL NOT NULL, stock INTEGER NOT NULL)",
            "CREATE TABLE sales (id INTEGER PRIMARY KEY AUTOINCREMENT, total REAL NOT NULL, timestamp TEXT NOT NULL)",
            "CREATE TABLE sale_items (id INTEGER PRIMARY KEY AUTOINCREMENT, sale_id INTEGER NOT NULL, name TEXT NOT NULL, price REAL NOT NULL, quantity INTEGER NOT NULL, gst_amount REAL)",
            "INSERT INTO products (name, price, stock) VALUES ('Tata Salt 1kg', 28, 10)",
            "INSERT INTO sales (total, timestamp) VALUES (1180, '2024-03-01 10:00:00')",
            "INSERT INTO sale_items (sale_id, name, price, quantity, gst_amount) VALUES (1, 'Mixer', 1180, 1, 180.02)",
        ] {
            sqlx::query(ddl).execute(pool).await.unwrap();
        }

        init_schema(pool, today()).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let sales_columns = table_columns(&mut conn, "sales").await.unwrap();
        drop(conn);
        for column in ["invoice_no", "payment_method", "customer_gstin"] {
            assert!(sales_columns.iter().any(|c| c == column), "{column}");
        }

        let (cgst, sgst): (f64, f64) = sqlx::query_as("SELECT cgst, sgst FROM sale_items WHERE id = 1")
            .fetch_one(pool)
            .await
            .unwrap();
        assert!((cgst - 90.01).abs() < 1e-9);
        assert!((sgst - 90.01).abs() < 1e-9);

        assert_eq!(count(pool, "SELECT COUNT(*) FROM products").await, 1);
    }

    #[tokio::test]
    async fn test_data_migration_runs_once() {
        let db = bare_db().await;
        let pool = db.pool();
        init_schema(pool, today()).await.unwrap();

        sqlx::query("INSERT INTO sales (total, timestamp) VALUES (105, '2025-07-28 10:00:00')")
            .execute(pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO sale_items (sale_id, name, price, quantity, gst_amount) VALUES (1, 'Pen', 105, 1, 5)")
            .execute(pool)
            .await
            .unwrap();

        init_schema(pool, today()).await.unwrap();

        let cgst: Option<f64> = sqlx::query_scalar("SELECT cgst FROM sale_items WHERE id = 1")
            .fetch_one(pool)
            .await
            .unwrap();
        assert_eq!(cgst, None);
    }

    #[tokio::test]
    async fn test_newer_version_is_left_alone() {
        let db = bare_db().await;
        init_schema(db.pool(), today()).await.unwrap();

        sqlx::query("UPDATE store_settings SET schema_version = 99 WHERE id = 1")
            .execute(db.pool())
            .await
            .unwrap();

        init_schema(db.pool(), today()).await.unwrap();
        assert_eq!(schema_version(db.pool()).await.unwrap(), 99);
    }
}
