//! # Store Settings Repository
//!
//! The business profile printed on invoices, kept in the singleton row
//! `store_settings.id = 1`. The same row carries `schema_version`, which
//! only the schema manager writes.

use dukaan_core::validation::validate_store_settings;
use dukaan_core::{StoreSettings, SINGLETON_ID};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::DbResult;
use crate::repository::supplied;

/// Repository for the store profile.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Reads the profile. All fields are `None` before the first save.
    pub async fn get(&self) -> DbResult<StoreSettings> {
        let mut conn = self.pool.acquire().await?;
        Ok(read_settings(&mut conn).await?.unwrap_or_default())
    }

    /// Creates or replaces the profile. Blank fields are stored as `NULL`.
    ///
    /// `label_printer_name` is ignored here; [`Self::set_label_printer`]
    /// owns that column.
    pub async fn upsert(&self, settings: &StoreSettings) -> DbResult<StoreSettings> {
        validate_store_settings(settings)?;

        let mut conn = self.pool.acquire().await?;
        write_profile(&mut conn, settings).await?;

        info!(store_name = ?supplied(&settings.store_name), "Store settings saved");
        Ok(read_settings(&mut conn).await?.unwrap_or_default())
    }

    /// Sets only the label printer, leaving the rest of the profile alone.
    pub async fn set_label_printer(&self, name: Option<&str>) -> DbResult<()> {
        let name = name.map(str::trim).filter(|n| !n.is_empty());

        let mut conn = self.pool.acquire().await?;
        write_printer(&mut conn, name).await?;

        info!(printer = ?name, "Label printer set");
        Ok(())
    }
}

/// Reads the settings row on `conn`, `None` when the row is missing.
pub(crate) async fn read_settings(conn: &mut SqliteConnection) -> DbResult<Option<StoreSettings>> {
    let row: Option<SettingsRow> = sqlx::query_as(
        r#"
        SELECT store_name, store_address, store_subtitle, store_phone,
               store_gstin, store_footer, store_fssai, label_printer_name
          FROM store_settings
         WHERE id = ?1
        "#,
    )
    .bind(SINGLETON_ID)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(StoreSettings::from))
}

/// Upserts every settings column on `conn`, printer included, without
/// touching `schema_version`. Used by restore.
pub(crate) async fn write_settings(conn: &mut SqliteConnection, settings: &StoreSettings) -> DbResult<()> {
    write_profile(conn, settings).await?;
    write_printer(conn, supplied(&settings.label_printer_name)).await
}

async fn write_profile(conn: &mut SqliteConnection, settings: &StoreSettings) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO store_settings (
            id, store_name, store_address, store_subtitle, store_phone,
            store_gstin, store_footer, store_fssai
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(id) DO UPDATE SET
            store_name = excluded.store_name,
            store_address = excluded.store_address,
            store_subtitle = excluded.store_subtitle,
            store_phone = excluded.store_phone,
            store_gstin = excluded.store_gstin,
            store_footer = excluded.store_footer,
            store_fssai = excluded.store_fssai
        "#,
    )
    .bind(SINGLETON_ID)
    .bind(supplied(&settings.store_name))
    .bind(supplied(&settings.store_address))
    .bind(supplied(&settings.store_subtitle))
    .bind(supplied(&settings.store_phone))
    .bind(supplied(&settings.store_gstin))
    .bind(supplied(&settings.store_footer))
    .bind(supplied(&settings.store_fssai))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn write_printer(conn: &mut SqliteConnection, name: Option<&str>) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO store_settings (id, label_printer_name) VALUES (?1, ?2) \
         ON CONFLICT(id) DO UPDATE SET label_printer_name = excluded.label_printer_name",
    )
    .bind(SINGLETON_ID)
    .bind(name)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[derive(Debug, FromRow)]
struct SettingsRow {
    store_name: Option<String>,
    store_address: Option<String>,
    store_subtitle: Option<String>,
    store_phone: Option<String>,
    store_gstin: Option<String>,
    store_footer: Option<String>,
    store_fssai: Option<String>,
    label_printer_name: Option<String>,
}

impl From<SettingsRow> for StoreSettings {
    fn from(row: SettingsRow) -> Self {
        StoreSettings {
            store_name: row.store_name,
            store_address: row.store_address,
            store_subtitle: row.store_subtitle,
            store_phone: row.store_phone,
            store_gstin: row.store_gstin,
            store_footer: row.store_footer,
            store_fssai: row.store_fssai,
            label_printer_name: row.label_printer_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};

    fn profile() -> StoreSettings {
        StoreSettings {
            store_name: Some("Sharma General Store".to_string()),
            store_address: Some("12 MG Road, Indore".to_string()),
            store_phone: Some("+91 98260 12345".to_string()),
            store_gstin: Some("23AAAPL1234C1Z5".to_string()),
            store_footer: Some("Thank you, visit again".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_empty_before_first_save() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(db.settings().get().await.unwrap(), StoreSettings::default());
    }

    #[tokio::test]
    async fn test_upsert_round_trip_keeps_schema_version() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let version = db.schema_version().await.unwrap();

        let saved = db.settings().upsert(&profile()).await.unwrap();
        assert_eq!(saved.store_name.as_deref(), Some("Sharma General Store"));
        assert_eq!(saved.store_gstin.as_deref(), Some("23AAAPL1234C1Z5"));

        let mut edited = saved.clone();
        edited.store_footer = Some("   ".to_string());
        let saved = db.settings().upsert(&edited).await.unwrap();
        assert_eq!(saved.store_footer, None);

        assert_eq!(db.schema_version().await.unwrap(), version);
    }

    #[tokio::test]
    async fn test_invalid_gstin_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut bad = profile();
        bad.store_gstin = Some("NOT-A-GSTIN".to_string());

        assert!(matches!(
            db.settings().upsert(&bad).await.unwrap_err(),
            DbError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_label_printer_set_independently() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.settings().upsert(&profile()).await.unwrap();

        db.settings().set_label_printer(Some("TSC TE244")).await.unwrap();
        let settings = db.settings().get().await.unwrap();
        assert_eq!(settings.label_printer_name.as_deref(), Some("TSC TE244"));
        assert_eq!(settings.store_name.as_deref(), Some("Sharma General Store"));

        db.settings().set_label_printer(None).await.unwrap();
        assert_eq!(db.settings().get().await.unwrap().label_printer_name, None);
    }

    #[tokio::test]
    async fn test_profile_save_keeps_chosen_printer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.settings().set_label_printer(Some("TSC TE244")).await.unwrap();

        // The profile screen does not carry the printer
        let mut edited = profile();
        edited.label_printer_name = None;
        let saved = db.settings().upsert(&edited).await.unwrap();

        assert_eq!(saved.label_printer_name.as_deref(), Some("TSC TE244"));
        assert_eq!(saved.store_name.as_deref(), Some("Sharma General Store"));
    }
}
