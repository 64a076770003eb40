//! # Settings Commands
//!
//! The store profile printed on invoices, and the read-only app config.

use dukaan_core::StoreSettings;
use tracing::debug;

use crate::commands::or_empty;
use crate::error::ApiError;
use crate::state::{AppConfig, AppContext};

/// The store profile. Every field is `None` before the first save.
pub async fn get_store_settings(ctx: &AppContext) -> StoreSettings {
    debug!("get_store_settings command");
    or_empty("get_store_settings", ctx.db().settings().get().await)
}

/// Saves the store profile and returns it as stored.
pub async fn save_store_settings(ctx: &AppContext, settings: StoreSettings) -> Result<StoreSettings, ApiError> {
    debug!("save_store_settings command");
    Ok(ctx.db().settings().upsert(&settings).await?)
}

/// Sets or clears the label printer device name.
pub async fn set_label_printer(ctx: &AppContext, name: Option<String>) -> Result<(), ApiError> {
    debug!(?name, "set_label_printer command");
    Ok(ctx.db().settings().set_label_printer(name.as_deref()).await?)
}

/// The configuration the app started with.
pub fn get_config(ctx: &AppContext) -> AppConfig {
    debug!("get_config command");
    ctx.config().clone()
}

/// Stored data migration version, 0 when unreadable.
pub async fn schema_version(ctx: &AppContext) -> i64 {
    or_empty("schema_version", ctx.db().schema_version().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::context;
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_save_and_read_profile() {
        let ctx = context().await;
        assert_eq!(get_store_settings(&ctx).await, StoreSettings::default());

        let saved = save_store_settings(
            &ctx,
            StoreSettings {
                store_name: Some("Agarwal Provision Store".to_string()),
                store_gstin: Some("23AAAPL1234C1Z5".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(saved.store_name.as_deref(), Some("Agarwal Provision Store"));

        set_label_printer(&ctx, Some("Zebra GK420t".to_string())).await.unwrap();
        let settings = get_store_settings(&ctx).await;
        assert_eq!(settings.label_printer_name.as_deref(), Some("Zebra GK420t"));
        assert_eq!(settings.store_gstin.as_deref(), Some("23AAAPL1234C1Z5"));
    }

    #[tokio::test]
    async fn test_bad_gstin_is_a_validation_failure() {
        let ctx = context().await;
        let err = save_store_settings(
            &ctx,
            StoreSettings {
                store_gstin: Some("12345".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_schema_version_and_config() {
        let ctx = context().await;
        assert_eq!(schema_version(&ctx).await, dukaan_db::migrations::latest_version());
        assert_eq!(get_config(&ctx), AppConfig::default());
    }
}
