//! # Database Commands
//!
//! Which file is in use and why, and the one-time copy of a legacy file
//! into the application-data directory.

use dukaan_db::resolver::count_core_rows;
use dukaan_db::{PathResolver, ResolutionReason};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::commands::or_empty;
use crate::state::AppContext;

/// One candidate location and how much data it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub path: PathBuf,
    pub exists: bool,
    /// Rows in `products` + `sales`, `None` when unreadable or absent.
    pub core_rows: Option<i64>,
}

impl Candidate {
    async fn inspect(path: &Path) -> Self {
        let exists = path.is_file();
        let core_rows = if exists { count_core_rows(path).await } else { None };
        Candidate {
            path: path.to_path_buf(),
            exists,
            core_rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInfo {
    /// The file this process uses.
    pub path: PathBuf,
    pub reason: String,
    pub schema_version: i64,
    pub legacy: Candidate,
    pub app_data: Candidate,
    pub override_path: Option<PathBuf>,
}

/// Describes the file in use and both candidate locations.
pub async fn database_info(ctx: &AppContext, resolver: &PathResolver) -> DatabaseInfo {
    debug!("database_info command");

    DatabaseInfo {
        path: ctx.db_path().to_path_buf(),
        reason: describe(ctx.resolution_reason()),
        schema_version: or_empty("schema_version", ctx.db().schema_version().await),
        legacy: Candidate::inspect(resolver.legacy_path()).await,
        app_data: Candidate::inspect(resolver.new_path()).await,
        override_path: resolver.override_path().map(Path::to_path_buf),
    }
}

/// Copies the legacy file into the application-data location unless that
/// already holds data. Never touches the legacy file.
///
/// Run this before opening a context: the copy assumes no other writer.
pub async fn migrate_legacy_database(resolver: &PathResolver) -> bool {
    info!(
        from = %resolver.legacy_path().display(),
        to = %resolver.new_path().display(),
        "migrate_legacy_database command"
    );

    let migrated = resolver.migrate(resolver.legacy_path()).await;
    if !migrated {
        warn!("Legacy database was not migrated");
    }
    migrated
}

/// Human-readable resolution reason.
pub fn describe(reason: Option<ResolutionReason>) -> String {
    match reason {
        None => "opened directly".to_string(),
        Some(ResolutionReason::Override) => format!("{} override", dukaan_db::resolver::DB_PATH_ENV),
        Some(ResolutionReason::Fresh) => "no database yet, created at the app-data location".to_string(),
        Some(ResolutionReason::LegacyOnly) => "only the legacy file exists".to_string(),
        Some(ResolutionReason::NewOnly) => "only the app-data file exists".to_string(),
        Some(ResolutionReason::MoreRows { legacy_rows, new_rows }) => format!(
            "both files exist, chose the one with more rows (legacy {legacy_rows}, app-data {new_rows})"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::stocked;
    use crate::state::AppConfig;
    use dukaan_core::{Clock, FixedClock};
    use std::sync::Arc;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::at_date(chrono::NaiveDate::from_ymd_opt(2025, 7, 28).unwrap()))
    }

    #[tokio::test]
    async fn test_migrate_then_resolve_prefers_copied_file() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("dukaan.db");
        let app_dir = dir.path().join("appdata");
        std::fs::create_dir_all(&app_dir).unwrap();
        let resolver = PathResolver::new(&legacy, app_dir.join("dukaan.db"));

        // An older install with data in the working directory
        let old = AppContext::open(AppConfig::default(), &legacy, clock()).await.unwrap();
        stocked(&old, "TATA-SALT", "Tata Salt 1kg", 28, 30).await;
        old.close().await;

        assert!(migrate_legacy_database(&resolver).await);
        assert!(migrate_legacy_database(&resolver).await);

        let ctx = AppContext::start_with(AppConfig::default(), &resolver, clock())
            .await
            .unwrap();
        let info = database_info(&ctx, &resolver).await;

        // Equal row counts: ties go to the legacy file
        assert_eq!(info.path, legacy);
        assert_eq!(info.legacy.core_rows, Some(1));
        assert_eq!(info.app_data.core_rows, Some(1));
        assert!(info.reason.contains("more rows"));
        ctx.close().await;
    }

    #[tokio::test]
    async fn test_nothing_to_migrate() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = PathResolver::new(dir.path().join("missing.db"), dir.path().join("new.db"));

        assert!(!migrate_legacy_database(&resolver).await);
        assert!(!resolver.new_path().exists());
    }

    #[test]
    fn test_describe_reasons() {
        assert_eq!(describe(None), "opened directly");
        assert!(describe(Some(ResolutionReason::Override)).contains("DUKAAN_DB_PATH"));
        assert!(describe(Some(ResolutionReason::MoreRows {
            legacy_rows: 15,
            new_rows: 5
        }))
        .contains("legacy 15"));
    }
}
