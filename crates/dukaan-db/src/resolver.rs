//! # Database Path Resolver
//!
//! Decides, once per process start, which file is the database of record.
//!
//! ## Decision Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DUKAAN_DB_PATH set and the file exists  → override path               │
//! │                                                                         │
//! │  legacy file   new file                                                │
//! │  ───────────   ────────                                                │
//! │  absent        absent     → new path (schema manager creates it)       │
//! │  present       absent     → legacy path (no silent migration)          │
//! │  absent        present    → new path                                   │
//! │  present       present    → more rows in products + sales wins,        │
//! │                             ties go to legacy                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Candidates are only ever opened read-only. A file that cannot be opened
//! or counted counts as zero rows; resolution never fails.
//!
//! ## Migration
//! [`PathResolver::migrate`] copies the legacy file to the new location with
//! `VACUUM INTO` a staging file, renames it into place and checks the copy
//! has the same row count as the source. The source is never written.

use directories::ProjectDirs;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection, SqliteConnection};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DbResult;

/// Environment variable that forces a database file.
pub const DB_PATH_ENV: &str = "DUKAAN_DB_PATH";

/// Default database file name in both locations.
pub const DEFAULT_FILE_NAME: &str = "dukaan.db";

/// Tables whose rows decide between two candidate files.
const CORE_TABLES: [&str; 2] = ["products", "sales"];

/// Why a path was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionReason {
    /// The override variable named an existing file.
    Override,
    /// Neither candidate exists yet.
    Fresh,
    LegacyOnly,
    NewOnly,
    /// Both exist; the one with more core rows won.
    MoreRows { legacy_rows: i64, new_rows: i64 },
}

/// The chosen database file and the reason for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub path: PathBuf,
    pub reason: ResolutionReason,
}

/// Chooses between the legacy and the application-data database files.
///
/// ## Example
/// ```rust,ignore
/// let resolver = PathResolver::from_environment("dukaan.db", None);
/// let resolution = resolver.resolve().await;
/// let db = Database::new(DbConfig::new(&resolution.path)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct PathResolver {
    legacy_path: PathBuf,
    new_path: PathBuf,
    override_path: Option<PathBuf>,
}

impl PathResolver {
    pub fn new(legacy_path: impl Into<PathBuf>, new_path: impl Into<PathBuf>) -> Self {
        PathResolver {
            legacy_path: legacy_path.into(),
            new_path: new_path.into(),
            override_path: None,
        }
    }

    /// Sets the recovery override path.
    pub fn with_override(mut self, path: Option<PathBuf>) -> Self {
        self.override_path = path;
        self
    }

    /// Builds the resolver for this machine.
    ///
    /// - legacy: `legacy_dir` (default: current working directory) + `file_name`
    /// - new: the OS application-data directory, created if absent
    /// - override: `DUKAAN_DB_PATH`, when set and non-empty
    pub fn from_environment(file_name: &str, legacy_dir: Option<&Path>) -> Self {
        let legacy_dir = legacy_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let new_dir = match app_data_dir() {
            Some(dir) => dir,
            None => {
                warn!("No usable application data directory, using the legacy location");
                legacy_dir.clone()
            }
        };

        let override_path = std::env::var_os(DB_PATH_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        PathResolver::new(legacy_dir.join(file_name), new_dir.join(file_name)).with_override(override_path)
    }

    pub fn legacy_path(&self) -> &Path {
        &self.legacy_path
    }

    pub fn new_path(&self) -> &Path {
        &self.new_path
    }

    pub fn override_path(&self) -> Option<&Path> {
        self.override_path.as_deref()
    }

    /// Picks the database of record. Never fails.
    pub async fn resolve(&self) -> Resolution {
        let resolution = self.decide().await;
        info!(
            path = %resolution.path.display(),
            reason = ?resolution.reason,
            "Resolved database path"
        );
        resolution
    }

    async fn decide(&self) -> Resolution {
        if let Some(path) = &self.override_path {
            if path.is_file() {
                return Resolution {
                    path: path.clone(),
                    reason: ResolutionReason::Override,
                };
            }
            warn!(path = %path.display(), "{DB_PATH_ENV} names a missing file, ignoring it");
        }

        let legacy_exists = self.legacy_path.is_file();
        let new_exists = self.new_path.is_file();

        match (legacy_exists, new_exists) {
            (false, false) => Resolution {
                path: self.new_path.clone(),
                reason: ResolutionReason::Fresh,
            },
            (true, false) => Resolution {
                path: self.legacy_path.clone(),
                reason: ResolutionReason::LegacyOnly,
            },
            (false, true) => Resolution {
                path: self.new_path.clone(),
                reason: ResolutionReason::NewOnly,
            },
            (true, true) => {
                let legacy_rows = rows_or_zero(&self.legacy_path).await;
                let new_rows = rows_or_zero(&self.new_path).await;

                if legacy_rows > 0 && new_rows > 0 {
                    warn!(
                        legacy = %self.legacy_path.display(),
                        legacy_rows,
                        new = %self.new_path.display(),
                        new_rows,
                        "Both database files hold data; the other file is not merged"
                    );
                }

                let path = if legacy_rows >= new_rows {
                    self.legacy_path.clone()
                } else {
                    self.new_path.clone()
                };

                Resolution {
                    path,
                    reason: ResolutionReason::MoreRows { legacy_rows, new_rows },
                }
            }
        }
    }

    /// Copies `old` to the new location unless the new file already has
    /// data. Returns `true` when the new file holds the data afterwards.
    ///
    /// Repeated calls once the new file is populated are no-ops returning
    /// `true`. `old` is never modified.
    pub async fn migrate(&self, old: &Path) -> bool {
        match self.try_migrate(old).await {
            Ok(done) => done,
            Err(e) => {
                warn!(error = %e, source = %old.display(), "Database migration failed");
                false
            }
        }
    }

    async fn try_migrate(&self, old: &Path) -> DbResult<bool> {
        if rows_or_zero(&self.new_path).await > 0 {
            debug!(path = %self.new_path.display(), "Target already populated, nothing to migrate");
            return Ok(true);
        }

        if !old.is_file() {
            warn!(source = %old.display(), "Migration source does not exist");
            return Ok(false);
        }

        let source_rows = match count_core_rows(old).await {
            Some(rows) if rows > 0 => rows,
            Some(_) => {
                info!(source = %old.display(), "Migration source is empty, nothing to copy");
                return Ok(false);
            }
            None => {
                warn!(source = %old.display(), "Migration source is unreadable");
                return Ok(false);
            }
        };

        if let Some(parent) = self.new_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let staging = self.staging_path();
        if let Err(e) = copy_snapshot(old, &staging).await {
            remove_quietly(&staging).await;
            return Err(e);
        }

        for stale in [sidecar(&self.new_path, "-wal"), sidecar(&self.new_path, "-shm")] {
            remove_quietly(&stale).await;
        }
        if let Err(e) = tokio::fs::rename(&staging, &self.new_path).await {
            remove_quietly(&staging).await;
            return Err(e.into());
        }

        let copied_rows = count_core_rows(&self.new_path).await;
        if copied_rows != Some(source_rows) {
            warn!(
                expected = source_rows,
                found = ?copied_rows,
                "Copied database failed verification, removing it"
            );
            remove_quietly(&self.new_path).await;
            return Ok(false);
        }

        info!(
            source = %old.display(),
            target = %self.new_path.display(),
            rows = source_rows,
            "Database migrated"
        );
        Ok(true)
    }

    fn staging_path(&self) -> PathBuf {
        let name = self
            .new_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
        self.new_path
            .with_file_name(format!(".{name}.{}.migrating", Uuid::new_v4()))
    }
}

/// Counts rows of `products` plus `sales` through a read-only connection.
///
/// `None` when the file cannot be opened; a missing table counts as zero.
pub async fn count_core_rows(path: &Path) -> Option<i64> {
    if !path.is_file() {
        return None;
    }

    let mut conn = match read_only(path).connect().await {
        Ok(conn) => conn,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot open candidate database");
            return None;
        }
    };

    let mut total = 0;
    for table in CORE_TABLES {
        match sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&mut conn)
            .await
        {
            Ok(n) => total += n,
            Err(e) => debug!(path = %path.display(), table, error = %e, "Counting as zero"),
        }
    }

    if let Err(e) = conn.close().await {
        debug!(error = %e, "Closing candidate connection failed");
    }
    Some(total)
}

async fn rows_or_zero(path: &Path) -> i64 {
    count_core_rows(path).await.unwrap_or(0)
}

fn read_only(path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(path)
        .read_only(true)
        .create_if_missing(false)
}

/// Writes a consistent copy of `source` to `target`.
async fn copy_snapshot(source: &Path, target: &Path) -> DbResult<()> {
    let mut conn = read_only(source).connect().await?;
    sqlx::query("VACUUM INTO ?1")
        .bind(target.to_string_lossy().into_owned())
        .execute(&mut conn)
        .await?;
    conn.close().await?;
    Ok(())
}

fn app_data_dir() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("in", "dukaan", "pos")?;
    let dir = dirs.data_dir().to_path_buf();
    match std::fs::create_dir_all(&dir) {
        Ok(()) => Some(dir),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cannot create application data directory");
            None
        }
    }
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Could not remove file"),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    /// Creates a database file with the given row counts and closes it.
    async fn make_db(path: &Path, products: usize, sales: usize) {
        let db = Database::new(DbConfig::new(path)).await.unwrap();
        for i in 0..products {
            sqlx::query("INSERT INTO products (name, price, stock) VALUES (?1, 10, 1)")
                .bind(format!("Product {i}"))
                .execute(db.pool())
                .await
                .unwrap();
        }
        for _ in 0..sales {
            sqlx::query("INSERT INTO sales (total, timestamp) VALUES (10, '2025-07-28 10:00:00')")
                .execute(db.pool())
                .await
                .unwrap();
        }
        db.close().await;
    }

    fn layout(dir: &Path) -> PathResolver {
        PathResolver::new(dir.join("legacy").join("dukaan.db"), dir.join("appdata").join("dukaan.db"))
    }

    async fn prepare(dir: &Path) -> PathResolver {
        let resolver = layout(dir);
        std::fs::create_dir_all(resolver.legacy_path().parent().unwrap()).unwrap();
        std::fs::create_dir_all(resolver.new_path().parent().unwrap()).unwrap();
        resolver
    }

    #[tokio::test]
    async fn test_fresh_install_uses_new_path() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = prepare(dir.path()).await;

        let resolution = resolver.resolve().await;
        assert_eq!(resolution.path, resolver.new_path());
        assert_eq!(resolution.reason, ResolutionReason::Fresh);
    }

    #[tokio::test]
    async fn test_single_candidate_wins() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = prepare(dir.path()).await;

        make_db(resolver.legacy_path(), 1, 0).await;
        let resolution = resolver.resolve().await;
        assert_eq!(resolution.path, resolver.legacy_path());
        assert_eq!(resolution.reason, ResolutionReason::LegacyOnly);

        let dir = tempfile::tempdir().unwrap();
        let resolver = prepare(dir.path()).await;
        make_db(resolver.new_path(), 0, 0).await;
        assert_eq!(resolver.resolve().await.reason, ResolutionReason::NewOnly);
    }

    #[tokio::test]
    async fn test_more_rows_wins_ties_favor_legacy() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = prepare(dir.path()).await;
        make_db(resolver.legacy_path(), 10, 5).await;
        make_db(resolver.new_path(), 3, 2).await;

        let resolution = resolver.resolve().await;
        assert_eq!(resolution.path, resolver.legacy_path());
        assert_eq!(
            resolution.reason,
            ResolutionReason::MoreRows {
                legacy_rows: 15,
                new_rows: 5
            }
        );

        let dir = tempfile::tempdir().unwrap();
        let resolver = prepare(dir.path()).await;
        make_db(resolver.legacy_path(), 3, 2).await;
        make_db(resolver.new_path(), 10, 5).await;
        assert_eq!(resolver.resolve().await.path, resolver.new_path());

        let dir = tempfile::tempdir().unwrap();
        let resolver = prepare(dir.path()).await;
        make_db(resolver.legacy_path(), 4, 1).await;
        make_db(resolver.new_path(), 2, 3).await;
        assert_eq!(resolver.resolve().await.path, resolver.legacy_path());
    }

    #[tokio::test]
    async fn test_unreadable_candidate_counts_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = prepare(dir.path()).await;
        std::fs::write(resolver.legacy_path(), b"this is not a database").unwrap();
        make_db(resolver.new_path(), 1, 0).await;

        let resolution = resolver.resolve().await;
        assert_eq!(resolution.path, resolver.new_path());
        assert_eq!(
            resolution.reason,
            ResolutionReason::MoreRows {
                legacy_rows: 0,
                new_rows: 1
            }
        );
    }

    #[tokio::test]
    async fn test_override_only_when_file_exists() {
        let dir = tempfile::tempdir().unwrap();
        let rescue = dir.path().join("rescue.db");
        let resolver = prepare(dir.path()).await.with_override(Some(rescue.clone()));

        assert_eq!(resolver.resolve().await.reason, ResolutionReason::Fresh);

        make_db(&rescue, 0, 0).await;
        let resolution = resolver.resolve().await;
        assert_eq!(resolution.path, rescue);
        assert_eq!(resolution.reason, ResolutionReason::Override);
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent_and_leaves_source_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = prepare(dir.path()).await;
        make_db(resolver.legacy_path(), 10, 5).await;
        let source_before = std::fs::read(resolver.legacy_path()).unwrap();

        assert!(resolver.migrate(resolver.legacy_path()).await);
        assert_eq!(count_core_rows(resolver.new_path()).await, Some(15));

        assert!(resolver.migrate(resolver.legacy_path()).await);
        assert_eq!(count_core_rows(resolver.new_path()).await, Some(15));

        assert_eq!(std::fs::read(resolver.legacy_path()).unwrap(), source_before);

        // The copy opens as a normal database
        let db = Database::new(DbConfig::new(resolver.new_path())).await.unwrap();
        assert_eq!(db.products().count().await.unwrap(), 10);
        db.close().await;
    }

    #[tokio::test]
    async fn test_migrate_replaces_empty_target() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = prepare(dir.path()).await;
        make_db(resolver.legacy_path(), 2, 1).await;
        make_db(resolver.new_path(), 0, 0).await;

        assert!(resolver.migrate(resolver.legacy_path()).await);
        assert_eq!(count_core_rows(resolver.new_path()).await, Some(3));
    }

    #[tokio::test]
    async fn test_migrate_without_source_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = prepare(dir.path()).await;

        assert!(!resolver.migrate(resolver.legacy_path()).await);
        assert!(!resolver.new_path().exists());

        std::fs::write(resolver.legacy_path(), b"garbage").unwrap();
        assert!(!resolver.migrate(resolver.legacy_path()).await);
        assert!(!resolver.new_path().exists());
    }

    #[test]
    fn test_sidecar_names() {
        let path = Path::new("/data/dukaan.db");
        assert_eq!(sidecar(path, "-wal"), PathBuf::from("/data/dukaan.db-wal"));
    }
}
