//! # Application Context
//!
//! Owns the database handle for the lifetime of the process.
//!
//! ## Usage in Commands
//! ```rust,ignore
//! pub async fn record_sale(ctx: &AppContext, request: SaleRequest) -> Result<SaleReceipt, ApiError> {
//!     Ok(ctx.db().sales().record_sale(&request).await?)
//! }
//! ```

use dukaan_core::{Clock, SystemClock};
use dukaan_db::{Database, DbConfig, PathResolver, Resolution, ResolutionReason};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::error::StartupError;
use crate::state::AppConfig;

/// Everything a command needs.
///
/// Cloning is cheap: the pool and clock are reference counted.
#[derive(Debug, Clone)]
pub struct AppContext {
    db: Database,
    config: AppConfig,
    clock: Arc<dyn Clock>,
    db_path: PathBuf,
    reason: Option<ResolutionReason>,
}

impl AppContext {
    /// Resolves the database file for this machine and opens it.
    pub async fn start(config: AppConfig) -> Result<Self, StartupError> {
        let resolver = config.path_resolver();
        Self::start_with(config, &resolver, Arc::new(SystemClock)).await
    }

    /// Resolves with `resolver` and opens the chosen file.
    ///
    /// The schema manager runs while opening; a schema that cannot be
    /// brought up to date fails startup.
    pub async fn start_with(
        config: AppConfig,
        resolver: &PathResolver,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StartupError> {
        let Resolution { path, reason } = resolver.resolve().await;
        info!(path = %path.display(), reason = ?reason, "Database path resolved");

        let mut ctx = Self::open(config, path, clock).await?;
        ctx.reason = Some(reason);
        Ok(ctx)
    }

    /// Opens the database at `path`, skipping resolution.
    pub async fn open(
        config: AppConfig,
        path: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StartupError> {
        let path = path.into();
        let db = Database::with_clock(config.db_config(&path), Arc::clone(&clock)).await?;
        Self::ready(db, config, clock, path, None).await
    }

    /// Opens a private in-memory database. Used by tests.
    pub async fn in_memory(config: AppConfig, clock: Arc<dyn Clock>) -> Result<Self, StartupError> {
        let db_config = DbConfig::in_memory().stock_policy(config.sales.stock_policy);
        let db = Database::with_clock(db_config, Arc::clone(&clock)).await?;
        Self::ready(db, config, clock, PathBuf::from(":memory:"), None).await
    }

    async fn ready(
        db: Database,
        config: AppConfig,
        clock: Arc<dyn Clock>,
        db_path: PathBuf,
        reason: Option<ResolutionReason>,
    ) -> Result<Self, StartupError> {
        let version = db.schema_version().await?;
        info!(path = %db_path.display(), schema_version = version, "Application ready");

        Ok(AppContext {
            db,
            config,
            clock,
            db_path,
            reason,
        })
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// The database file in use.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Why the resolver picked [`Self::db_path`], `None` when opened directly.
    pub fn resolution_reason(&self) -> Option<ResolutionReason> {
        self.reason
    }

    /// A resolver over the legacy and application-data locations this
    /// context's config names.
    pub fn resolver(&self) -> PathResolver {
        self.config.path_resolver()
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dukaan_core::FixedClock;

    fn clock() -> Arc<dyn Clock> {
        let date = chrono::NaiveDate::from_ymd_opt(2025, 7, 28).unwrap();
        Arc::new(FixedClock::at_date(date))
    }

    #[tokio::test]
    async fn test_start_creates_fresh_database_at_new_path() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = PathResolver::new(dir.path().join("legacy.db"), dir.path().join("app").join("dukaan.db"));
        std::fs::create_dir_all(dir.path().join("app")).unwrap();

        let ctx = AppContext::start_with(AppConfig::default(), &resolver, clock())
            .await
            .unwrap();

        assert_eq!(ctx.db_path(), resolver.new_path());
        assert_eq!(ctx.resolution_reason(), Some(ResolutionReason::Fresh));
        assert!(ctx.db_path().is_file());
        assert_eq!(ctx.db().products().count().await.unwrap(), 0);
        ctx.close().await;
    }

    #[tokio::test]
    async fn test_in_memory_uses_configured_stock_policy() {
        let mut config = AppConfig::default();
        config.sales.stock_policy = dukaan_core::StockPolicy::RejectInsufficient;

        let ctx = AppContext::in_memory(config, clock()).await.unwrap();
        assert_eq!(ctx.db().stock_policy(), dukaan_core::StockPolicy::RejectInsufficient);
        assert_eq!(ctx.clock().today().to_string(), "2025-07-28");
    }
}
