//! # Dukaan App Library
//!
//! Application shell for Dukaan POS. The UI layer links against this
//! library: it starts the app once, keeps the returned [`AppContext`], and
//! calls functions in [`commands`].
//!
//! ## Module Organization
//! ```text
//! dukaan_app/
//! ├── lib.rs          ◄─── You are here (tracing, startup)
//! ├── main.rs         ◄─── Operator CLI
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── config.rs   ◄─── AppConfig (TOML + DUKAAN_* env)
//! │   └── context.rs  ◄─── AppContext (database, config, clock, path)
//! ├── commands/       ◄─── Sale, invoice, product, report, settings,
//! │                        backup and database commands
//! └── error.rs        ◄─── ApiError for write commands, StartupError
//! ```

pub mod commands;
pub mod error;
pub mod state;

pub use error::{ApiError, ErrorCode, StartupError};
pub use state::{AppConfig, AppContext};

use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Starts the application.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Application Startup                               │
/// │                                                                         │
/// │  1. Load Configuration ───────────────────────────────────────────────► │
/// │     • defaults < dukaan.toml < DUKAAN_* environment                     │
/// │                                                                         │
/// │  2. Initialize Logging ───────────────────────────────────────────────► │
/// │     • RUST_LOG, else [logging] filter, else info,dukaan=debug,sqlx=warn │
/// │                                                                         │
/// │  3. Resolve Database Path ────────────────────────────────────────────► │
/// │     • DUKAAN_DB_PATH override, else legacy vs app-data file             │
/// │                                                                         │
/// │  4. Open Database ────────────────────────────────────────────────────► │
/// │     • SQLite with WAL mode                                              │
/// │     • Schema manager runs; failure here stops startup                   │
/// │                                                                         │
/// │  5. Ready: AppContext handed to the UI layer ─────────────────────────► │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
///
/// Configuration loads before logging so the config's filter applies.
pub async fn startup(config_path: Option<PathBuf>) -> Result<AppContext, StartupError> {
    let config = AppConfig::load(config_path)?;
    init_tracing(config.log_filter());

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Dukaan POS");
    AppContext::start(config).await
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=dukaan=trace` - Show trace for dukaan crates only
/// - Otherwise `filter`
///
/// Logs go to stderr so CLI output on stdout stays machine-readable.
/// Calling this twice keeps the first subscriber.
pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new(state::DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
