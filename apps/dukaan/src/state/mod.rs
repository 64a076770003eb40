//! # State Module
//!
//! Application state, created once at startup and passed to every command.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  startup ──► AppConfig::load ──► PathResolver::resolve ──► Database    │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                        AppContext                               │   │
//! │  │                                                                 │   │
//! │  │  Database     SQLite pool + repositories (thread-safe)          │   │
//! │  │  AppConfig    read-only after startup                           │   │
//! │  │  Clock        invoice dates and sale timestamps                 │   │
//! │  │  db_path      the file the resolver picked                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  No globals: tests build a fresh context per test.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod context;

pub use config::{
    AppConfig, ConfigError, ConfigResult, DatabaseSettings, LoggingSettings, SalesSettings, CONFIG_FILE_NAME,
    DEFAULT_LOG_FILTER,
};
pub use context::AppContext;
