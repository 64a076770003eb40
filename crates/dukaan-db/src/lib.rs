//! # dukaan-db: Database Layer for Dukaan POS
//!
//! This crate provides database access for the Dukaan POS system.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Dukaan POS Data Flow                             │
//! │                                                                         │
//! │  Command (record_sale)                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     dukaan-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Resolver    │    │   Database    │    │  Migrations  │  │   │
//! │  │   │ (resolver.rs) │───►│   (pool.rs)   │───►│ (schema mgr) │  │   │
//! │  │   │ which file?   │    │ SqlitePool    │    │ idempotent   │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                               │   │
//! │  │            ┌───────────────────┼───────────────────┐          │   │
//! │  │            ▼                   ▼                   ▼          │   │
//! │  │      SaleRepository     ProductRepository   ReportRepository  │   │
//! │  │      InvoiceRepository  SettingsRepository  BackupRepository  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`resolver`] - Chooses the database file at startup
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Schema manager and versioned data migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dukaan_db::{Database, DbConfig, PathResolver};
//!
//! let resolution = PathResolver::from_environment("dukaan.db", None).resolve().await;
//! let db = Database::new(DbConfig::new(&resolution.path)).await?;
//!
//! let receipt = db.sales().record_sale(&request).await?;
//! println!("Saved {}", receipt.invoice_no);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod resolver;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use resolver::{PathResolver, Resolution, ResolutionReason};

// Repository re-exports for convenience
pub use repository::backup::BackupRepository;
pub use repository::invoice::InvoiceRepository;
pub use repository::product::ProductRepository;
pub use repository::report::ReportRepository;
pub use repository::sale::SaleRepository;
pub use repository::settings::SettingsRepository;
