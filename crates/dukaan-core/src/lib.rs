//! # dukaan-core: Pure Business Logic for Dukaan POS
//!
//! This crate is the **heart** of Dukaan POS. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Dukaan POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    UI layer (not in this repo)                  │   │
//! │  │    Billing ──► Invoice print ──► Reports ──► Label print        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/dukaan commands                         │   │
//! │  │    record_sale, next_invoice_number, get_gst_summary, ...       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ dukaan-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │    gst    │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │ Breakdown │  │   rules   │  │   │
//! │  │   │   Sale    │  │  TaxRate  │  │  invoice  │  │  barcode  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO WALL CLOCK • PURE FUNCTIONS        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    dukaan-db (Database Layer)                   │   │
//! │  │        SQLite queries, schema manager, path resolver            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, SaleItem, requests, reports)
//! - [`money`] - Money type in paise with integer arithmetic
//! - [`gst`] - Tax-inclusive GST extraction and CGST/SGST split
//! - [`invoice`] - Daily-reset invoice number state machine
//! - [`barcode`] - In-store EAN-13 barcode generation
//! - [`clock`] - Injectable time source
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use dukaan_core::gst::GstBreakdown;
//! use dukaan_core::money::Money;
//! use dukaan_core::types::TaxRate;
//!
//! // MRP ₹1180.00 at 18% GST, tax included in the price
//! let gross = Money::from_paise(118_000);
//! let split = GstBreakdown::from_inclusive(gross, TaxRate::from_percentage(18.0));
//!
//! assert_eq!(split.taxable_value.paise(), 100_000);
//! assert_eq!(split.gst_amount.paise(), 18_000);
//! assert_eq!(split.cgst, split.sgst);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod barcode;
pub mod clock;
pub mod error;
pub mod gst;
pub mod invoice;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CoreError, ValidationError};
pub use gst::GstBreakdown;
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Primary key of every singleton row (store settings, counters).
pub const SINGLETON_ID: i64 = 1;

/// Default page size for paginated listings.
pub const DEFAULT_PAGE_SIZE: u32 = 50;
