//! # Validation Module
//!
//! Input validation for Dukaan POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: UI                                                           │
//! │  └── Immediate feedback while typing                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: apps/dukaan commands (Rust)                                  │
//! │  ├── Typed deserialization                                             │
//! │  └── THIS MODULE: business rules, before any write                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── NOT NULL constraints                                              │
//! │  └── UNIQUE product_id / barcode_value                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use dukaan_core::validation::{validate_gstin, validate_quantity};
//!
//! validate_gstin("27AAPFU0939F1ZV").unwrap();
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::{CoreResult, ValidationError};
use crate::types::{ProductInput, SaleRequest, StoreSettings};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product or line item name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("name"));
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a GSTIN.
///
/// ## Rules
/// - Exactly 15 characters
/// - First two are the state code digits
/// - Remaining characters are uppercase letters or digits
///
/// The checksum character is not verified; invoices with a mistyped GSTIN
/// are still legal to issue.
pub fn validate_gstin(gstin: &str) -> ValidationResult<()> {
    let gstin = gstin.trim();

    if gstin.chars().count() != 15 {
        return Err(ValidationError::invalid("gstin", "must be 15 characters"));
    }

    if !gstin.bytes().take(2).all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::invalid("gstin", "must start with a 2-digit state code"));
    }

    if !gstin
        .bytes()
        .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
    {
        return Err(ValidationError::invalid(
            "gstin",
            "must contain only uppercase letters and digits",
        ));
    }

    Ok(())
}

/// Validates a phone number: 10 to 13 digits, optionally with a leading
/// `+`, spaces or hyphens.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();
    let body = phone.strip_prefix('+').unwrap_or(phone);

    if !body
        .chars()
        .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
    {
        return Err(ValidationError::invalid("phone", "must contain only digits"));
    }

    let digits = body.chars().filter(char::is_ascii_digit).count();
    if !(10..=13).contains(&digits) {
        return Err(ValidationError::invalid("phone", "must have 10 to 13 digits"));
    }

    Ok(())
}

/// Validates an HSN/SAC code: 2 to 8 digits.
pub fn validate_hsn(hsn: &str) -> ValidationResult<()> {
    let hsn = hsn.trim();

    if !(2..=8).contains(&hsn.len()) || !hsn.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::invalid("hsn_code", "must be 2 to 8 digits"));
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a percentage field (GST rate, discount).
pub fn validate_percent(field: &str, pct: f64) -> ValidationResult<()> {
    if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

// =============================================================================
// Request Validators
// =============================================================================

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Validates a checkout before the sale engine opens a transaction.
///
/// Only the empty cart and inputs the GST arithmetic cannot take are
/// rejected: a non-positive quantity, a negative price, a negative or
/// non-finite `gst_percent`, and amounts that overflow paise. Names, rates
/// above 100 and the customer's GSTIN are stored as given.
pub fn validate_sale_request(req: &SaleRequest) -> CoreResult<()> {
    if req.items.is_empty() {
        return Err(ValidationError::EmptySale.into());
    }

    let mut total: i64 = 0;
    for item in &req.items {
        validate_quantity(item.quantity)?;
        if item.price.is_negative() {
            return Err(ValidationError::Negative {
                field: "price".to_string(),
            }
            .into());
        }
        if !item.gst_percent.is_finite() || item.gst_percent < 0.0 {
            return Err(ValidationError::Negative {
                field: "gst_percent".to_string(),
            }
            .into());
        }
        if let Some(discount) = item.discount_percent {
            validate_percent("discount_percent", discount)?;
        }

        total = item
            .price
            .paise()
            .checked_mul(item.quantity)
            .and_then(|gross| total.checked_add(gross))
            .ok_or_else(|| ValidationError::invalid("quantity", "line amount is too large"))?;
    }

    Ok(())
}

/// Validates a product add/edit.
pub fn validate_product(input: &ProductInput) -> ValidationResult<()> {
    validate_name(&input.name)?;

    if input.price.is_negative() {
        return Err(ValidationError::Negative {
            field: "price".to_string(),
        });
    }

    if input.stock < 0 {
        return Err(ValidationError::Negative {
            field: "stock".to_string(),
        });
    }

    validate_percent("gst_percent", input.gst_percent)?;

    if let Some(hsn) = present(&input.hsn_code) {
        validate_hsn(hsn)?;
    }

    if let Some(barcode) = present(&input.barcode_value) {
        if barcode.len() > 64 || barcode.chars().any(char::is_whitespace) {
            return Err(ValidationError::invalid(
                "barcode_value",
                "must be at most 64 characters without spaces",
            ));
        }
    }

    Ok(())
}

/// Validates the store profile.
pub fn validate_store_settings(settings: &StoreSettings) -> ValidationResult<()> {
    if let Some(gstin) = present(&settings.store_gstin) {
        validate_gstin(gstin)?;
    }

    if let Some(phone) = present(&settings.store_phone) {
        validate_phone(phone)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
