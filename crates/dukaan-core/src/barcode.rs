//! # In-Store Barcodes
//!
//! Loose goods and unbranded items get an EAN-13 from the restricted
//! in-store range so the counter scanner can read printed labels.
//!
//! ```text
//!   2 0 0 │ 0 0 0 0 0 0 0 4 2 │ 7
//!   ──┬── │ ────────┬──────── │ ┬
//!  prefix │   9-digit serial  │ check digit
//! ```
//!
//! The serial is not kept in memory: dukaan-db reads the highest serial
//! already assigned and adds one, inside the write transaction.

use crate::error::ValidationError;

/// GS1 prefix reserved for in-store numbering.
pub const IN_STORE_PREFIX: &str = "200";

/// Largest serial that fits in the nine serial digits.
pub const MAX_SERIAL: u64 = 999_999_999;

/// Computes the EAN-13 check digit of the first twelve digits.
pub fn ean13_check_digit(digits: &[u8; 12]) -> u8 {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let weight = if i % 2 == 0 { 1 } else { 3 };
            u32::from(*d) * weight
        })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

/// Builds the in-store barcode for a serial.
///
/// ```rust
/// use dukaan_core::barcode::in_store_barcode;
///
/// let code = in_store_barcode(1).unwrap();
/// assert_eq!(code.len(), 13);
/// assert!(code.starts_with("200000000001"));
/// ```
pub fn in_store_barcode(serial: u64) -> Result<String, ValidationError> {
    if serial == 0 || serial > MAX_SERIAL {
        return Err(ValidationError::OutOfRange {
            field: "barcode serial".to_string(),
            min: 1,
            max: MAX_SERIAL as i64,
        });
    }

    let body = format!("{}{:09}", IN_STORE_PREFIX, serial);
    let mut digits = [0u8; 12];
    for (slot, b) in digits.iter_mut().zip(body.bytes()) {
        *slot = b - b'0';
    }
    Ok(format!("{}{}", body, ean13_check_digit(&digits)))
}

/// Checks length, digits and check digit of an EAN-13.
pub fn is_valid_ean13(code: &str) -> bool {
    if code.len() != 13 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let bytes = code.as_bytes();
    let mut digits = [0u8; 12];
    for (slot, b) in digits.iter_mut().zip(bytes) {
        *slot = b - b'0';
    }
    ean13_check_digit(&digits) == bytes[12] - b'0'
}

/// Returns the serial of a barcode generated by [`in_store_barcode`].
pub fn in_store_serial(code: &str) -> Option<u64> {
    if !code.starts_with(IN_STORE_PREFIX) || !is_valid_ean13(code) {
        return None;
    }
    code[3..12].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_digit_of_known_code() {
        // 4006381333931 is the canonical EAN-13 example
        assert!(is_valid_ean13("4006381333931"));
        assert!(!is_valid_ean13("4006381333932"));
        assert!(!is_valid_ean13("400638133393"));
        assert!(!is_valid_ean13("40063813339a1"));
    }

    #[test]
    fn test_generated_codes_are_valid_and_reversible() {
        for serial in [1, 42, 123_456_789, MAX_SERIAL] {
            let code = in_store_barcode(serial).unwrap();
            assert!(is_valid_ean13(&code), "{code}");
            assert_eq!(in_store_serial(&code), Some(serial));
        }
    }

    #[test]
    fn test_serial_bounds() {
        assert!(in_store_barcode(0).is_err());
        assert!(in_store_barcode(MAX_SERIAL + 1).is_err());
    }

    #[test]
    fn test_manufacturer_codes_have_no_serial() {
        assert_eq!(in_store_serial("8901063010345"), None);
        assert_eq!(in_store_serial("4006381333931"), None);
    }
}
