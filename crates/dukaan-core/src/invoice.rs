//! # Invoice Numbers
//!
//! Daily-reset sequential invoice numbers: `INV` + `YYYYMMDD` + a four digit
//! serial, e.g. `INV202507280001`.
//!
//! ## State Machine
//! ```text
//!            issue(today)
//!   ┌──────────────────────────────────────────────┐
//!   │ today != last_reset_date ?                   │
//!   │    yes → last_reset_date = today, number = 0 │
//!   │ number += 1                                  │
//!   │ return number                                │
//!   └──────────────────────────────────────────────┘
//! ```
//!
//! The persisted counter lives in `invoice_daily_counter`. dukaan-db loads
//! it under the write lock, runs [`DailyCounter::issue`] and stores it back.
//! Serials wider than four digits are printed in full, so the 10,000th
//! invoice of a day is `INV2025072810000`.

use chrono::NaiveDate;

/// Prefix of every generated invoice number.
pub const INVOICE_PREFIX: &str = "INV";

/// In-memory mirror of the `invoice_daily_counter` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyCounter {
    pub last_reset_date: NaiveDate,
    pub current_daily_number: i64,
}

impl DailyCounter {
    /// A counter seeded at `today` that has issued nothing yet.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            last_reset_date: today,
            current_daily_number: 0,
        }
    }

    /// Advances the counter and returns the serial to use.
    pub fn issue(&mut self, today: NaiveDate) -> i64 {
        if today != self.last_reset_date {
            self.last_reset_date = today;
            self.current_daily_number = 0;
        }
        self.current_daily_number += 1;
        self.current_daily_number
    }

    /// Issues the next serial and formats it.
    pub fn next_invoice_number(&mut self, today: NaiveDate) -> String {
        let serial = self.issue(today);
        format_invoice_number(today, serial)
    }
}

/// Formats an invoice number.
///
/// ```rust
/// use chrono::NaiveDate;
/// use dukaan_core::invoice::format_invoice_number;
///
/// let day = NaiveDate::from_ymd_opt(2025, 7, 28).unwrap();
/// assert_eq!(format_invoice_number(day, 1), "INV202507280001");
/// ```
pub fn format_invoice_number(date: NaiveDate, serial: i64) -> String {
    format!("{}{}{:04}", INVOICE_PREFIX, date.format("%Y%m%d"), serial)
}

/// Splits a generated invoice number back into date and serial.
/// Returns `None` for numbers typed in by hand.
pub fn parse_invoice_number(invoice_no: &str) -> Option<(NaiveDate, i64)> {
    let rest = invoice_no.strip_prefix(INVOICE_PREFIX)?;
    if rest.len() < 12 || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (date, serial) = rest.split_at(8);
    let date = NaiveDate::parse_from_str(date, "%Y%m%d").ok()?;
    let serial = serial.parse().ok()?;
    Some((date, serial))
}
