//! # Clock
//!
//! Injectable time source for sale timestamps and invoice dates.
//!
//! Everything in the store works on the shop's local calendar: an invoice
//! issued at 23:59 belongs to today, one issued at 00:01 to tomorrow. The
//! database keeps naive local timestamps as `YYYY-MM-DD HH:MM:SS` text so
//! that SQLite's `date()` and `strftime()` group them by the same calendar.
//!
//! ```rust
//! use chrono::NaiveDate;
//! use dukaan_core::clock::{Clock, FixedClock};
//!
//! let clock = FixedClock::at_date(NaiveDate::from_ymd_opt(2025, 7, 28).unwrap());
//! assert_eq!(clock.today().to_string(), "2025-07-28");
//!
//! clock.advance_days(1);
//! assert_eq!(clock.today().to_string(), "2025-07-29");
//! ```

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use std::sync::Mutex;

/// Storage format of `sales.timestamp`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Storage format of calendar dates (`invoice_daily_counter.last_reset_date`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A source of the current local date and time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;

    /// Current local calendar date.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Reads the operating system clock in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to. Used by tests to simulate the
/// date rolling over.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// A clock fixed at 10:00 on the given date.
    pub fn at_date(date: NaiveDate) -> Self {
        let ten_am = date.and_hms_opt(10, 0, 0).unwrap_or_else(|| date.and_time(Default::default()));
        Self::new(ten_am)
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance_days(&self, days: i64) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += Duration::days(days);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Formats a timestamp for the `sales.timestamp` column.
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a stored calendar date. Tolerates a trailing time component
/// (`2025-07-28T10:00:00Z`) written by older releases.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(head, DATE_FORMAT).ok()
}
