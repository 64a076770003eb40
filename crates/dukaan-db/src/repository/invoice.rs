//! # Invoice Number Repository
//!
//! Persists the daily-reset counter behind `INV{YYYYMMDD}{serial}` numbers.
//!
//! ## Serialization Point
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN IMMEDIATE                  (write lock held from here)          │
//! │  SELECT last_reset_date, current_daily_number                         │
//! │    FROM invoice_daily_counter WHERE id = 1                             │
//! │  DailyCounter::issue(today)       (reset or increment, dukaan-core)    │
//! │  INSERT ... ON CONFLICT(id) DO UPDATE                                  │
//! │  ... caller's inserts ...                                              │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The read-modify-write is only safe inside a transaction opened with
//! [`begin_write`], so two checkouts can never get the same serial.
//!
//! The sale engine calls [`issue_invoice_number`] on its own transaction, so
//! a rolled-back sale gives its number back. Numbers from
//! [`InvoiceRepository::next_invoice_number`] are committed immediately and
//! are lost if the caller never saves a sale with them.

use chrono::NaiveDate;
use dukaan_core::clock::DATE_FORMAT;
use dukaan_core::invoice::DailyCounter;
use dukaan_core::{Clock, SINGLETON_ID};
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::DbResult;
use crate::repository::begin_write;

/// Repository for invoice numbers.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        InvoiceRepository { pool, clock }
    }

    /// Issues the next invoice number for today and commits it.
    pub async fn next_invoice_number(&self) -> DbResult<String> {
        let mut tx = begin_write(&self.pool).await?;
        let invoice_no = issue_invoice_number(&mut tx, self.clock.today()).await?;
        tx.commit().await?;
        Ok(invoice_no)
    }

    /// Reads the counter row without advancing it.
    pub async fn current_counter(&self) -> DbResult<Option<DailyCounter>> {
        let mut conn = self.pool.acquire().await?;
        read_counter(&mut conn).await
    }
}

/// Reads the counter row on `conn`. A row whose date does not parse reads as
/// missing, which restarts the day at 1.
async fn read_counter(conn: &mut SqliteConnection) -> DbResult<Option<DailyCounter>> {
    let row: Option<(String, i64)> = sqlx::query_as(
        "SELECT last_reset_date, current_daily_number FROM invoice_daily_counter WHERE id = ?1",
    )
    .bind(SINGLETON_ID)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.and_then(|(date, number)| {
        dukaan_core::clock::parse_date(&date).map(|last_reset_date| DailyCounter {
            last_reset_date,
            current_daily_number: number,
        })
    }))
}

/// Advances the daily counter on `conn` and returns the formatted number.
///
/// `conn` must be a transaction opened with [`begin_write`] that also writes
/// whatever consumes the number.
pub async fn issue_invoice_number(conn: &mut SqliteConnection, today: NaiveDate) -> DbResult<String> {
    let mut counter = match read_counter(&mut *conn).await? {
        Some(counter) => counter,
        None => {
            // Row removed by hand or by a restore from another tool
            info!(%today, "Recreating invoice daily counter");
            DailyCounter::new(today)
        }
    };
    let invoice_no = counter.next_invoice_number(today);

    sqlx::query(
        r#"
        INSERT INTO invoice_daily_counter (id, last_reset_date, current_daily_number)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(id) DO UPDATE SET
            last_reset_date = excluded.last_reset_date,
            current_daily_number = excluded.current_daily_number
        "#,
    )
    .bind(SINGLETON_ID)
    .bind(counter.last_reset_date.format(DATE_FORMAT).to_string())
    .bind(counter.current_daily_number)
    .execute(&mut *conn)
    .await?;

    debug!(invoice_no = %invoice_no, "Issued invoice number");
    Ok(invoice_no)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use dukaan_core::FixedClock;

    async fn db_on(date: NaiveDate) -> (Database, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::at_date(date));
        let db = Database::with_clock(DbConfig::in_memory(), clock.clone())
            .await
            .unwrap();
        (db, clock)
    }

    #[tokio::test]
    async fn test_invoice_numbers_increase_then_reset_next_day() {
        let (db, clock) = db_on(NaiveDate::from_ymd_opt(2025, 7, 28).unwrap()).await;
        let invoices = db.invoices();

        assert_eq!(invoices.next_invoice_number().await.unwrap(), "INV202507280001");
        assert_eq!(invoices.next_invoice_number().await.unwrap(), "INV202507280002");
        assert_eq!(invoices.next_invoice_number().await.unwrap(), "INV202507280003");

        clock.advance_days(1);
        assert_eq!(invoices.next_invoice_number().await.unwrap(), "INV202507290001");

        let counter = invoices.current_counter().await.unwrap().unwrap();
        assert_eq!(counter.current_daily_number, 1);
        assert_eq!(counter.last_reset_date, NaiveDate::from_ymd_opt(2025, 7, 29).unwrap());
    }

    #[tokio::test]
    async fn test_stale_seed_date_resets_on_first_issue() {
        let (db, clock) = db_on(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()).await;
        clock.advance_days(30);

        assert_eq!(db.invoices().next_invoice_number().await.unwrap(), "INV202501310001");
    }

    #[tokio::test]
    async fn test_missing_counter_row_is_recreated() {
        let (db, _clock) = db_on(NaiveDate::from_ymd_opt(2025, 7, 28).unwrap()).await;
        sqlx::query("DELETE FROM invoice_daily_counter")
            .execute(db.pool())
            .await
            .unwrap();

        assert_eq!(db.invoices().next_invoice_number().await.unwrap(), "INV202507280001");
        assert_eq!(db.invoices().next_invoice_number().await.unwrap(), "INV202507280002");
    }

    #[tokio::test]
    async fn test_stored_row_tracks_daily_counter() {
        let (db, clock) = db_on(NaiveDate::from_ymd_opt(2025, 7, 28).unwrap()).await;
        let mut expected = DailyCounter::new(clock.today());

        for day in 0..3 {
            for _ in 0..=day {
                let issued = db.invoices().next_invoice_number().await.unwrap();
                assert_eq!(issued, expected.next_invoice_number(clock.today()));
            }
            assert_eq!(db.invoices().current_counter().await.unwrap(), Some(expected));
            clock.advance_days(1);
        }
    }

    #[tokio::test]
    async fn test_unreadable_counter_date_restarts_the_day() {
        let (db, _clock) = db_on(NaiveDate::from_ymd_opt(2025, 7, 28).unwrap()).await;
        sqlx::query("UPDATE invoice_daily_counter SET last_reset_date = 'garbage', current_daily_number = 41")
            .execute(db.pool())
            .await
            .unwrap();

        assert_eq!(db.invoices().next_invoice_number().await.unwrap(), "INV202507280001");
    }

    #[tokio::test]
    async fn test_rolled_back_number_is_reused() {
        let (db, _clock) = db_on(NaiveDate::from_ymd_opt(2025, 7, 28).unwrap()).await;
        let today = db.clock().today();

        let mut tx = begin_write(db.pool()).await.unwrap();
        assert_eq!(issue_invoice_number(&mut tx, today).await.unwrap(), "INV202507280001");
        tx.rollback().await.unwrap();

        assert_eq!(db.invoices().next_invoice_number().await.unwrap(), "INV202507280001");
    }
}
