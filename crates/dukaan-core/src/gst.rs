//! # GST Extraction
//!
//! Splits a tax-inclusive amount into taxable value and GST, and GST into
//! equal CGST and SGST halves for intra-state sales.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  gross          = unit price × quantity          (tax inclusive)       │
//! │  taxable_value  = round(gross / (1 + rate))                            │
//! │  gst_amount     = gross − taxable_value                                │
//! │  cgst = sgst    = round(gst_amount / 2)                                │
//! │                                                                         │
//! │  All rounding is half away from zero, to the paisa, per line.          │
//! │  A sale total is the sum of already-rounded lines and is never         │
//! │  recomputed from the aggregate.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Because the computation runs in integer paise,
//! `taxable_value + gst_amount == gross` holds exactly. When `gst_amount` is
//! an odd number of paise, `cgst + sgst` exceeds it by one paisa; stored
//! invoices have always carried that, so it stays.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{div_round_half_up, Money};
use crate::types::{bps_from_percentage, TaxRate};

/// GST split of one tax-inclusive amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GstBreakdown {
    pub gross: Money,
    pub taxable_value: Money,
    pub gst_amount: Money,
    pub cgst: Money,
    pub sgst: Money,
}

impl GstBreakdown {
    /// Extracts GST from a tax-inclusive gross amount.
    ///
    /// ## Example
    /// ```rust
    /// use dukaan_core::gst::GstBreakdown;
    /// use dukaan_core::money::Money;
    /// use dukaan_core::types::TaxRate;
    ///
    /// let split = GstBreakdown::from_inclusive(Money::from_paise(10_500), TaxRate::from_bps(500));
    /// assert_eq!(split.taxable_value.paise(), 10_000);
    /// assert_eq!(split.cgst.paise(), 250);
    /// ```
    pub fn from_inclusive(gross: Money, rate: TaxRate) -> Self {
        let bps = rate.bps() as i128;
        let taxable = div_round_half_up(gross.paise() as i128 * 10_000, 10_000 + bps) as i64;
        let taxable_value = Money::from_paise(taxable);
        let gst_amount = gross - taxable_value;
        let half = gst_amount.half();

        Self {
            gross,
            taxable_value,
            gst_amount,
            cgst: half,
            sgst: half,
        }
    }
}

/// A priced cart line ready to be written as a sale item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmounts {
    /// Unit rate after the line discount.
    pub unit_price: Money,
    pub quantity: i64,
    pub tax: GstBreakdown,
}

/// Prices one cart line: applies the optional discount to the unit MRP,
/// multiplies by quantity, then extracts GST.
///
/// ```rust
/// use dukaan_core::gst::compute_line;
/// use dukaan_core::money::Money;
///
/// let line = compute_line(Money::from_paise(118_000), 1, 18.0, None);
/// assert_eq!(line.tax.taxable_value.paise(), 100_000);
/// assert_eq!(line.tax.gst_amount.paise(), 18_000);
/// ```
pub fn compute_line(
    mrp: Money,
    quantity: i64,
    gst_percent: f64,
    discount_percent: Option<f64>,
) -> LineAmounts {
    let unit_price = match discount_percent {
        Some(pct) => mrp.apply_percentage_discount(bps_from_percentage(pct).min(10_000)),
        None => mrp,
    };
    let gross = unit_price.multiply_quantity(quantity);

    LineAmounts {
        unit_price,
        quantity,
        tax: GstBreakdown::from_inclusive(gross, TaxRate::from_percentage(gst_percent)),
    }
}

/// Sale total: the sum of each line's `taxable_value + gst_amount`.
pub fn sale_total(lines: &[LineAmounts]) -> Money {
    lines
        .iter()
        .map(|l| l.tax.taxable_value + l.tax.gst_amount)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(paise: i64, pct: f64) -> GstBreakdown {
        GstBreakdown::from_inclusive(Money::from_paise(paise), TaxRate::from_percentage(pct))
    }

    #[test]
    fn test_gst_split_reference_case() {
        // price=1180, quantity=1, gst_percent=18
        let s = split(118_000, 18.0);
        assert_eq!(s.taxable_value.paise(), 100_000);
        assert_eq!(s.gst_amount.paise(), 18_000);
        assert_eq!(s.cgst.paise(), 9_000);
        assert_eq!(s.sgst.paise(), 9_000);
    }

    #[test]
    fn test_gst_split_halves_equal_and_parts_sum_to_gross() {
        let rates = [0.0, 0.25, 3.0, 5.0, 12.0, 18.0, 28.0, 40.0];
        for gross in (0..5_000).step_by(7).chain([99_999, 1_234_567]) {
            for pct in rates {
                let s = split(gross, pct);
                assert_eq!(s.cgst, s.sgst, "gross={gross} pct={pct}");
                assert_eq!(s.taxable_value + s.gst_amount, s.gross);
                assert!((s.cgst + s.sgst - s.gst_amount).paise().abs() <= 1);
            }
        }
    }

    #[test]
    fn test_zero_rate_has_no_tax() {
        let s = split(4_999, 0.0);
        assert_eq!(s.taxable_value.paise(), 4_999);
        assert!(s.gst_amount.is_zero());
        assert!(s.cgst.is_zero());
    }

    #[test]
    fn test_rounding_matches_two_decimal_rupees() {
        // ₹100 at 18%: 100 / 1.18 = 84.7457... → 84.75, GST 15.25, halves 7.625 → 7.63
        let s = split(10_000, 18.0);
        assert_eq!(s.taxable_value.paise(), 8_475);
        assert_eq!(s.gst_amount.paise(), 1_525);
        assert_eq!(s.cgst.paise(), 763);
    }

    #[test]
    fn test_compute_line_with_discount() {
        // ₹200 MRP, 10% off, 3 units at 12%
        let line = compute_line(Money::from_paise(20_000), 3, 12.0, Some(10.0));
        assert_eq!(line.unit_price.paise(), 18_000);
        assert_eq!(line.tax.gross.paise(), 54_000);
        assert_eq!(line.tax.taxable_value + line.tax.gst_amount, Money::from_paise(54_000));
    }

    #[test]
    fn test_discount_is_capped_at_full_price() {
        let line = compute_line(Money::from_paise(5_000), 1, 5.0, Some(150.0));
        assert!(line.unit_price.is_zero());
        assert!(line.tax.gross.is_zero());
    }

    #[test]
    fn test_sale_total_sums_rounded_lines() {
        let lines = [
            compute_line(Money::from_paise(10_000), 1, 18.0, None),
            compute_line(Money::from_paise(10_000), 1, 18.0, None),
        ];
        assert_eq!(sale_total(&lines).paise(), 20_000);
    }
}
