//! # Domain Types
//!
//! Core domain types used throughout Dukaan POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    SaleItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (rowid)     │   │  id (rowid)     │   │  sale_id        │       │
//! │  │  product_id     │   │  invoice_no     │   │  name (frozen)  │       │
//! │  │  barcode_value  │   │  total          │   │  price (frozen) │       │
//! │  │  price (MRP)    │   │  timestamp      │   │  taxable, gst   │       │
//! │  │  stock          │   │  customer_*     │   │  cgst = sgst    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │ PaymentMethod   │   │  StockPolicy    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Cash / Card    │   │  AllowNegative  │       │
//! │  │  1800 = 18%     │   │  Upi / Mixed    │   │  Reject...      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! A product has:
//! - `id`: SQLite rowid, used by sales to decrement stock
//! - `product_id`: the shop's own item code, optional and unique
//! - `barcode_value`: what the scanner reads, optional and unique
//!
//! Sale items reference products by **snapshot**: `name`, `price`, HSN and
//! GST rate are copied at checkout so that editing or deleting a product
//! never rewrites a printed invoice.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1800 bps = 18% (standard GST slab)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage as stored in `gst_percent`.
    ///
    /// Negative or non-finite input maps to zero.
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate(bps_from_percentage(pct))
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for storage and display).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

/// Converts a 0-100 percentage into basis points, rounding to the nearest
/// basis point.
pub fn bps_from_percentage(pct: f64) -> u32 {
    if !pct.is_finite() || pct <= 0.0 {
        return 0;
    }
    (pct * 100.0).round() as u32
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Row id.
    pub id: i64,

    /// The shop's own item code.
    pub product_id: Option<String>,

    /// Display name shown to cashier and on the invoice.
    pub name: String,

    /// MRP, tax inclusive.
    pub price: Money,

    /// Quantity on hand. Expected non-negative but not enforced.
    pub stock: i64,

    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub brand: Option<String>,
    pub model_name: Option<String>,

    /// Selling unit (pcs, kg, ltr, ...).
    pub unit: Option<String>,

    pub hsn_code: Option<String>,

    /// GST rate as a percentage (0, 5, 12, 18, 28).
    pub gst_percent: f64,

    /// Scanner barcode. In-store products get a generated EAN-13.
    pub barcode_value: Option<String>,
}

impl Product {
    /// Returns the GST rate.
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_percentage(self.gst_percent)
    }
}

/// Fields accepted when adding or editing a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductInput {
    pub product_id: Option<String>,
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub stock: i64,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub brand: Option<String>,
    pub model_name: Option<String>,
    pub unit: Option<String>,
    pub hsn_code: Option<String>,
    #[serde(default)]
    pub gst_percent: f64,
    /// Leave empty to have an in-store barcode generated.
    pub barcode_value: Option<String>,
}

/// Catalogue listing filter. Empty fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub brand: Option<String>,
    /// Substring of name, barcode or product code.
    pub search: Option<String>,
}

/// Distinct values for catalogue filter drop-downs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductFacets {
    pub categories: Vec<String>,
    pub sub_categories: Vec<String>,
    pub brands: Vec<String>,
}

/// Outcome of a bulk product import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

// =============================================================================
// Stock Policy
// =============================================================================

/// What the sale engine does when a line would take stock below zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockPolicy {
    /// `stock = stock - qty`, stock may go negative.
    #[default]
    AllowNegative,
    /// `stock = stock - qty WHERE stock >= qty`, the whole sale fails
    /// with insufficient stock otherwise.
    RejectInsufficient,
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    #[serde(alias = "UPI")]
    Upi,
    /// Split tender (part cash, part card/UPI).
    Mixed,
}

impl PaymentMethod {
    /// The value stored in `sales.payment_method`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Card",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::Mixed => "Mixed",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "upi" => Ok(PaymentMethod::Upi),
            "mixed" => Ok(PaymentMethod::Mixed),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A recorded sale. Immutable once written.
///
/// `payment_method` and `timestamp` stay plain text: files from older
/// releases hold values outside the current enum and ISO-8601 timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: i64,
    /// Sum of the items' `taxable_value + gst_amount`.
    pub total: Money,
    pub timestamp: String,
    pub invoice_no: Option<String>,
    pub payment_method: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_gstin: Option<String>,
}

/// A line item in a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    /// Product code at time of sale. Not a foreign key.
    pub product_id: Option<String>,
    pub name: String,
    /// Unit rate charged, after any line discount.
    pub price: Money,
    pub quantity: i64,
    pub hsn_code: Option<String>,
    pub gst_percent: f64,
    pub taxable_value: Money,
    pub gst_amount: Money,
    pub cgst: Money,
    pub sgst: Money,
}

impl SaleItem {
    /// `taxable_value + gst_amount`, equal to `price × quantity`.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.taxable_value + self.gst_amount
    }
}

// =============================================================================
// Sale Request / Receipt
// =============================================================================

/// One cart line submitted for checkout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItemRequest {
    /// Product row to decrement stock on. `None` for ad hoc items.
    pub product_row_id: Option<i64>,
    /// Product code copied into the sale item.
    pub product_code: Option<String>,
    pub name: String,
    /// Unit MRP, tax inclusive.
    pub price: Money,
    pub quantity: i64,
    pub hsn_code: Option<String>,
    #[serde(default)]
    pub gst_percent: f64,
    /// Optional line discount, 0-100.
    pub discount_percent: Option<f64>,
}

/// A checkout submitted to the sale engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleRequest {
    pub items: Vec<SaleItemRequest>,
    /// Caller-supplied invoice number. Generated when absent.
    pub invoice_no: Option<String>,
    /// Caller-supplied timestamp. Clock time when absent.
    #[ts(as = "Option<String>")]
    pub timestamp: Option<chrono::NaiveDateTime>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_gstin: Option<String>,
}

/// Returned after a sale is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleReceipt {
    pub sale_id: i64,
    pub invoice_no: String,
    pub total: Money,
}

// =============================================================================
// Store Settings
// =============================================================================

/// Business profile printed on invoices. Singleton row `id = 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct StoreSettings {
    pub store_name: Option<String>,
    pub store_address: Option<String>,
    pub store_subtitle: Option<String>,
    pub store_phone: Option<String>,
    pub store_gstin: Option<String>,
    pub store_footer: Option<String>,
    pub store_fssai: Option<String>,
    pub label_printer_name: Option<String>,
}

// =============================================================================
// Reporting Types
// =============================================================================

/// Inclusive date range plus free-text search over invoice number and
/// customer name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct ReportFilter {
    #[ts(as = "Option<String>")]
    pub from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub to: Option<NaiveDate>,
    pub search: Option<String>,
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 1_000),
        }
    }

    /// SQL `LIMIT`.
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page.clamp(1, 1_000))
    }

    /// SQL `OFFSET`.
    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * self.limit()
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new(1, crate::DEFAULT_PAGE_SIZE)
    }
}

/// One page of results plus the unpaged total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Default for Paged<T> {
    fn default() -> Self {
        let page = Page::default();
        Self {
            items: Vec::new(),
            total: 0,
            page: page.page,
            per_page: page.per_page,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TopProduct {
    pub name: String,
    pub quantity: i64,
    pub revenue: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthlySales {
    /// `YYYY-MM`.
    pub month: String,
    pub total: Money,
    pub invoices: i64,
}

/// Home screen figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardStats {
    pub today_sales: Money,
    pub today_invoices: i64,
    pub month_sales: Money,
    pub year_sales: Money,
    pub total_products: i64,
    /// Products at or below the low-stock threshold.
    pub low_stock_products: i64,
    pub top_products: Vec<TopProduct>,
    /// Last twelve months, oldest first.
    pub monthly_sales: Vec<MonthlySales>,
}

/// A row of the invoice list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceSummary {
    pub id: i64,
    pub invoice_no: Option<String>,
    pub timestamp: String,
    pub total: Money,
    pub payment_method: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub item_count: i64,
}

/// Header plus line items of one invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceDetails {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// GST liability of one (HSN code, rate) slab.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GstSummaryRow {
    pub hsn_code: String,
    pub gst_percent: f64,
    pub quantity: i64,
    pub taxable_value: Money,
    pub cgst: Money,
    pub sgst: Money,
    pub gst_amount: Money,
    pub total: Money,
}

/// Grand GST totals over a filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GstTotals {
    pub invoice_count: i64,
    pub taxable_value: Money,
    pub cgst: Money,
    pub sgst: Money,
    pub gst_amount: Money,
    pub total: Money,
}

/// Denormalized sale × item row for spreadsheet export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExportRow {
    pub invoice_no: Option<String>,
    pub timestamp: String,
    pub payment_method: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_gstin: Option<String>,
    pub item_name: String,
    pub hsn_code: Option<String>,
    pub quantity: i64,
    pub price: Money,
    pub gst_percent: f64,
    pub taxable_value: Money,
    pub cgst: Money,
    pub sgst: Money,
    pub gst_amount: Money,
    pub line_total: Money,
}

// =============================================================================
// Backup
// =============================================================================

/// Every table a backup carries. Restoring replaces all four.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct FullDump {
    pub products: Vec<Product>,
    pub sales: Vec<Sale>,
    pub sale_items: Vec<SaleItem>,
    pub store_settings: Option<StoreSettings>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_percentage() {
        assert_eq!(TaxRate::from_percentage(18.0).bps(), 1800);
        assert_eq!(TaxRate::from_percentage(2.5).bps(), 250);
        assert_eq!(TaxRate::from_percentage(-5.0).bps(), 0);
        assert_eq!(TaxRate::from_percentage(f64::NAN).bps(), 0);
        assert!((TaxRate::from_bps(1200).percentage() - 12.0).abs() < 0.001);
    }

    #[test]
    fn test_payment_method_round_trips_through_text() {
        assert_eq!("UPI".parse::<PaymentMethod>(), Ok(PaymentMethod::Upi));
        assert_eq!(" cash ".parse::<PaymentMethod>(), Ok(PaymentMethod::Cash));
        assert!("cheque".parse::<PaymentMethod>().is_err());
        assert_eq!(PaymentMethod::Mixed.to_string(), "Mixed");
    }

    #[test]
    fn test_payment_method_json() {
        let json = serde_json::to_string(&PaymentMethod::Upi).unwrap();
        assert_eq!(json, "\"Upi\"");
        let parsed: PaymentMethod = serde_json::from_str("\"UPI\"").unwrap();
        assert_eq!(parsed, PaymentMethod::Upi);
    }

    #[test]
    fn test_stock_policy_default() {
        assert_eq!(StockPolicy::default(), StockPolicy::AllowNegative);
        let parsed: StockPolicy = serde_json::from_str("\"reject_insufficient\"").unwrap();
        assert_eq!(parsed, StockPolicy::RejectInsufficient);
    }

    #[test]
    fn test_page_offsets() {
        assert_eq!(Page::new(1, 50).offset(), 0);
        assert_eq!(Page::new(3, 20).offset(), 40);
        assert_eq!(Page::new(0, 0).limit(), 1);
        assert_eq!(Page::default().per_page, crate::DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_sale_request_json_defaults() {
        let json = r#"{
            "items": [{"product_row_id": 7, "product_code": null, "name": "Tata Salt 1kg",
                       "price": 28, "quantity": 2, "hsn_code": "2501", "discount_percent": null}],
            "invoice_no": null, "timestamp": null,
            "customer_name": null, "customer_phone": null, "customer_gstin": null
        }"#;
        let req: SaleRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.payment_method, PaymentMethod::Cash);
        assert_eq!(req.items[0].price.paise(), 2_800);
        assert_eq!(req.items[0].gst_percent, 0.0);
    }
}
