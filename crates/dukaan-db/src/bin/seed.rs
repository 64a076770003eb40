//! # Seed Data Generator
//!
//! Populates a development database with kirana and electronics products,
//! and optionally a history of sales for the reports.
//!
//! ## Usage
//! ```bash
//! # Generate 500 products (default)
//! cargo run -p dukaan-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p dukaan-db --bin seed -- --count 2000
//!
//! # Specify database path and add 300 sales over the last 90 days
//! cargo run -p dukaan-db --bin seed -- --db ./data/dukaan.db --sales 300
//! ```
//!
//! ## Generated Products
//! Each product has:
//! - Product code: `{CATEGORY}-{BRAND}-{INDEX}`
//! - Name with pack size, e.g. "Tata Salt 1kg"
//! - MRP derived from the pack size
//! - Stock: 0 - 60
//! - HSN code and GST slab of its category
//! - An in-store EAN-13 barcode assigned by the repository

use chrono::{Duration, Local};
use dukaan_core::{Money, Page, PaymentMethod, ProductFilter, ProductInput, SaleItemRequest, SaleRequest};
use dukaan_db::{Database, DbConfig};
use std::env;

/// (code, category, sub-category, HSN, GST %, [(brand, item)])
type Category = (&'static str, &'static str, &'static str, &'static str, f64, &'static [(&'static str, &'static str)]);

const CATEGORIES: &[Category] = &[
    (
        "STP",
        "Grocery",
        "Staples",
        "1006",
        5.0,
        &[
            ("India Gate", "Basmati Rice"),
            ("Aashirvaad", "Atta"),
            ("Fortune", "Sunflower Oil"),
            ("Tata", "Toor Dal"),
            ("Tata", "Salt"),
            ("Madhur", "Sugar"),
        ],
    ),
    (
        "SNK",
        "Grocery",
        "Snacks",
        "1905",
        18.0,
        &[
            ("Parle", "Parle-G Biscuits"),
            ("Britannia", "Good Day"),
            ("Haldiram's", "Aloo Bhujia"),
            ("Lay's", "Magic Masala"),
            ("Bikaji", "Khatta Meetha"),
        ],
    ),
    (
        "BEV",
        "Grocery",
        "Beverages",
        "0902",
        5.0,
        &[
            ("Tata Tea", "Premium"),
            ("Red Label", "Tea"),
            ("Bru", "Instant Coffee"),
            ("Society", "Masala Tea"),
        ],
    ),
    (
        "PCR",
        "Personal Care",
        "Bath",
        "3401",
        18.0,
        &[
            ("Lifebuoy", "Soap"),
            ("Dettol", "Handwash"),
            ("Colgate", "Toothpaste"),
            ("Clinic Plus", "Shampoo"),
        ],
    ),
    (
        "APL",
        "Appliances",
        "Kitchen",
        "8509",
        18.0,
        &[
            ("Bajaj", "Mixer Grinder"),
            ("Prestige", "Induction Cooktop"),
            ("Philips", "Hand Blender"),
            ("Pigeon", "Electric Kettle"),
        ],
    ),
    (
        "ELC",
        "Electricals",
        "Lighting",
        "8539",
        12.0,
        &[
            ("Syska", "LED Bulb"),
            ("Philips", "LED Batten"),
            ("Havells", "Extension Board"),
        ],
    ),
];

/// Pack sizes with their unit and price multiplier.
const SIZES: &[(&str, &str, i64)] = &[
    ("100g", "pcs", 1),
    ("250g", "pcs", 2),
    ("500g", "pcs", 4),
    ("1kg", "kg", 7),
    ("5kg", "kg", 30),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 500;
    let mut sales: usize = 0;
    let mut db_path = String::from("./dukaan_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(500);
                    i += 1;
                }
            }
            "--sales" | "-s" => {
                if i + 1 < args.len() {
                    sales = args[i + 1].parse().unwrap_or(0);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Dukaan POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 500)");
                println!("  -s, --sales <N>    Number of sales to record (default: 0)");
                println!("  -d, --db <PATH>    Database file path (default: ./dukaan_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Dukaan POS Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!("Sales:    {}", sales);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, schema version {}", db.schema_version().await?);

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let rows = generate_products(count);
    let summary = db.products().bulk_import(&rows).await?;

    println!(
        "✓ Imported {} products ({} skipped) in {:?}",
        summary.imported,
        summary.skipped,
        start.elapsed()
    );

    if sales > 0 {
        let recorded = seed_sales(&db, sales).await?;
        println!("✓ Recorded {} sales", recorded);
    }

    let stats = db.reports().dashboard().await?;
    println!();
    println!("  Products:        {}", stats.total_products);
    println!("  Low stock:       {}", stats.low_stock_products);
    println!("  Sales this year: {}", stats.year_sales);

    db.close().await;
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn generate_products(count: usize) -> Vec<ProductInput> {
    let mut rows = Vec::with_capacity(count);
    let mut seed = 0usize;

    'outer: for (code, category, sub_category, hsn, gst, items) in CATEGORIES {
        for (brand, item) in items.iter() {
            for (size, unit, multiplier) in SIZES {
                if rows.len() >= count {
                    break 'outer;
                }
                rows.push(generate_product(
                    code,
                    category,
                    sub_category,
                    hsn,
                    *gst,
                    brand,
                    item,
                    size,
                    unit,
                    *multiplier,
                    seed,
                ));
                seed += 1;
            }
        }
    }

    // Past the catalogue size, repeat it with numbered variants
    while rows.len() < count {
        let base = rows[seed % rows.len().max(1)].clone();
        rows.push(ProductInput {
            product_id: base.product_id.as_ref().map(|c| format!("{c}-V{seed}")),
            name: format!("{} (V{})", base.name, seed),
            ..base
        });
        seed += 1;
    }

    rows
}

#[allow(clippy::too_many_arguments)]
fn generate_product(
    code: &str,
    category: &str,
    sub_category: &str,
    hsn: &str,
    gst: f64,
    brand: &str,
    item: &str,
    size: &str,
    unit: &str,
    multiplier: i64,
    seed: usize,
) -> ProductInput {
    let brand_code: String = brand
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(4)
        .collect::<String>()
        .to_uppercase();

    // Base MRP ₹20 - ₹99, scaled by pack size, ending in 0 or 5
    let base = 20 + ((seed * 37) % 80) as i64;
    let rupees = (base * multiplier / 5).max(1) * 5;

    ProductInput {
        product_id: Some(format!("{code}-{brand_code}-{seed:04}")),
        name: format!("{brand} {item} {size}"),
        price: Money::from_rupees(rupees, 0),
        stock: (seed % 61) as i64,
        category: Some(category.to_string()),
        sub_category: Some(sub_category.to_string()),
        brand: Some(brand.to_string()),
        model_name: None,
        unit: Some(unit.to_string()),
        hsn_code: Some(hsn.to_string()),
        gst_percent: gst,
        barcode_value: None,
    }
}

/// Records `count` sales of one to four lines, spread over the last 90 days.
async fn seed_sales(db: &Database, count: usize) -> Result<usize, Box<dyn std::error::Error>> {
    let catalogue = db.products().list(&ProductFilter::default(), Page::new(1, 1_000)).await?.items;
    if catalogue.is_empty() {
        return Ok(0);
    }

    let now = Local::now().naive_local();
    let payments = [PaymentMethod::Cash, PaymentMethod::Upi, PaymentMethod::Card];
    let mut recorded = 0;

    for n in 0..count {
        let lines = 1 + n % 4;
        let items = (0..lines)
            .map(|k| {
                let product = &catalogue[(n * 7 + k * 13) % catalogue.len()];
                SaleItemRequest {
                    product_row_id: Some(product.id),
                    product_code: product.product_id.clone(),
                    name: product.name.clone(),
                    price: product.price,
                    quantity: 1 + ((n + k) % 3) as i64,
                    hsn_code: product.hsn_code.clone(),
                    gst_percent: product.gst_percent,
                    discount_percent: None,
                }
            })
            .collect();

        let request = SaleRequest {
            items,
            timestamp: Some(now - Duration::days((n % 90) as i64) - Duration::minutes((n * 11 % 600) as i64)),
            payment_method: payments[n % payments.len()],
            ..Default::default()
        };

        db.sales().record_sale(&request).await?;
        recorded += 1;
    }

    Ok(recorded)
}
