//! # Product Commands
//!
//! Catalogue maintenance and the lookups behind the billing screen.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Scanner ──► find_product_by_barcode ──► cart line (UI)                │
//! │  Search  ──► list_products (filter + page)                             │
//! │  Admin   ──► add / update / delete / regenerate_barcode                │
//! │  CSV     ──► bulk_import_products (rows parsed by the UI layer)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use dukaan_core::{ImportSummary, Page, Paged, Product, ProductFacets, ProductFilter, ProductInput};
use tracing::debug;

use crate::commands::or_empty;
use crate::error::ApiError;
use crate::state::AppContext;

/// Adds a product. A blank barcode gets the next in-store EAN-13.
pub async fn add_product(ctx: &AppContext, input: ProductInput) -> Result<Product, ApiError> {
    debug!(name = %input.name, "add_product command");
    Ok(ctx.db().products().add(&input).await?)
}

/// Replaces a product's fields. A blank barcode keeps the current one.
pub async fn update_product(ctx: &AppContext, id: i64, input: ProductInput) -> Result<Product, ApiError> {
    debug!(id, "update_product command");
    Ok(ctx.db().products().update(id, &input).await?)
}

/// Deletes a product. Past sale items keep their snapshot.
pub async fn delete_product(ctx: &AppContext, id: i64) -> Result<(), ApiError> {
    debug!(id, "delete_product command");
    Ok(ctx.db().products().delete(id).await?)
}

/// Assigns a fresh in-store barcode and returns it.
pub async fn regenerate_barcode(ctx: &AppContext, id: i64) -> Result<String, ApiError> {
    debug!(id, "regenerate_barcode command");
    Ok(ctx.db().products().regenerate_barcode(id).await?)
}

/// Imports rows in one transaction. Invalid or duplicate rows are skipped
/// and counted.
pub async fn bulk_import_products(ctx: &AppContext, rows: Vec<ProductInput>) -> Result<ImportSummary, ApiError> {
    debug!(rows = rows.len(), "bulk_import_products command");
    Ok(ctx.db().products().bulk_import(&rows).await?)
}

pub async fn get_product(ctx: &AppContext, id: i64) -> Option<Product> {
    or_empty("get_product", ctx.db().products().get_by_id(id).await)
}

pub async fn find_product_by_barcode(ctx: &AppContext, barcode: String) -> Option<Product> {
    debug!(%barcode, "find_product_by_barcode command");
    or_empty("find_product_by_barcode", ctx.db().products().find_by_barcode(&barcode).await)
}

/// Products, newest first.
pub async fn list_products(ctx: &AppContext, filter: ProductFilter, page: Page) -> Paged<Product> {
    debug!(?filter, page = page.page, "list_products command");
    or_empty("list_products", ctx.db().products().list(&filter, page).await)
}

/// Distinct categories, sub-categories and brands for the filter menus.
pub async fn product_facets(ctx: &AppContext) -> ProductFacets {
    or_empty("product_facets", ctx.db().products().facets().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{context, stocked};
    use crate::error::ErrorCode;
    use dukaan_core::Money;

    fn input(code: &str, name: &str) -> ProductInput {
        ProductInput {
            product_id: Some(code.to_string()),
            name: name.to_string(),
            price: Money::from_rupees(55, 0),
            stock: 12,
            category: Some("Grocery".to_string()),
            brand: Some("Amul".to_string()),
            gst_percent: 5.0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_add_assigns_barcode_and_scanner_finds_it() {
        let ctx = context().await;
        let butter = add_product(&ctx, input("AMUL-BTR", "Amul Butter 100g")).await.unwrap();

        let barcode = butter.barcode_value.clone().unwrap();
        assert_eq!(barcode.len(), 13);
        assert!(barcode.starts_with("200"));

        let scanned = find_product_by_barcode(&ctx, barcode).await.unwrap();
        assert_eq!(scanned.id, butter.id);
    }

    #[tokio::test]
    async fn test_duplicate_code_is_reported() {
        let ctx = context().await;
        add_product(&ctx, input("AMUL-BTR", "Amul Butter 100g")).await.unwrap();

        let err = add_product(&ctx, input("AMUL-BTR", "Amul Butter 500g")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Duplicate);
    }

    #[tokio::test]
    async fn test_update_delete_and_missing() {
        let ctx = context().await;
        let product = stocked(&ctx, "PARLE-G", "Parle-G 250g", 25, 40).await;

        let mut edited = input("PARLE-G", "Parle-G 250g");
        edited.stock = 100;
        let updated = update_product(&ctx, product.id, edited).await.unwrap();
        assert_eq!(updated.stock, 100);
        assert_eq!(updated.barcode_value, product.barcode_value);

        delete_product(&ctx, product.id).await.unwrap();
        assert!(get_product(&ctx, product.id).await.is_none());

        let err = delete_product(&ctx, product.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_bulk_import_then_list_and_facets() {
        let ctx = context().await;
        let rows = vec![
            input("AMUL-BTR", "Amul Butter 100g"),
            input("AMUL-CHS", "Amul Cheese Slices"),
            input("AMUL-BTR", "Amul Butter again"),
            ProductInput::default(),
        ];

        let summary = bulk_import_products(&ctx, rows).await.unwrap();
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.skipped, 2);

        let filter = ProductFilter {
            search: Some("Cheese".to_string()),
            ..Default::default()
        };
        let page = list_products(&ctx, filter, Page::default()).await;
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "Amul Cheese Slices");

        let facets = product_facets(&ctx).await;
        assert_eq!(facets.brands, vec!["Amul".to_string()]);
        assert_eq!(facets.categories, vec!["Grocery".to_string()]);
    }

    #[tokio::test]
    async fn test_regenerate_barcode_changes_it() {
        let ctx = context().await;
        let product = stocked(&ctx, "PARLE-G", "Parle-G 250g", 25, 40).await;

        let fresh = regenerate_barcode(&ctx, product.id).await.unwrap();
        assert_ne!(Some(fresh.clone()), product.barcode_value);
        assert_eq!(get_product(&ctx, product.id).await.unwrap().barcode_value, Some(fresh));
    }
}
