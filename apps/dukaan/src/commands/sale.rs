//! # Sale Commands

use dukaan_core::{SaleReceipt, SaleRequest};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppContext;

/// Records a checkout: the sale, its GST-split items and the stock
/// decrements, all or nothing.
///
/// ## Returns
/// - `Ok(SaleReceipt)` with the new sale id and the invoice number used
/// - `Err(ApiError)` for an empty cart, a bad line, insufficient stock
///   under `reject_insufficient`, or a storage failure (rolled back)
pub async fn record_sale(ctx: &AppContext, request: SaleRequest) -> Result<SaleReceipt, ApiError> {
    debug!(
        items = request.items.len(),
        payment = %request.payment_method,
        "record_sale command"
    );

    ctx.db().sales().record_sale(&request).await.map_err(|e| {
        warn!(error = %e, "Sale not recorded");
        ApiError::from(e)
    })
}
