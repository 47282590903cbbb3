//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! moscent cart add 3 --size 100 --quantity 2
//! moscent cart qty 3 5 --size 100
//! moscent cart remove 3 --size 100
//! moscent cart show
//! moscent cart clear
//! ```

use moscent_core::{CartKey, CurrencyCode, Price, ProductId};
use moscent_storefront::Storefront;

use super::catalog::{Catalog, CatalogError};

/// Add a catalog product to the cart.
///
/// # Errors
///
/// Returns an error if the product or size is not in the catalog.
pub async fn add(
    engine: &Storefront,
    catalog: &Catalog,
    product_id: &str,
    size: Option<String>,
    quantity: u32,
) -> Result<(), CatalogError> {
    let product = catalog.product(product_id)?;
    Catalog::check_size(product, size.as_deref())?;
    engine.add_item(product, quantity, size).await;
    show(engine);
    Ok(())
}

pub async fn remove(engine: &Storefront, product_id: &str, size: Option<String>) {
    engine
        .remove_item(&CartKey::new(ProductId::new(product_id), size))
        .await;
    show(engine);
}

pub async fn set_quantity(
    engine: &Storefront,
    product_id: &str,
    size: Option<String>,
    quantity: i64,
) {
    engine
        .update_quantity(&CartKey::new(ProductId::new(product_id), size), quantity)
        .await;
    show(engine);
}

pub async fn clear(engine: &Storefront) {
    engine.clear_cart().await;
    show(engine);
}

/// Print the cart with line totals and the subtotal.
pub fn show(engine: &Storefront) {
    let snapshot = engine.state().snapshot();
    if snapshot.cart.is_empty() {
        println!("Cart is empty");
        return;
    }

    for line in &snapshot.cart {
        let size = line
            .selected_size
            .as_deref()
            .map(|size| format!(" {size}ml"))
            .unwrap_or_default();
        println!(
            "{:<8} {}{size} ({})  x{}  {}",
            line.key().to_string(),
            line.name,
            line.brand,
            line.quantity,
            Price::new(line.line_total(), CurrencyCode::ZAR).display()
        );
    }

    let summary = snapshot.summary();
    println!(
        "{} item(s), subtotal {}",
        summary.total_quantity,
        summary.subtotal.display()
    );
}
