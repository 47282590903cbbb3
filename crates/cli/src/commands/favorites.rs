//! Favorites commands.

use moscent_core::favorite_products;
use moscent_storefront::Storefront;

use super::catalog::{Catalog, CatalogError};

/// Toggle a catalog product in favorites.
///
/// # Errors
///
/// Returns an error if the product is not in the catalog.
pub async fn toggle(
    engine: &Storefront,
    catalog: &Catalog,
    product_id: &str,
) -> Result<(), CatalogError> {
    let product = catalog.product(product_id)?;
    engine.toggle_favorite(&product.id).await;

    if engine.state().snapshot().favorites.contains(&product.id) {
        println!("Added {} to favorites", product.name);
    } else {
        println!("Removed {} from favorites", product.name);
    }
    Ok(())
}

/// Print favorite products in catalog order.
pub fn show(engine: &Storefront, catalog: &Catalog) {
    let favorites = engine.state().snapshot().favorites;
    let products = favorite_products(catalog.products(), &favorites);
    if products.is_empty() {
        println!("No favorites yet");
        return;
    }
    for product in products {
        println!("{:>4}  {} ({})", product.id.as_str(), product.name, product.brand);
    }
}
