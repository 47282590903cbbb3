//! Product catalog used to resolve ids given on the command line.
//!
//! A small built-in catalog ships with the binary; `--catalog` points at a
//! JSON array of products in the same shape to use instead.

use std::path::Path;

use thiserror::Error;

use moscent_core::{CurrencyCode, Price, Product, ProductId};

const BUILTIN_CATALOG: &str = include_str!("../../data/catalog.json");

/// Errors resolving products and sizes.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    #[error("Size {size} is not available for product {product} (available: {available})")]
    UnknownSize {
        product: String,
        size: String,
        available: String,
    },
}

#[derive(Debug)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    /// Load the built-in catalog, or the file at `path` when given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a product array.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        let products = match path {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => serde_json::from_str(BUILTIN_CATALOG)?,
        };
        Ok(Self { products })
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Look up a product by id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::UnknownProduct` if no product has that id.
    pub fn product(&self, id: &str) -> Result<&Product, CatalogError> {
        self.products
            .iter()
            .find(|product| product.id.as_str() == id)
            .ok_or_else(|| CatalogError::UnknownProduct(id.to_string()))
    }

    /// Check `size` against the product's available sizes.
    ///
    /// Products without a size list accept any size.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::UnknownSize` if the size is not offered.
    pub fn check_size(product: &Product, size: Option<&str>) -> Result<(), CatalogError> {
        match size {
            Some(size)
                if !product.available_sizes.is_empty()
                    && !product.available_sizes.iter().any(|s| s == size) =>
            {
                Err(CatalogError::UnknownSize {
                    product: product.id.to_string(),
                    size: size.to_string(),
                    available: product.available_sizes.join(", "),
                })
            }
            _ => Ok(()),
        }
    }

    /// Print every product with its price.
    pub fn print(&self) {
        for product in &self.products {
            let price = Price::new(product.unit_price(), CurrencyCode::ZAR);
            let sizes = if product.available_sizes.is_empty() {
                String::new()
            } else {
                format!("  sizes: {}", product.available_sizes.join("/"))
            };
            println!(
                "{:>4}  {} ({})  {}{sizes}",
                product.id.as_str(),
                product.name,
                product.brand,
                price.display()
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_parses() {
        let catalog = Catalog::load(None).unwrap();
        assert!(!catalog.products().is_empty());
        assert_eq!(catalog.product("3").unwrap().brand, "Christian Dior");
    }

    #[test]
    fn test_unknown_product() {
        let catalog = Catalog::load(None).unwrap();
        assert!(matches!(
            catalog.product("999"),
            Err(CatalogError::UnknownProduct(_))
        ));
    }

    #[test]
    fn test_check_size() {
        let catalog = Catalog::load(None).unwrap();
        let sauvage = catalog.product("3").unwrap();
        assert!(Catalog::check_size(sauvage, Some("100")).is_ok());
        assert!(Catalog::check_size(sauvage, None).is_ok());
        assert!(Catalog::check_size(sauvage, Some("50")).is_err());
    }

    #[test]
    fn test_sale_price_is_unit_price() {
        let catalog = Catalog::load(None).unwrap();
        let chanel = catalog.product("6").unwrap();
        assert_eq!(
            Price::new(chanel.unit_price(), CurrencyCode::ZAR).display(),
            "R65.00"
        );
    }

    #[test]
    fn test_custom_catalog_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"[{"id":"X1","name":"Oud","brand":"Amouage","price":300.0}]"#,
        )
        .unwrap();

        let catalog = Catalog::load(Some(&path)).unwrap();
        assert_eq!(catalog.products().len(), 1);
        assert_eq!(catalog.product("X1").unwrap().name, "Oud");
    }
}
