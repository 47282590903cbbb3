//! Catalog product as carried inside local cart entries.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::favorites::FavoriteSet;
use super::id::ProductId;

/// A fragrance from the catalog.
///
/// Only the fields the cart needs are modelled; unknown fields in stored
/// JSON (descriptions, ratings, stock) are ignored on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    /// List price in rand.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Sale price; `0` or absent means not on sale.
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub discounted_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_sizes: Vec<String>,
}

impl Product {
    /// Price charged per unit: the sale price when one is set, else list price.
    #[must_use]
    pub fn unit_price(&self) -> Decimal {
        match self.discounted_price {
            Some(discounted) if discounted > Decimal::ZERO => discounted,
            _ => self.price,
        }
    }
}

/// Catalog products that are in the favorites set, in catalog order.
#[must_use]
pub fn favorite_products<'a>(catalog: &'a [Product], favorites: &FavoriteSet) -> Vec<&'a Product> {
    catalog
        .iter()
        .filter(|product| favorites.contains(&product.id))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(id: &str, price: Decimal, discounted: Option<Decimal>) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Fragrance {id}"),
            brand: "Versace".to_string(),
            price,
            discounted_price: discounted,
            image: None,
            available_sizes: Vec::new(),
        }
    }

    #[test]
    fn test_unit_price_prefers_discount() {
        assert_eq!(product("1", dec!(70), Some(dec!(55))).unit_price(), dec!(55));
    }

    #[test]
    fn test_unit_price_ignores_zero_discount() {
        assert_eq!(product("1", dec!(70), Some(dec!(0))).unit_price(), dec!(70));
        assert_eq!(product("1", dec!(70), None).unit_price(), dec!(70));
    }

    #[test]
    fn test_deserialize_catalog_json_shape() {
        let json = r#"{
            "id": "1",
            "name": "Versace Pour Homme (30ml)",
            "brand": "Versace",
            "price": 70.00,
            "discountedPrice": 0,
            "image": "versace-pour-homme.webp",
            "category": "men",
            "rating": 4.5,
            "stock": 0
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, ProductId::new("1"));
        assert_eq!(product.price, dec!(70));
        assert_eq!(product.unit_price(), dec!(70));
        assert!(product.available_sizes.is_empty());
    }

    #[test]
    fn test_favorite_products_keeps_catalog_order() {
        let catalog = vec![
            product("1", dec!(70), None),
            product("2", dec!(80), None),
            product("3", dec!(90), None),
        ];
        let favorites: FavoriteSet = ["3", "1"].into_iter().map(ProductId::new).collect();

        let ids: Vec<_> = favorite_products(&catalog, &favorites)
            .into_iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
    }
}
