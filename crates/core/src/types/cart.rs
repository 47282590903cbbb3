//! Cart entry types and the composite key that identifies a cart line.
//!
//! A cart exists in two shapes:
//!
//! - [`LocalCartEntry`] - kept in device-local storage while anonymous; nests
//!   the whole [`Product`] under `product`.
//! - [`RemoteCartEntry`] - a document in `users/{uid}/cart`; product fields
//!   are flattened and the server assigns `id` and `addedAt`.
//!
//! Application state works with [`CartLine`], which both shapes map into.
//! Within one store there is at most one entry per [`CartKey`].

use core::fmt;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{DocumentId, ProductId};
use super::price::{CurrencyCode, Price};
use super::product::Product;

// =============================================================================
// CartKey
// =============================================================================

/// Composite identity of a cart line: product id plus optional size.
///
/// Displays as `"{productId}-{size}"` when a size is selected, otherwise as
/// the bare product id. An empty size string is treated as no size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CartKey {
    pub product_id: ProductId,
    pub selected_size: Option<String>,
}

impl CartKey {
    #[must_use]
    pub fn new(product_id: ProductId, selected_size: Option<String>) -> Self {
        Self {
            product_id,
            selected_size: selected_size.filter(|size| !size.is_empty()),
        }
    }
}

impl fmt::Display for CartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.selected_size {
            Some(size) => write!(f, "{}-{size}", self.product_id),
            None => write!(f, "{}", self.product_id),
        }
    }
}

// =============================================================================
// Local representation
// =============================================================================

/// A cart line as stored under the `moScentCart` local storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalCartEntry {
    pub product: Product,
    pub quantity: u32,
    #[serde(default)]
    pub selected_size: Option<String>,
}

impl LocalCartEntry {
    #[must_use]
    pub fn key(&self) -> CartKey {
        CartKey::new(self.product.id.clone(), self.selected_size.clone())
    }
}

/// Enforce one entry per composite key.
///
/// Duplicate keys are folded into the first occurrence by summing quantities;
/// zero-quantity entries are dropped. Stored data written by older clients can
/// violate the invariant, so every load goes through here.
#[must_use]
pub fn coalesce_local(entries: Vec<LocalCartEntry>) -> Vec<LocalCartEntry> {
    let mut positions: HashMap<CartKey, usize> = HashMap::new();
    let mut merged: Vec<LocalCartEntry> = Vec::with_capacity(entries.len());

    for entry in entries {
        if entry.quantity == 0 {
            continue;
        }
        let key = entry.key();
        if let Some(existing) = positions.get(&key).and_then(|&idx| merged.get_mut(idx)) {
            existing.quantity = existing.quantity.saturating_add(entry.quantity);
        } else {
            positions.insert(key, merged.len());
            merged.push(entry);
        }
    }

    merged
}

// =============================================================================
// Remote representation
// =============================================================================

/// A document in the `users/{uid}/cart` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCartEntry {
    /// Server-generated document id.
    pub id: DocumentId,
    pub product_id: ProductId,
    pub name: String,
    pub brand: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub image_url: Option<String>,
    pub selected_size: Option<String>,
    pub quantity: u32,
    /// Server timestamp of first insertion; preserved across quantity updates.
    pub added_at: DateTime<Utc>,
}

impl RemoteCartEntry {
    #[must_use]
    pub fn key(&self) -> CartKey {
        CartKey::new(self.product_id.clone(), self.selected_size.clone())
    }
}

/// A cart document that has not been written yet.
///
/// The document store assigns `id` and the `addedAt` server timestamp on
/// creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRemoteCartEntry {
    pub product_id: ProductId,
    pub name: String,
    pub brand: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub image_url: Option<String>,
    pub selected_size: Option<String>,
    pub quantity: u32,
}

impl NewRemoteCartEntry {
    /// Flatten a product into a new remote cart document.
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32, selected_size: Option<String>) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            brand: product.brand.clone(),
            price: product.unit_price(),
            image_url: product.image.clone(),
            selected_size: selected_size.filter(|size| !size.is_empty()),
            quantity,
        }
    }

    /// Map a local entry to its remote shape.
    #[must_use]
    pub fn from_local(entry: &LocalCartEntry) -> Self {
        Self::from_product(&entry.product, entry.quantity, entry.selected_size.clone())
    }

    #[must_use]
    pub fn key(&self) -> CartKey {
        CartKey::new(self.product_id.clone(), self.selected_size.clone())
    }

    /// Materialize the document once the store has assigned id and timestamp.
    #[must_use]
    pub fn into_entry(self, id: DocumentId, added_at: DateTime<Utc>) -> RemoteCartEntry {
        RemoteCartEntry {
            id,
            product_id: self.product_id,
            name: self.name,
            brand: self.brand,
            price: self.price,
            image_url: self.image_url,
            selected_size: self.selected_size,
            quantity: self.quantity,
            added_at,
        }
    }
}

// =============================================================================
// In-memory view
// =============================================================================

/// A cart line as held in application state, independent of its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Remote document id; `None` for lines backed by local storage.
    pub id: Option<DocumentId>,
    pub product_id: ProductId,
    pub name: String,
    pub brand: String,
    pub unit_price: Decimal,
    pub image_url: Option<String>,
    pub selected_size: Option<String>,
    pub quantity: u32,
}

impl CartLine {
    #[must_use]
    pub fn key(&self) -> CartKey {
        CartKey::new(self.product_id.clone(), self.selected_size.clone())
    }

    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

impl From<&LocalCartEntry> for CartLine {
    fn from(entry: &LocalCartEntry) -> Self {
        Self {
            id: None,
            product_id: entry.product.id.clone(),
            name: entry.product.name.clone(),
            brand: entry.product.brand.clone(),
            unit_price: entry.product.unit_price(),
            image_url: entry.product.image.clone(),
            selected_size: entry.selected_size.clone(),
            quantity: entry.quantity,
        }
    }
}

impl From<&RemoteCartEntry> for CartLine {
    fn from(entry: &RemoteCartEntry) -> Self {
        Self {
            id: Some(entry.id.clone()),
            product_id: entry.product_id.clone(),
            name: entry.name.clone(),
            brand: entry.brand.clone(),
            unit_price: entry.price,
            image_url: entry.image_url.clone(),
            selected_size: entry.selected_size.clone(),
            quantity: entry.quantity,
        }
    }
}

/// Totals shown on the cart page and in the navbar badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartSummary {
    /// Number of distinct cart lines.
    pub line_count: usize,
    /// Sum of quantities across all lines.
    pub total_quantity: u64,
    pub subtotal: Price,
}

impl CartSummary {
    #[must_use]
    pub fn from_lines(lines: &[CartLine]) -> Self {
        let subtotal = lines.iter().map(CartLine::line_total).sum::<Decimal>();
        Self {
            line_count: lines.len(),
            total_quantity: lines.iter().map(|line| u64::from(line.quantity)).sum(),
            subtotal: Price::new(subtotal, CurrencyCode::ZAR),
        }
    }
}
