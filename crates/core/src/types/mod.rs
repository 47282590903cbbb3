//! Core types for MoScent.
//!
//! This module provides type-safe wrappers for the cart and favorites domain.

pub mod cart;
pub mod favorites;
pub mod id;
pub mod price;
pub mod product;
pub mod session;

pub use cart::{
    CartKey, CartLine, CartSummary, LocalCartEntry, NewRemoteCartEntry, RemoteCartEntry,
    coalesce_local,
};
pub use favorites::FavoriteSet;
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use product::{Product, favorite_products};
pub use session::{AuthUser, Session, StorageTarget};
