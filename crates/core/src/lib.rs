//! MoScent Core - Shared types library.
//!
//! This crate provides the domain types used by every MoScent component:
//! - `storefront` - Cart and favorites sync engine
//! - `cli` - Command-line shopper for the local cart
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no storage
//! backends, no async runtime. Everything that touches local storage or the
//! document database lives in the storefront crate.
//!
//! # Modules
//!
//! - [`types`] - Ids, prices, products, cart entries, favorites and sessions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
