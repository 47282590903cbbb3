//! moScent cart and favorites sync engine.
//!
//! Keeps a shopper's cart and favorites in device-local storage while they
//! are anonymous (or have not verified their email), merges that state into
//! their remote collections once a verified user signs in, and mirrors the
//! remote collections live from then on.
//!
//! The engine is driven by three injected boundaries: an [`AuthSession`], a
//! [`DocumentStore`] and a [`LocalStore`]. Start it with
//! [`Storefront::start`], read from [`Storefront::state`], and write through
//! the mutators on [`Storefront`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod engine;
pub mod error;
pub mod local;
pub mod merge;
mod mutators;
pub mod remote;
pub mod session;
pub mod state;
pub mod sync;
pub mod telemetry;

pub use config::{ConfigError, SyncConfig};
pub use engine::Storefront;
pub use error::SyncError;
pub use local::{FileKeyValueStore, KeyValueStore, LocalStore, MemoryKeyValueStore};
pub use merge::QuantityMergePolicy;
pub use remote::{DocumentStore, MemoryDocumentStore, RemoteError};
pub use session::{AuthSession, MemoryAuthSession};
pub use state::{ShopSnapshot, ShopState};
