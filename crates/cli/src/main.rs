//! MoScent CLI - cart and favorites from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # List the catalog
//! moscent products
//!
//! # Add two 100ml bottles of product 3
//! moscent cart add 3 --size 100 --quantity 2
//!
//! # Show the cart
//! moscent cart show
//!
//! # Toggle a favorite
//! moscent favorites toggle 6
//! ```
//!
//! # Commands
//!
//! - `products` - List catalog products
//! - `cart show|add|remove|qty|clear` - Manage the cart
//! - `favorites show|toggle` - Manage favorites
//!
//! The CLI shops anonymously, so every change lands in the local store file
//! (`MOSCENT_LOCAL_STORE_PATH`) and persists across invocations.

#![cfg_attr(not(test), forbid(unsafe_code))]
// Terminal output is this binary's interface
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use moscent_storefront::{
    FileKeyValueStore, LocalStore, MemoryAuthSession, MemoryDocumentStore, Storefront, SyncConfig,
    telemetry,
};

mod commands;

use commands::catalog::Catalog;

#[derive(Parser)]
#[command(name = "moscent")]
#[command(author, version, about = "MoScent cart and favorites")]
struct Cli {
    /// Product catalog JSON file (defaults to the built-in catalog)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Local store file (overrides `MOSCENT_LOCAL_STORE_PATH`)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog products
    Products,
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and subtotal
    Show,
    /// Add a product to the cart
    Add {
        /// Product ID
        product_id: String,

        /// Bottle size in ml
        #[arg(short, long)]
        size: Option<String>,

        /// Number of units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a cart line
    Remove {
        /// Product ID
        product_id: String,

        /// Bottle size in ml
        #[arg(short, long)]
        size: Option<String>,
    },
    /// Set the quantity of a cart line (zero or less removes it)
    Qty {
        /// Product ID
        product_id: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,

        /// Bottle size in ml
        #[arg(short, long)]
        size: Option<String>,
    },
    /// Remove every cart line
    Clear,
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// Show favorite products
    Show,
    /// Add or remove a favorite
    Toggle {
        /// Product ID
        product_id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match SyncConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = telemetry::init_sentry(&config);
    telemetry::init_tracing("moscent_storefront=warn,moscent=info");

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: SyncConfig) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::load(cli.catalog.as_deref())?;

    if matches!(cli.command, Commands::Products) {
        catalog.print();
        return Ok(());
    }

    let store_path = cli.store.unwrap_or_else(|| config.local_store_path.clone());
    tracing::debug!(path = %store_path.display(), "Using local store");
    let local = LocalStore::new(Arc::new(FileKeyValueStore::new(store_path)));

    let engine = Storefront::start(
        Arc::new(MemoryAuthSession::new()),
        Arc::new(MemoryDocumentStore::new()),
        local,
        &config,
    );
    engine.wait_ready().await;

    match cli.command {
        Commands::Products => {}
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&engine),
            CartAction::Add {
                product_id,
                size,
                quantity,
            } => commands::cart::add(&engine, &catalog, &product_id, size, quantity).await?,
            CartAction::Remove { product_id, size } => {
                commands::cart::remove(&engine, &product_id, size).await;
            }
            CartAction::Qty {
                product_id,
                quantity,
                size,
            } => commands::cart::set_quantity(&engine, &product_id, size, quantity).await,
            CartAction::Clear => commands::cart::clear(&engine).await,
        },
        Commands::Favorites { action } => match action {
            FavoritesAction::Show => commands::favorites::show(&engine, &catalog),
            FavoritesAction::Toggle { product_id } => {
                commands::favorites::toggle(&engine, &catalog, &product_id).await?;
            }
        },
    }

    engine.shutdown();
    Ok(())
}
