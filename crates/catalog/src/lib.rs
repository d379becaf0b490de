//! Catalog - the stock inventory service
//!
//! Single node, one lock, whole-file persistence:
//! - `GET /lookup/{name}` returns price and quantity
//! - `POST /trade` buys or sells against the table
//! - successful trades ask the gateway to drop its cached quote

pub mod client;
pub mod error;
pub mod inventory;
pub mod server;

pub use client::CatalogClient;
pub use error::CatalogError;
pub use inventory::{Inventory, Stock};
pub use server::{CatalogServer, CatalogState};
