//! Persistence for the stock ledger, catalog lookups and orders.
//!
//! Two implementations share the [`InventoryStore`] / [`InventoryTx`] seam:
//! PostgreSQL for production and an in-memory store for tests and demos.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryInventoryStore, InMemoryTx};
pub use postgres::{PostgresInventoryStore, PostgresTx};
pub use store::{InventoryStore, InventoryTx};
