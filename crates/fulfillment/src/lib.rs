//! Inventory reservation and order fulfillment.
//!
//! The stock ledger keeps one row per warehouse/variant pair with physical
//! `stock` and `reserved_stock`. Units move between three states:
//!
//! 1. Reserve: free → reserved, when an order is placed
//! 2. Release: reserved → free, when an order is cancelled
//! 3. Consume: reserved → gone, when an order ships
//!
//! Every operation is a guarded conditional update, so concurrent orders can
//! never reserve more than is on the shelf. Order creation reserves all lines
//! and inserts the order in one transaction; any failure rolls back all of it.

pub mod catalog;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod order_fulfillment;
pub mod reservation;
pub mod transfer;

mod transaction;

#[cfg(test)]
mod testing;

pub use directory::MainWarehouseSelector;
pub use error::{InventoryError, Result};
pub use ledger::{AvailabilityInfo, StockLedger, WarehouseAvailability};
pub use order_fulfillment::{CreateOrderRequest, OrderFulfillment, OrderLineRequest};
pub use reservation::ReservationEngine;
pub use transfer::{TransferCoordinator, TransferOutcome};
