//! Shared identifier types.

pub mod types;

pub use types::{OrderId, ProductId, StockId, UserId, VariantId, WarehouseId};
