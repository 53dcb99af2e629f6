//! Data model for the inventory and fulfillment system.
//!
//! This crate provides the types shared by storage and services:
//! - Warehouses and the external catalog entities (products, variants)
//! - The per-warehouse stock ledger row and the per-unit state machine
//! - Orders, order items, and their status enumerations
//! - Human-facing lookup references (id, slug, SKU)

pub mod catalog;
pub mod error;
pub mod money;
pub mod order;
pub mod reference;
pub mod stock;
pub mod warehouse;

pub use catalog::{Product, ProductVariant};
pub use error::DomainError;
pub use money::Money;
pub use order::{
    Order, OrderItem, OrderNumber, OrderStatus, PaymentMethod, PaymentStatus, ShippingInfo,
    ShippingMethod,
};
pub use reference::{ProductRef, VariantRef, WarehouseRef};
pub use stock::{Quantity, StockOperation, UnitState, WarehouseStock};
pub use warehouse::Warehouse;
