//! Domain error types.

use thiserror::Error;

use crate::order::OrderStatus;
use crate::stock::UnitState;

/// Errors raised when a value violates a rule of the data model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// Quantity must be a positive number of units.
    #[error("Invalid quantity: {quantity} (must be between 1 and {max})")]
    InvalidQuantity { quantity: i64, max: i64 },

    /// Stock levels would break `0 <= reserved_stock <= stock`.
    #[error("Invalid stock levels: stock {stock}, reserved {reserved}")]
    InvalidStockLevels { stock: i64, reserved: i64 },

    /// Delivery orders need somewhere to deliver to.
    #[error("Shipping address is required for delivery")]
    MissingShippingAddress,

    /// Pickup orders need a pickup point.
    #[error("Pickup point is required for pickup")]
    MissingPickupPoint,

    /// A stored or submitted enumeration value was not recognized.
    #[error("Unknown {kind}: {value}")]
    UnknownValue { kind: &'static str, value: String },

    /// Order is not in a status that permits the action.
    #[error("Invalid status transition: cannot {action} an order in {current} status")]
    InvalidStatusTransition {
        current: OrderStatus,
        action: &'static str,
    },

    /// A stock unit cannot move along the requested edge.
    #[error("Invalid unit transition: cannot {operation} a {state} unit")]
    InvalidUnitTransition {
        state: UnitState,
        operation: &'static str,
    },
}
