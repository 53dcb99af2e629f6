//! Fulfillment error types.

use common::{ProductId, VariantId, WarehouseId};
use domain::{DomainError, OrderStatus};
use inventory_store::StoreError;
use thiserror::Error;

/// Errors that can occur during reservation, transfer and order operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// A referenced warehouse, product, variant, stock row or order does not exist.
    #[error("{entity} not found: {identifier}")]
    NotFound {
        entity: &'static str,
        identifier: String,
    },

    /// The referenced catalog entity exists but is not active.
    #[error("{entity} is inactive: {identifier}")]
    Inactive {
        entity: &'static str,
        identifier: String,
    },

    /// The variant belongs to a different product than the one ordered.
    #[error("Variant {variant} does not belong to product {product}")]
    VariantMismatch {
        product: ProductId,
        variant: VariantId,
    },

    /// Not enough unreserved stock to satisfy the request.
    #[error(
        "Insufficient stock for variant {variant} in warehouse {warehouse}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        warehouse: WarehouseId,
        variant: VariantId,
        requested: u32,
        /// Informational; read after the failed update.
        available: i64,
    },

    /// Not enough reserved stock to release or consume.
    #[error(
        "Insufficient reserved stock for variant {variant} in warehouse {warehouse}: requested {requested}"
    )]
    InsufficientReserved {
        warehouse: WarehouseId,
        variant: VariantId,
        requested: u32,
    },

    /// No active warehouse is marked main, or the configured one is missing.
    #[error("No main warehouse configured")]
    NoMainWarehouse,

    /// More than one active warehouse is marked main.
    #[error("Main warehouse is ambiguous: {count} active warehouses are marked main")]
    AmbiguousMainWarehouse { count: usize },

    /// The request is malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The order's status does not allow the requested action.
    #[error("Cannot {action} order in {current} status")]
    InvalidStatusTransition {
        current: OrderStatus,
        action: &'static str,
    },

    /// Storage error.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl InventoryError {
    pub(crate) fn not_found(entity: &'static str, identifier: impl ToString) -> Self {
        Self::NotFound {
            entity,
            identifier: identifier.to_string(),
        }
    }

    pub(crate) fn inactive(entity: &'static str, identifier: impl ToString) -> Self {
        Self::Inactive {
            entity,
            identifier: identifier.to_string(),
        }
    }

    /// Returns true for errors that an operator has to fix, not the caller.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::NoMainWarehouse | Self::AmbiguousMainWarehouse { .. }
        )
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Inactive { .. } => "inactive",
            Self::VariantMismatch { .. } => "variant_mismatch",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::InsufficientReserved { .. } => "insufficient_reserved",
            Self::NoMainWarehouse => "no_main_warehouse",
            Self::AmbiguousMainWarehouse { .. } => "ambiguous_main_warehouse",
            Self::Validation(_) => "validation",
            Self::InvalidStatusTransition { .. } => "invalid_status_transition",
            Self::Store(_) => "store",
        }
    }
}

impl From<DomainError> for InventoryError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InvalidStatusTransition { current, action } => {
                Self::InvalidStatusTransition { current, action }
            }
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<StoreError> for InventoryError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => Self::NotFound {
                entity,
                identifier: id,
            },
            StoreError::InvalidStockLevels { .. } => Self::Validation(e.to_string()),
            other => Self::Store(other),
        }
    }
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, InventoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors() {
        assert!(InventoryError::NoMainWarehouse.is_configuration_error());
        assert!(InventoryError::AmbiguousMainWarehouse { count: 2 }.is_configuration_error());
        assert!(!InventoryError::Validation("x".to_string()).is_configuration_error());
    }

    #[test]
    fn test_status_transition_survives_conversion() {
        let err: InventoryError = DomainError::InvalidStatusTransition {
            current: OrderStatus::Shipped,
            action: "cancel",
        }
        .into();
        assert!(matches!(
            err,
            InventoryError::InvalidStatusTransition {
                current: OrderStatus::Shipped,
                action: "cancel"
            }
        ));
        assert_eq!(err.to_string(), "Cannot cancel order in shipped status");
    }

    #[test]
    fn test_store_levels_become_validation() {
        let err: InventoryError = StoreError::InvalidStockLevels {
            stock: 1,
            reserved: 2,
        }
        .into();
        assert_eq!(err.kind(), "validation");
    }
}
