use common::{VariantId, WarehouseId};
use domain::DomainError;
use thiserror::Error;

/// Errors that can occur when interacting with the inventory store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A ledger row already exists for this warehouse/variant pair.
    #[error("Stock row already exists for warehouse {warehouse_id} and variant {variant_id}")]
    DuplicateStockRow {
        warehouse_id: WarehouseId,
        variant_id: VariantId,
    },

    /// The write would break `0 <= reserved_stock <= stock`.
    #[error("Invalid stock levels: stock {stock}, reserved {reserved}")]
    InvalidStockLevels { stock: i64, reserved: i64 },

    /// The addressed record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A persisted value could not be mapped back into the data model.
    #[error("Invalid record: {0}")]
    InvalidRecord(#[from] DomainError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for inventory store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
