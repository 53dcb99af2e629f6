//! Warehouse lookups.

use domain::{Warehouse, WarehouseRef};
use inventory_store::InventoryTx;
use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, Result};

/// How the main (default fulfillment) warehouse is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MainWarehouseSelector {
    /// The single active warehouse flagged `is_main`.
    #[default]
    Flagged,
    /// An explicitly configured warehouse slug.
    Slug(String),
}

impl MainWarehouseSelector {
    /// Uses `slug` when given, the flag otherwise.
    pub fn from_config(slug: Option<String>) -> Self {
        match slug {
            Some(slug) if !slug.trim().is_empty() => Self::Slug(slug.trim().to_string()),
            _ => Self::Flagged,
        }
    }
}

/// Resolves a warehouse by id or slug. Inactive warehouses are returned too.
pub async fn resolve_warehouse<T: InventoryTx>(
    tx: &mut T,
    reference: &WarehouseRef,
) -> Result<Warehouse> {
    if reference.is_blank() {
        return Err(InventoryError::Validation(
            "warehouse identifier is required".to_string(),
        ));
    }
    tx.find_warehouse(reference)
        .await?
        .ok_or_else(|| InventoryError::not_found("warehouse", reference))
}

/// Resolves the main warehouse.
pub async fn main_warehouse<T: InventoryTx>(
    tx: &mut T,
    selector: &MainWarehouseSelector,
) -> Result<Warehouse> {
    match selector {
        MainWarehouseSelector::Flagged => {
            let mut mains = tx.main_warehouses().await?;
            match mains.len() {
                0 => Err(InventoryError::NoMainWarehouse),
                1 => Ok(mains.remove(0)),
                count => Err(InventoryError::AmbiguousMainWarehouse { count }),
            }
        }
        MainWarehouseSelector::Slug(slug) => {
            let reference = WarehouseRef::Slug(slug.clone());
            let warehouse = tx
                .find_warehouse(&reference)
                .await?
                .ok_or(InventoryError::NoMainWarehouse)?;
            if !warehouse.is_active {
                return Err(InventoryError::inactive("warehouse", slug));
            }
            Ok(warehouse)
        }
    }
}
