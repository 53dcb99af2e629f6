//! Read access and administrative writes for the stock ledger.
//!
//! Reads are snapshots and are never used to decide a reservation. Writes
//! bypass the reservation state machine and are last-write-wins, but still
//! have to satisfy `0 <= reserved_stock <= stock`.

use common::{StockId, VariantId, WarehouseId};
use domain::{Quantity, VariantRef, WarehouseRef, WarehouseStock};
use inventory_store::InventoryStore;
use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, Result};

/// Availability of one variant at one warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseAvailability {
    pub warehouse_id: WarehouseId,
    pub stock: i32,
    pub reserved_stock: i32,
    pub available: i32,
}

/// Availability of one variant across all warehouses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityInfo {
    pub variant_id: VariantId,
    pub total_available: i64,
    pub warehouses: Vec<WarehouseAvailability>,
}

/// Read and admin-write access to per-warehouse stock.
pub struct StockLedger<S: InventoryStore> {
    store: S,
}

impl<S: InventoryStore> StockLedger<S> {
    /// Creates a new ledger over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Ids pass through untouched; slugs are looked up.
    async fn warehouse_id(&self, reference: &WarehouseRef) -> Result<WarehouseId> {
        match reference {
            WarehouseRef::Id(id) => Ok(*id),
            WarehouseRef::Slug(_) => self.require_warehouse(reference).await,
        }
    }

    /// Ids pass through untouched; SKUs are looked up.
    async fn variant_id(&self, reference: &VariantRef) -> Result<VariantId> {
        match reference {
            VariantRef::Id(id) => Ok(*id),
            VariantRef::Sku(_) => self.require_variant(reference).await,
        }
    }

    async fn require_warehouse(&self, reference: &WarehouseRef) -> Result<WarehouseId> {
        if reference.is_blank() {
            return Err(InventoryError::Validation(
                "warehouse identifier is required".to_string(),
            ));
        }
        self.store
            .find_warehouse(reference)
            .await?
            .map(|w| w.id)
            .ok_or_else(|| InventoryError::not_found("warehouse", reference))
    }

    async fn require_variant(&self, reference: &VariantRef) -> Result<VariantId> {
        if reference.is_blank() {
            return Err(InventoryError::Validation(
                "variant identifier is required".to_string(),
            ));
        }
        self.store
            .find_variant(reference)
            .await?
            .map(|v| v.id)
            .ok_or_else(|| InventoryError::not_found("variant", reference))
    }

    /// Retrieves a row by id.
    pub async fn get(&self, id: StockId) -> Result<WarehouseStock> {
        self.store
            .get_stock(id)
            .await?
            .ok_or_else(|| InventoryError::not_found("warehouse stock", id))
    }

    /// Retrieves the row for a warehouse/variant pair.
    pub async fn get_by_warehouse_and_variant(
        &self,
        warehouse: &WarehouseRef,
        variant: &VariantRef,
    ) -> Result<WarehouseStock> {
        let warehouse_id = self.warehouse_id(warehouse).await?;
        let variant_id = self.variant_id(variant).await?;
        self.store
            .get_stock_for(warehouse_id, variant_id)
            .await?
            .ok_or_else(|| {
                InventoryError::not_found("warehouse stock", format!("{warehouse}/{variant}"))
            })
    }

    /// Retrieves the rows of a variant across all warehouses.
    pub async fn get_by_variant(&self, variant: &VariantRef) -> Result<Vec<WarehouseStock>> {
        let variant_id = self.variant_id(variant).await?;
        Ok(self.store.stock_by_variant(variant_id).await?)
    }

    /// Retrieves the rows held by a warehouse.
    pub async fn get_by_warehouse(&self, warehouse: &WarehouseRef) -> Result<Vec<WarehouseStock>> {
        let warehouse_id = self.warehouse_id(warehouse).await?;
        Ok(self.store.stock_by_warehouse(warehouse_id).await?)
    }

    /// Retrieves every row.
    pub async fn list(&self) -> Result<Vec<WarehouseStock>> {
        Ok(self.store.list_stock().await?)
    }

    /// Units free across all warehouses; 0 when the variant has no rows.
    pub async fn available(&self, variant: &VariantRef) -> Result<i64> {
        let variant_id = self.variant_id(variant).await?;
        Ok(self.store.available_stock(variant_id).await?)
    }

    /// Units free at one warehouse; 0 when there is no row.
    pub async fn available_in_warehouse(
        &self,
        warehouse: &WarehouseRef,
        variant: &VariantRef,
    ) -> Result<i64> {
        let warehouse_id = self.warehouse_id(warehouse).await?;
        let variant_id = self.variant_id(variant).await?;
        Ok(self
            .store
            .available_stock_in(warehouse_id, variant_id)
            .await?)
    }

    /// Returns true if at least `quantity` units are free across all warehouses.
    pub async fn check_availability(&self, variant: &VariantRef, quantity: i64) -> Result<bool> {
        let quantity = Quantity::new(quantity)?;
        Ok(self.available(variant).await? >= i64::from(quantity.get()))
    }

    /// Returns true if at least `quantity` units are free at `warehouse`.
    pub async fn check_availability_in_warehouse(
        &self,
        warehouse: &WarehouseRef,
        variant: &VariantRef,
        quantity: i64,
    ) -> Result<bool> {
        let quantity = Quantity::new(quantity)?;
        Ok(self.available_in_warehouse(warehouse, variant).await? >= i64::from(quantity.get()))
    }

    /// Per-warehouse breakdown of a variant's stock.
    pub async fn availability_info(&self, variant: &VariantRef) -> Result<AvailabilityInfo> {
        let variant_id = self.variant_id(variant).await?;
        let rows = self.store.stock_by_variant(variant_id).await?;
        let warehouses: Vec<_> = rows
            .into_iter()
            .map(|row| WarehouseAvailability {
                warehouse_id: row.warehouse_id,
                stock: row.stock,
                reserved_stock: row.reserved_stock,
                available: row.available(),
            })
            .collect();
        Ok(AvailabilityInfo {
            variant_id,
            total_available: warehouses.iter().map(|w| i64::from(w.available)).sum(),
            warehouses,
        })
    }

    /// Creates a row for a pair that has none.
    #[tracing::instrument(skip(self))]
    pub async fn create(
        &self,
        warehouse: &WarehouseRef,
        variant: &VariantRef,
        stock: i32,
        reserved: i32,
    ) -> Result<WarehouseStock> {
        let row = WarehouseStock::new(
            self.require_warehouse(warehouse).await?,
            self.require_variant(variant).await?,
            stock,
            reserved,
        )?;
        self.store.insert_stock(&row).await?;
        tracing::info!(stock_id = %row.id, "stock row created");
        Ok(row)
    }

    /// Overwrites both quantities of a row.
    #[tracing::instrument(skip(self))]
    pub async fn update_stock(
        &self,
        id: StockId,
        stock: i32,
        reserved: i32,
    ) -> Result<WarehouseStock> {
        WarehouseStock::validate_levels(stock, reserved)?;
        let row = self.store.overwrite_stock(id, stock, reserved).await?;
        tracing::info!(stock_id = %id, stock, reserved, "stock row overwritten");
        Ok(row)
    }

    /// Deletes a row.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: StockId) -> Result<()> {
        self.store.delete_stock(id).await?;
        tracing::info!(stock_id = %id, "stock row deleted");
        Ok(())
    }
}
