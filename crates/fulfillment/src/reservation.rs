//! Reserve, release and consume against the stock ledger.
//!
//! Each operation is a single conditional update; the guard in the update
//! is the only serialization point, so concurrent callers can never move
//! more units than the row actually holds. The `*_in` functions run inside
//! a caller's transaction; [`ReservationEngine`] wraps each in its own.

use common::{VariantId, WarehouseId};
use domain::{Quantity, StockOperation};
use inventory_store::{InventoryStore, InventoryTx};

use crate::error::{InventoryError, Result};
use crate::transaction::finish;

/// Moves `quantity` units from free to reserved inside `tx`.
pub async fn reserve_in<T: InventoryTx>(
    tx: &mut T,
    warehouse_id: WarehouseId,
    variant_id: VariantId,
    quantity: Quantity,
) -> Result<()> {
    let applied = tx
        .apply_stock_operation(StockOperation::Reserve, warehouse_id, variant_id, quantity)
        .await?;
    if applied {
        metrics::counter!("stock_reservations_total", "operation" => "reserve").increment(1);
        return Ok(());
    }

    let available = tx.available_stock_in(warehouse_id, variant_id).await?;
    metrics::counter!("stock_reservation_failures_total", "operation" => "reserve").increment(1);
    tracing::debug!(%warehouse_id, %variant_id, %quantity, available, "reservation rejected");
    Err(InventoryError::InsufficientStock {
        warehouse: warehouse_id,
        variant: variant_id,
        requested: quantity.get(),
        available,
    })
}

/// Returns `quantity` reserved units to free inside `tx`.
pub async fn release_in<T: InventoryTx>(
    tx: &mut T,
    warehouse_id: WarehouseId,
    variant_id: VariantId,
    quantity: Quantity,
) -> Result<()> {
    apply_reserved(tx, StockOperation::Release, warehouse_id, variant_id, quantity).await
}

/// Removes `quantity` reserved units from the ledger inside `tx`.
pub async fn consume_in<T: InventoryTx>(
    tx: &mut T,
    warehouse_id: WarehouseId,
    variant_id: VariantId,
    quantity: Quantity,
) -> Result<()> {
    apply_reserved(tx, StockOperation::Consume, warehouse_id, variant_id, quantity).await
}

async fn apply_reserved<T: InventoryTx>(
    tx: &mut T,
    operation: StockOperation,
    warehouse_id: WarehouseId,
    variant_id: VariantId,
    quantity: Quantity,
) -> Result<()> {
    let applied = tx
        .apply_stock_operation(operation, warehouse_id, variant_id, quantity)
        .await?;
    if applied {
        metrics::counter!("stock_reservations_total", "operation" => operation.as_str())
            .increment(1);
        return Ok(());
    }

    metrics::counter!("stock_reservation_failures_total", "operation" => operation.as_str())
        .increment(1);
    Err(InventoryError::InsufficientReserved {
        warehouse: warehouse_id,
        variant: variant_id,
        requested: quantity.get(),
    })
}

/// Standalone reservation operations, one transaction each.
pub struct ReservationEngine<S: InventoryStore> {
    store: S,
}

impl<S: InventoryStore> ReservationEngine<S> {
    /// Creates a new reservation engine over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Reserves `quantity` units; fails with `InsufficientStock` if fewer are free.
    #[tracing::instrument(skip(self))]
    pub async fn reserve(
        &self,
        warehouse_id: WarehouseId,
        variant_id: VariantId,
        quantity: i64,
    ) -> Result<()> {
        let quantity = Quantity::new(quantity)?;
        let mut tx = self.store.begin().await?;
        let result = reserve_in(&mut tx, warehouse_id, variant_id, quantity).await;
        finish(tx, result).await
    }

    /// Releases `quantity` reserved units; fails with `InsufficientReserved`.
    #[tracing::instrument(skip(self))]
    pub async fn release(
        &self,
        warehouse_id: WarehouseId,
        variant_id: VariantId,
        quantity: i64,
    ) -> Result<()> {
        let quantity = Quantity::new(quantity)?;
        let mut tx = self.store.begin().await?;
        let result = release_in(&mut tx, warehouse_id, variant_id, quantity).await;
        finish(tx, result).await
    }

    /// Consumes `quantity` reserved units; fails with `InsufficientReserved`.
    #[tracing::instrument(skip(self))]
    pub async fn consume(
        &self,
        warehouse_id: WarehouseId,
        variant_id: VariantId,
        quantity: i64,
    ) -> Result<()> {
        let quantity = Quantity::new(quantity)?;
        let mut tx = self.store.begin().await?;
        let result = consume_in(&mut tx, warehouse_id, variant_id, quantity).await;
        finish(tx, result).await
    }
}
