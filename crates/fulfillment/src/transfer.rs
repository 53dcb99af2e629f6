//! Moving physical stock between warehouses.

use domain::{Quantity, VariantRef, WarehouseRef, WarehouseStock};
use inventory_store::{InventoryStore, InventoryTx};
use serde::{Deserialize, Serialize};

use crate::catalog::find_variant;
use crate::directory::resolve_warehouse;
use crate::error::{InventoryError, Result};
use crate::transaction::finish;

/// Both ledger rows after a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub source: WarehouseStock,
    pub destination: WarehouseStock,
}

/// Transfers stock of one variant between two warehouses.
///
/// Both rows are locked in warehouse id order, so two transfers in opposite
/// directions over the same pair queue up instead of deadlocking. Only
/// `stock` moves; reservations stay where they are.
pub struct TransferCoordinator<S: InventoryStore> {
    store: S,
}

impl<S: InventoryStore> TransferCoordinator<S> {
    /// Creates a new transfer coordinator over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Moves `quantity` units of `variant` from `from` to `to`.
    ///
    /// The destination row is created if the pair has none. Fails with
    /// `InsufficientStock` when the source has fewer free units, in which
    /// case neither row changes.
    #[tracing::instrument(skip(self))]
    pub async fn transfer_stock(
        &self,
        from: &WarehouseRef,
        to: &WarehouseRef,
        variant: &VariantRef,
        quantity: i64,
    ) -> Result<TransferOutcome> {
        let quantity = Quantity::new(quantity)?;
        if from == to {
            return Err(InventoryError::Validation(
                "source and destination warehouses must differ".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let result = Self::move_stock(&mut tx, from, to, variant, quantity).await;
        let outcome = finish(tx, result).await?;

        metrics::counter!("stock_transfers_total").increment(1);
        tracing::info!(
            from = %outcome.source.warehouse_id,
            to = %outcome.destination.warehouse_id,
            variant = %outcome.source.variant_id,
            %quantity,
            "stock transferred"
        );
        Ok(outcome)
    }

    async fn move_stock(
        tx: &mut S::Tx,
        from: &WarehouseRef,
        to: &WarehouseRef,
        variant: &VariantRef,
        quantity: Quantity,
    ) -> Result<TransferOutcome> {
        let source_warehouse = resolve_warehouse(tx, from).await?;
        let destination_warehouse = resolve_warehouse(tx, to).await?;
        if source_warehouse.id == destination_warehouse.id {
            return Err(InventoryError::Validation(
                "source and destination warehouses must differ".to_string(),
            ));
        }
        let variant = find_variant(tx, variant).await?;

        tx.ensure_stock_row(destination_warehouse.id, variant.id)
            .await?;
        let rows = tx
            .lock_stock_rows(variant.id, &[source_warehouse.id, destination_warehouse.id])
            .await?;

        let source = rows
            .iter()
            .find(|row| row.warehouse_id == source_warehouse.id);
        let available = source.map(|row| i64::from(row.available())).unwrap_or(0);
        let Some(source) = source.filter(|_| available >= i64::from(quantity.get())) else {
            return Err(InventoryError::InsufficientStock {
                warehouse: source_warehouse.id,
                variant: variant.id,
                requested: quantity.get(),
                available,
            });
        };
        let destination = rows
            .iter()
            .find(|row| row.warehouse_id == destination_warehouse.id)
            .ok_or_else(|| {
                InventoryError::not_found(
                    "warehouse stock",
                    format!("{}/{}", destination_warehouse.slug, variant.sku),
                )
            })?;

        let destination_stock = destination
            .stock
            .checked_add(quantity.as_i32())
            .ok_or_else(|| {
                InventoryError::Validation("destination stock would overflow".to_string())
            })?;

        let source = tx
            .set_stock(source.id, source.stock - quantity.as_i32())
            .await?;
        let destination = tx.set_stock(destination.id, destination_stock).await?;
        Ok(TransferOutcome {
            source,
            destination,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use inventory_store::InventoryStore as _;

    #[tokio::test]
    async fn test_transfer_creates_destination_row() {
        let fx = Fixture::with_stock(10, 0).await;
        let coordinator = TransferCoordinator::new(fx.store.clone());

        let outcome = coordinator
            .transfer_stock(
                &WarehouseRef::parse("central"),
                &WarehouseRef::parse("north"),
                &VariantRef::parse("TEE-M"),
                5,
            )
            .await
            .unwrap();

        assert_eq!(outcome.source.stock, 5);
        assert_eq!(outcome.destination.stock, 5);
        assert_eq!(outcome.destination.reserved_stock, 0);
        assert_eq!(fx.levels_at(fx.north.id).await, Some((5, 0)));
        assert_eq!(fx.levels().await, (5, 0));
    }

    #[tokio::test]
    async fn test_transfer_respects_reservations() {
        let fx = Fixture::with_stock(5, 3).await;
        let coordinator = TransferCoordinator::new(fx.store.clone());

        let err = coordinator
            .transfer_stock(
                &WarehouseRef::Id(fx.main.id),
                &WarehouseRef::Id(fx.north.id),
                &VariantRef::Id(fx.variant.id),
                5,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::InsufficientStock {
                requested: 5,
                available: 2,
                ..
            }
        ));
        assert_eq!(fx.levels().await, (5, 3));
        assert_eq!(fx.levels_at(fx.north.id).await, None);
    }

    #[tokio::test]
    async fn test_transfer_keeps_reserved_and_total() {
        let fx = Fixture::with_stock(10, 3).await;
        let coordinator = TransferCoordinator::new(fx.store.clone());
        let (main, north, sku) = (
            WarehouseRef::parse("central"),
            WarehouseRef::parse("north"),
            VariantRef::parse("TEE-M"),
        );

        coordinator.transfer_stock(&main, &north, &sku, 4).await.unwrap();
        coordinator.transfer_stock(&north, &main, &sku, 1).await.unwrap();

        assert_eq!(fx.levels().await, (7, 3));
        assert_eq!(fx.levels_at(fx.north.id).await, Some((3, 0)));
        let total: i32 = fx
            .store
            .stock_by_variant(fx.variant.id)
            .await
            .unwrap()
            .iter()
            .map(|row| row.stock)
            .sum();
        assert_eq!(total, 10);
    }

    #[tokio::test]
    async fn test_transfer_from_warehouse_without_row() {
        let fx = Fixture::with_stock(10, 0).await;
        let coordinator = TransferCoordinator::new(fx.store.clone());

        let err = coordinator
            .transfer_stock(
                &WarehouseRef::parse("north"),
                &WarehouseRef::parse("central"),
                &VariantRef::parse("TEE-M"),
                1,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::InsufficientStock { available: 0, .. }
        ));
        assert_eq!(fx.levels().await, (10, 0));
    }

    #[tokio::test]
    async fn test_transfer_validation() {
        let fx = Fixture::with_stock(10, 0).await;
        let coordinator = TransferCoordinator::new(fx.store.clone());
        let sku = VariantRef::parse("TEE-M");

        let err = coordinator
            .transfer_stock(
                &WarehouseRef::parse("central"),
                &WarehouseRef::parse("north"),
                &sku,
                0,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));

        let err = coordinator
            .transfer_stock(
                &WarehouseRef::parse("central"),
                &WarehouseRef::Id(fx.main.id),
                &sku,
                1,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));

        let err = coordinator
            .transfer_stock(
                &WarehouseRef::parse("central"),
                &WarehouseRef::parse("atlantis"),
                &sku,
                1,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::NotFound { entity: "warehouse", .. }));
    }
}
