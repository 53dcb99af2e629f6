use async_trait::async_trait;
use common::{OrderId, StockId, UserId, VariantId, WarehouseId};
use domain::{
    Order, Product, ProductRef, ProductVariant, Quantity, StockOperation, VariantRef, Warehouse,
    WarehouseRef, WarehouseStock,
};

use crate::Result;

/// Core trait for inventory storage.
///
/// Methods on the store itself are snapshot reads and single-statement
/// administrative writes. Anything that must be atomic across several
/// statements goes through a transaction obtained from [`InventoryStore::begin`].
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// The transaction type handed out by [`InventoryStore::begin`].
    type Tx: InventoryTx;

    /// Starts a transaction.
    ///
    /// Dropping the transaction without committing rolls it back.
    async fn begin(&self) -> Result<Self::Tx>;

    /// Looks up a warehouse by id or slug.
    async fn find_warehouse(&self, reference: &WarehouseRef) -> Result<Option<Warehouse>>;

    /// Looks up a variant by id or SKU.
    async fn find_variant(&self, reference: &VariantRef) -> Result<Option<ProductVariant>>;

    /// Retrieves a ledger row by id.
    async fn get_stock(&self, id: StockId) -> Result<Option<WarehouseStock>>;

    /// Retrieves the ledger row for a warehouse/variant pair.
    async fn get_stock_for(
        &self,
        warehouse_id: WarehouseId,
        variant_id: VariantId,
    ) -> Result<Option<WarehouseStock>>;

    /// Retrieves the rows for a variant across all warehouses.
    async fn stock_by_variant(&self, variant_id: VariantId) -> Result<Vec<WarehouseStock>>;

    /// Retrieves all rows held by a warehouse.
    async fn stock_by_warehouse(&self, warehouse_id: WarehouseId) -> Result<Vec<WarehouseStock>>;

    /// Retrieves every ledger row.
    async fn list_stock(&self) -> Result<Vec<WarehouseStock>>;

    /// Sum of `stock - reserved_stock` for a variant over all warehouses.
    async fn available_stock(&self, variant_id: VariantId) -> Result<i64>;

    /// `stock - reserved_stock` for one pair, or 0 if there is no row.
    async fn available_stock_in(
        &self,
        warehouse_id: WarehouseId,
        variant_id: VariantId,
    ) -> Result<i64>;

    /// Inserts a ledger row.
    ///
    /// Fails with `DuplicateStockRow` if the pair already has one.
    async fn insert_stock(&self, row: &WarehouseStock) -> Result<()>;

    /// Overwrites both quantities of a row. Last write wins.
    async fn overwrite_stock(&self, id: StockId, stock: i32, reserved: i32)
    -> Result<WarehouseStock>;

    /// Deletes a ledger row.
    async fn delete_stock(&self, id: StockId) -> Result<()>;

    /// Retrieves an order with its items.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Retrieves a user's orders, newest first.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;
}

/// Operations available inside a store transaction.
///
/// Everything done through one value commits or rolls back together.
#[async_trait]
pub trait InventoryTx: Send + Sized {
    /// Looks up a warehouse by id or slug.
    async fn find_warehouse(&mut self, reference: &WarehouseRef) -> Result<Option<Warehouse>>;

    /// Returns every warehouse flagged main and active.
    async fn main_warehouses(&mut self) -> Result<Vec<Warehouse>>;

    /// Looks up a product by id or slug.
    async fn find_product(&mut self, reference: &ProductRef) -> Result<Option<Product>>;

    /// Looks up a variant by id or SKU.
    async fn find_variant(&mut self, reference: &VariantRef) -> Result<Option<ProductVariant>>;

    /// Applies a conditional ledger update as a single atomic statement.
    ///
    /// Returns false when no row satisfied the operation's guard (or the
    /// pair has no row), in which case nothing changed.
    async fn apply_stock_operation(
        &mut self,
        operation: StockOperation,
        warehouse_id: WarehouseId,
        variant_id: VariantId,
        quantity: Quantity,
    ) -> Result<bool>;

    /// `stock - reserved_stock` for one pair, or 0 if there is no row.
    async fn available_stock_in(
        &mut self,
        warehouse_id: WarehouseId,
        variant_id: VariantId,
    ) -> Result<i64>;

    /// Creates an empty row for the pair unless one exists.
    ///
    /// Never fails on a concurrent insert of the same pair; the losing
    /// side waits for the winner and then sees its row.
    async fn ensure_stock_row(&mut self, warehouse_id: WarehouseId, variant_id: VariantId)
    -> Result<()>;

    /// Row-locks the variant's rows at the given warehouses until the
    /// transaction ends. Rows come back ordered by warehouse id, which is
    /// also the lock acquisition order.
    async fn lock_stock_rows(
        &mut self,
        variant_id: VariantId,
        warehouse_ids: &[WarehouseId],
    ) -> Result<Vec<WarehouseStock>>;

    /// Sets the physical stock of a locked row.
    async fn set_stock(&mut self, id: StockId, stock: i32) -> Result<WarehouseStock>;

    /// Inserts an order and all of its items.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Row-locks and retrieves an order with its items.
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>>;

    /// Persists the status fields of an order.
    async fn update_order_status(&mut self, order: &Order) -> Result<()>;

    /// Commits the transaction.
    async fn commit(self) -> Result<()>;

    /// Rolls the transaction back.
    async fn rollback(self) -> Result<()>;
}
