use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, ProductId, StockId, UserId, VariantId, WarehouseId};
use domain::{
    Order, Product, ProductRef, ProductVariant, Quantity, StockOperation, VariantRef, Warehouse,
    WarehouseRef, WarehouseStock,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    Result, StoreError,
    store::{InventoryStore, InventoryTx},
};

#[derive(Debug, Default)]
struct MemoryState {
    warehouses: HashMap<WarehouseId, Warehouse>,
    products: HashMap<ProductId, Product>,
    variants: HashMap<VariantId, ProductVariant>,
    stocks: HashMap<StockId, WarehouseStock>,
    orders: HashMap<OrderId, Order>,
}

impl MemoryState {
    fn warehouse(&self, reference: &WarehouseRef) -> Option<Warehouse> {
        match reference {
            WarehouseRef::Id(id) => self.warehouses.get(id).cloned(),
            WarehouseRef::Slug(slug) => self.warehouses.values().find(|w| &w.slug == slug).cloned(),
        }
    }

    fn product(&self, reference: &ProductRef) -> Option<Product> {
        match reference {
            ProductRef::Id(id) => self.products.get(id).cloned(),
            ProductRef::Slug(slug) => self.products.values().find(|p| &p.slug == slug).cloned(),
        }
    }

    fn variant(&self, reference: &VariantRef) -> Option<ProductVariant> {
        match reference {
            VariantRef::Id(id) => self.variants.get(id).cloned(),
            VariantRef::Sku(sku) => self.variants.values().find(|v| &v.sku == sku).cloned(),
        }
    }

    fn stock_for(&self, warehouse_id: WarehouseId, variant_id: VariantId) -> Option<&WarehouseStock> {
        self.stocks
            .values()
            .find(|s| s.warehouse_id == warehouse_id && s.variant_id == variant_id)
    }

    fn stock_for_mut(
        &mut self,
        warehouse_id: WarehouseId,
        variant_id: VariantId,
    ) -> Option<&mut WarehouseStock> {
        self.stocks
            .values_mut()
            .find(|s| s.warehouse_id == warehouse_id && s.variant_id == variant_id)
    }

    fn available_in(&self, warehouse_id: WarehouseId, variant_id: VariantId) -> i64 {
        self.stock_for(warehouse_id, variant_id)
            .map(|s| i64::from(s.available()))
            .unwrap_or(0)
    }

    fn sorted_stocks<F>(&self, filter: F) -> Vec<WarehouseStock>
    where
        F: Fn(&WarehouseStock) -> bool,
    {
        let mut rows: Vec<_> = self.stocks.values().filter(|s| filter(*s)).cloned().collect();
        rows.sort_by(|a, b| {
            a.warehouse_id
                .cmp(&b.warehouse_id)
                .then(a.variant_id.cmp(&b.variant_id))
        });
        rows
    }
}

fn check_levels(stock: i32, reserved: i32) -> Result<()> {
    WarehouseStock::validate_levels(stock, reserved).map_err(|_| StoreError::InvalidStockLevels {
        stock: stock.into(),
        reserved: reserved.into(),
    })
}

/// In-memory inventory store for testing.
///
/// A transaction holds the state lock from `begin` until it is committed or
/// dropped and works on a staged copy of the catalog and stock rows, so
/// transactions are fully serialized and a dropped transaction leaves no
/// trace. Orders are not copied: the transaction only stages the orders it
/// writes and merges them on commit. Do not call store-level methods from a
/// task that holds an open transaction.
#[derive(Clone, Default)]
pub struct InMemoryInventoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_on_order_insert: Arc<AtomicBool>,
}

impl InMemoryInventoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail every order insert.
    pub fn set_fail_on_order_insert(&self, fail: bool) {
        self.fail_on_order_insert.store(fail, Ordering::SeqCst);
    }

    /// Adds a warehouse to the catalog.
    pub async fn insert_warehouse(&self, warehouse: Warehouse) {
        self.state
            .lock()
            .await
            .warehouses
            .insert(warehouse.id, warehouse);
    }

    /// Adds a product to the catalog.
    pub async fn insert_product(&self, product: Product) {
        self.state.lock().await.products.insert(product.id, product);
    }

    /// Adds a variant to the catalog.
    pub async fn insert_variant(&self, variant: ProductVariant) {
        self.state.lock().await.variants.insert(variant.id, variant);
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<InMemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        let staged = MemoryState {
            warehouses: guard.warehouses.clone(),
            products: guard.products.clone(),
            variants: guard.variants.clone(),
            stocks: guard.stocks.clone(),
            orders: HashMap::new(),
        };
        Ok(InMemoryTx {
            guard,
            staged,
            fail_on_order_insert: self.fail_on_order_insert.load(Ordering::SeqCst),
        })
    }

    async fn find_warehouse(&self, reference: &WarehouseRef) -> Result<Option<Warehouse>> {
        Ok(self.state.lock().await.warehouse(reference))
    }

    async fn find_variant(&self, reference: &VariantRef) -> Result<Option<ProductVariant>> {
        Ok(self.state.lock().await.variant(reference))
    }

    async fn get_stock(&self, id: StockId) -> Result<Option<WarehouseStock>> {
        Ok(self.state.lock().await.stocks.get(&id).cloned())
    }

    async fn get_stock_for(
        &self,
        warehouse_id: WarehouseId,
        variant_id: VariantId,
    ) -> Result<Option<WarehouseStock>> {
        Ok(self
            .state
            .lock()
            .await
            .stock_for(warehouse_id, variant_id)
            .cloned())
    }

    async fn stock_by_variant(&self, variant_id: VariantId) -> Result<Vec<WarehouseStock>> {
        let state = self.state.lock().await;
        Ok(state.sorted_stocks(|s| s.variant_id == variant_id))
    }

    async fn stock_by_warehouse(&self, warehouse_id: WarehouseId) -> Result<Vec<WarehouseStock>> {
        let state = self.state.lock().await;
        Ok(state.sorted_stocks(|s| s.warehouse_id == warehouse_id))
    }

    async fn list_stock(&self) -> Result<Vec<WarehouseStock>> {
        let state = self.state.lock().await;
        Ok(state.sorted_stocks(|_| true))
    }

    async fn available_stock(&self, variant_id: VariantId) -> Result<i64> {
        let state = self.state.lock().await;
        Ok(state
            .stocks
            .values()
            .filter(|s| s.variant_id == variant_id)
            .map(|s| i64::from(s.available()))
            .sum())
    }

    async fn available_stock_in(
        &self,
        warehouse_id: WarehouseId,
        variant_id: VariantId,
    ) -> Result<i64> {
        Ok(self.state.lock().await.available_in(warehouse_id, variant_id))
    }

    async fn insert_stock(&self, row: &WarehouseStock) -> Result<()> {
        check_levels(row.stock, row.reserved_stock)?;
        let mut state = self.state.lock().await;
        if state.stock_for(row.warehouse_id, row.variant_id).is_some() {
            return Err(StoreError::DuplicateStockRow {
                warehouse_id: row.warehouse_id,
                variant_id: row.variant_id,
            });
        }
        state.stocks.insert(row.id, row.clone());
        Ok(())
    }

    async fn overwrite_stock(
        &self,
        id: StockId,
        stock: i32,
        reserved: i32,
    ) -> Result<WarehouseStock> {
        check_levels(stock, reserved)?;
        let mut state = self.state.lock().await;
        let row = state.stocks.get_mut(&id).ok_or_else(|| StoreError::NotFound {
            entity: "warehouse stock",
            id: id.to_string(),
        })?;
        row.stock = stock;
        row.reserved_stock = reserved;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_stock(&self, id: StockId) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .stocks
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                entity: "warehouse stock",
                id: id.to_string(),
            })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.lock().await.orders.get(&id).cloned())
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let state = self.state.lock().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}

/// Transaction over [`InMemoryInventoryStore`].
pub struct InMemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    /// `orders` holds only the orders written in this transaction.
    staged: MemoryState,
    fail_on_order_insert: bool,
}

#[async_trait]
impl InventoryTx for InMemoryTx {
    async fn find_warehouse(&mut self, reference: &WarehouseRef) -> Result<Option<Warehouse>> {
        Ok(self.staged.warehouse(reference))
    }

    async fn main_warehouses(&mut self) -> Result<Vec<Warehouse>> {
        let mut mains: Vec<_> = self
            .staged
            .warehouses
            .values()
            .filter(|w| w.is_main && w.is_active)
            .cloned()
            .collect();
        mains.sort_by_key(|w| w.id);
        Ok(mains)
    }

    async fn find_product(&mut self, reference: &ProductRef) -> Result<Option<Product>> {
        Ok(self.staged.product(reference))
    }

    async fn find_variant(&mut self, reference: &VariantRef) -> Result<Option<ProductVariant>> {
        Ok(self.staged.variant(reference))
    }

    async fn apply_stock_operation(
        &mut self,
        operation: StockOperation,
        warehouse_id: WarehouseId,
        variant_id: VariantId,
        quantity: Quantity,
    ) -> Result<bool> {
        match self.staged.stock_for_mut(warehouse_id, variant_id) {
            Some(row) if operation.guard(row, quantity) => {
                operation.apply_to(row, quantity);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn available_stock_in(
        &mut self,
        warehouse_id: WarehouseId,
        variant_id: VariantId,
    ) -> Result<i64> {
        Ok(self.staged.available_in(warehouse_id, variant_id))
    }

    async fn ensure_stock_row(
        &mut self,
        warehouse_id: WarehouseId,
        variant_id: VariantId,
    ) -> Result<()> {
        if self.staged.stock_for(warehouse_id, variant_id).is_none() {
            let row = WarehouseStock::empty(warehouse_id, variant_id);
            self.staged.stocks.insert(row.id, row);
        }
        Ok(())
    }

    async fn lock_stock_rows(
        &mut self,
        variant_id: VariantId,
        warehouse_ids: &[WarehouseId],
    ) -> Result<Vec<WarehouseStock>> {
        Ok(self
            .staged
            .sorted_stocks(|s| s.variant_id == variant_id && warehouse_ids.contains(&s.warehouse_id)))
    }

    async fn set_stock(&mut self, id: StockId, stock: i32) -> Result<WarehouseStock> {
        let row = self
            .staged
            .stocks
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "warehouse stock",
                id: id.to_string(),
            })?;
        check_levels(stock, row.reserved_stock)?;
        row.stock = stock;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        if self.fail_on_order_insert {
            return Err(StoreError::Database(sqlx::Error::Protocol(
                "order insert failed".to_string(),
            )));
        }
        self.staged.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        Ok(self
            .staged
            .orders
            .get(&id)
            .or_else(|| self.guard.orders.get(&id))
            .cloned())
    }

    async fn update_order_status(&mut self, order: &Order) -> Result<()> {
        let stored = match self.staged.orders.entry(order.id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let committed = self.guard.orders.get(&order.id).cloned().ok_or_else(|| {
                    StoreError::NotFound {
                        entity: "order",
                        id: order.id.to_string(),
                    }
                })?;
                entry.insert(committed)
            }
        };
        stored.status = order.status;
        stored.payment_status = order.payment_status;
        stored.tracking_number = order.tracking_number.clone();
        stored.shipped_at = order.shipped_at;
        stored.updated_at = order.updated_at;
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        let mut guard = self.guard;
        let MemoryState {
            warehouses,
            products,
            variants,
            stocks,
            orders,
        } = self.staged;
        guard.warehouses = warehouses;
        guard.products = products;
        guard.variants = variants;
        guard.stocks = stocks;
        guard.orders.extend(orders);
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}
