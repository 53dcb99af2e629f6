//! Shared fixtures for unit tests.

use common::WarehouseId;
use domain::{Money, Product, ProductVariant, Warehouse, WarehouseStock};
use inventory_store::{InMemoryInventoryStore, InventoryStore};

pub(crate) struct Fixture {
    pub store: InMemoryInventoryStore,
    pub main: Warehouse,
    pub north: Warehouse,
    pub product: Product,
    pub variant: ProductVariant,
    pub other_product: Product,
    pub other_variant: ProductVariant,
}

impl Fixture {
    /// Catalog with a main warehouse holding `stock`/`reserved` of one variant.
    pub async fn with_stock(stock: i32, reserved: i32) -> Self {
        let store = InMemoryInventoryStore::new();
        let main = Warehouse::new("central", "Central", "Springfield").main();
        let north = Warehouse::new("north", "North", "Shelbyville");
        let product = Product::new("tee", "T-Shirt", Money::from_cents(1500));
        let variant = ProductVariant::new(product.id, "TEE-M", "Medium", Money::from_cents(1600));
        let other_product = Product::new("mug", "Mug", Money::from_cents(800));
        let other_variant =
            ProductVariant::new(other_product.id, "MUG-BLUE", "Blue", Money::from_cents(900));

        store.insert_warehouse(main.clone()).await;
        store.insert_warehouse(north.clone()).await;
        store.insert_product(product.clone()).await;
        store.insert_product(other_product.clone()).await;
        store.insert_variant(variant.clone()).await;
        store.insert_variant(other_variant.clone()).await;

        let row = WarehouseStock::new(main.id, variant.id, stock, reserved).unwrap();
        store.insert_stock(&row).await.unwrap();

        Self {
            store,
            main,
            north,
            product,
            variant,
            other_product,
            other_variant,
        }
    }

    /// `(stock, reserved)` of the main variant at the main warehouse.
    pub async fn levels(&self) -> (i32, i32) {
        self.levels_at(self.main.id).await.unwrap()
    }

    pub async fn levels_at(&self, warehouse_id: WarehouseId) -> Option<(i32, i32)> {
        self.store
            .get_stock_for(warehouse_id, self.variant.id)
            .await
            .unwrap()
            .map(|row| (row.stock, row.reserved_stock))
    }
}
