//! Demo catalog for running the server without a database.

use domain::{Money, Product, ProductVariant, Warehouse, WarehouseStock};
use inventory_store::{InMemoryInventoryStore, InventoryStore, StoreError};

/// Seeds two warehouses, two products with variants, and main-warehouse stock.
///
/// `central` is the flagged main warehouse; `north` starts empty.
pub async fn seed_catalog(store: &InMemoryInventoryStore) -> Result<(), StoreError> {
    let central = Warehouse::new("central", "Central Warehouse", "Springfield").main();
    let north = Warehouse::new("north", "North Depot", "Shelbyville");

    let tee = Product::new("classic-tee", "Classic Tee", Money::from_cents(1500));
    let mug = Product::new("enamel-mug", "Enamel Mug", Money::from_cents(900));
    let variants = [
        (
            ProductVariant::new(tee.id, "TEE-S", "Small", Money::from_cents(1500)),
            25,
        ),
        (
            ProductVariant::new(tee.id, "TEE-M", "Medium", Money::from_cents(1500)),
            40,
        ),
        (
            ProductVariant::new(tee.id, "TEE-L", "Large", Money::from_cents(1700)),
            15,
        ),
        (
            ProductVariant::new(mug.id, "MUG-BLUE", "Blue", Money::from_cents(900)),
            60,
        ),
    ];

    store.insert_warehouse(central.clone()).await;
    store.insert_warehouse(north).await;
    store.insert_product(tee).await;
    store.insert_product(mug).await;
    for (variant, stock) in variants {
        let row = WarehouseStock::new(central.id, variant.id, stock, 0)?;
        store.insert_variant(variant).await;
        store.insert_stock(&row).await?;
    }

    tracing::info!("seeded demo catalog into the in-memory store");
    Ok(())
}
