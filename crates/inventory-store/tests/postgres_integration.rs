//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p inventory-store --test postgres_integration
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{OrderId, UserId, VariantId, WarehouseId};
use domain::{
    Money, Order, OrderItem, OrderNumber, OrderStatus, PaymentMethod, PaymentStatus, Product,
    ProductRef, ProductVariant, Quantity, ShippingInfo, StockOperation, VariantRef, Warehouse,
    WarehouseRef, WarehouseStock,
};
use inventory_store::{InventoryStore, InventoryTx, PostgresInventoryStore, StoreError};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let _ = tracing_subscriber::fmt().with_test_writer().try_init();

            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_inventory_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresInventoryStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE order_items, orders, warehouse_stocks, product_variants, products, warehouses",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresInventoryStore::new(pool)
}

struct Catalog {
    main: Warehouse,
    north: Warehouse,
    product: Product,
    variant: ProductVariant,
}

async fn seed_catalog(store: &PostgresInventoryStore) -> Catalog {
    let main = Warehouse::new("central", "Central", "Springfield").main();
    let north = Warehouse::new("north", "North", "Shelbyville");
    let product = Product::new("tee", "T-Shirt", Money::from_cents(1500));
    let variant = ProductVariant::new(product.id, "TEE-M", "Medium", Money::from_cents(1600));

    store.insert_warehouse(&main).await.unwrap();
    store.insert_warehouse(&north).await.unwrap();
    store.insert_product(&product).await.unwrap();
    store.insert_variant(&variant).await.unwrap();

    Catalog {
        main,
        north,
        product,
        variant,
    }
}

fn qty(n: i64) -> Quantity {
    Quantity::new(n).unwrap()
}

fn sample_order(catalog: &Catalog, quantity: u32) -> Order {
    let id = OrderId::new();
    let now = Utc::now();
    let items = vec![
        OrderItem {
            id: uuid::Uuid::new_v4(),
            order_id: id,
            product_id: catalog.product.id,
            variant_id: Some(catalog.variant.id),
            quantity,
            price: catalog.variant.price,
        },
        OrderItem {
            id: uuid::Uuid::new_v4(),
            order_id: id,
            product_id: catalog.product.id,
            variant_id: None,
            quantity: 1,
            price: catalog.product.base_price,
        },
    ];
    let mut order = Order {
        id,
        order_number: OrderNumber::generate(now),
        user_id: UserId::new(),
        warehouse_id: catalog.main.id,
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Pending,
        payment_method: PaymentMethod::Card,
        total_amount: Money::zero(),
        shipping: ShippingInfo::delivery("1 Main St"),
        customer_notes: Some("leave at door".to_string()),
        tracking_number: None,
        shipped_at: None,
        created_at: now,
        updated_at: now,
        items,
    };
    order.total_amount = order.items_total().unwrap();
    order
}

#[tokio::test]
#[serial]
async fn insert_and_read_stock_rows() {
    let store = get_test_store().await;
    let catalog = seed_catalog(&store).await;

    let row = WarehouseStock::new(catalog.main.id, catalog.variant.id, 10, 2).unwrap();
    store.insert_stock(&row).await.unwrap();

    let by_id = store.get_stock(row.id).await.unwrap().unwrap();
    assert_eq!(by_id.stock, 10);
    assert_eq!(by_id.reserved_stock, 2);

    let by_pair = store
        .get_stock_for(catalog.main.id, catalog.variant.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_pair.id, row.id);

    assert_eq!(store.available_stock(catalog.variant.id).await.unwrap(), 8);
    assert_eq!(
        store
            .available_stock_in(catalog.north.id, catalog.variant.id)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
#[serial]
async fn duplicate_pair_maps_to_store_error() {
    let store = get_test_store().await;
    let catalog = seed_catalog(&store).await;

    let row = WarehouseStock::new(catalog.main.id, catalog.variant.id, 10, 0).unwrap();
    store.insert_stock(&row).await.unwrap();

    let duplicate = WarehouseStock::new(catalog.main.id, catalog.variant.id, 3, 0).unwrap();
    let result = store.insert_stock(&duplicate).await;
    assert!(matches!(result, Err(StoreError::DuplicateStockRow { .. })));
}

#[tokio::test]
#[serial]
async fn level_check_constraint_maps_to_store_error() {
    let store = get_test_store().await;
    let catalog = seed_catalog(&store).await;

    let row = WarehouseStock::new(catalog.main.id, catalog.variant.id, 10, 0).unwrap();
    store.insert_stock(&row).await.unwrap();

    let result = store.overwrite_stock(row.id, 2, 5).await;
    assert!(matches!(result, Err(StoreError::InvalidStockLevels { .. })));

    let missing = store.overwrite_stock(common::StockId::new(), 2, 1).await;
    assert!(matches!(missing, Err(StoreError::NotFound { .. })));
}

#[tokio::test]
#[serial]
async fn reserve_guard_is_conditional() {
    let store = get_test_store().await;
    let catalog = seed_catalog(&store).await;
    let row = WarehouseStock::new(catalog.main.id, catalog.variant.id, 5, 0).unwrap();
    store.insert_stock(&row).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    assert!(
        tx.apply_stock_operation(
            StockOperation::Reserve,
            catalog.main.id,
            catalog.variant.id,
            qty(4)
        )
        .await
        .unwrap()
    );
    assert!(
        !tx.apply_stock_operation(
            StockOperation::Reserve,
            catalog.main.id,
            catalog.variant.id,
            qty(2)
        )
        .await
        .unwrap()
    );
    tx.commit().await.unwrap();

    let stored = store.get_stock(row.id).await.unwrap().unwrap();
    assert_eq!(stored.reserved_stock, 4);
}

#[tokio::test]
#[serial]
async fn rolled_back_transaction_leaves_no_trace() {
    let store = get_test_store().await;
    let catalog = seed_catalog(&store).await;
    let row = WarehouseStock::new(catalog.main.id, catalog.variant.id, 5, 0).unwrap();
    store.insert_stock(&row).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.apply_stock_operation(
        StockOperation::Reserve,
        catalog.main.id,
        catalog.variant.id,
        qty(3),
    )
    .await
    .unwrap();
    tx.rollback().await.unwrap();

    let stored = store.get_stock(row.id).await.unwrap().unwrap();
    assert_eq!(stored.reserved_stock, 0);
}

#[tokio::test]
#[serial]
async fn concurrent_reservations_never_oversell() {
    let store = get_test_store().await;
    let catalog = seed_catalog(&store).await;
    let row = WarehouseStock::new(catalog.main.id, catalog.variant.id, 10, 0).unwrap();
    store.insert_stock(&row).await.unwrap();

    let (warehouse_id, variant_id) = (catalog.main.id, catalog.variant.id);
    let reserve = move |store: PostgresInventoryStore| async move {
        let mut tx = store.begin().await.unwrap();
        let applied = tx
            .apply_stock_operation(StockOperation::Reserve, warehouse_id, variant_id, qty(6))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        applied
    };

    let (a, b) = tokio::join!(reserve(store.clone()), reserve(store.clone()));
    assert!(a ^ b, "exactly one reservation must succeed");

    let stored = store.get_stock(row.id).await.unwrap().unwrap();
    assert_eq!(stored.reserved_stock, 6);
}

#[tokio::test]
#[serial]
async fn ensure_and_lock_rows_for_transfer() {
    let store = get_test_store().await;
    let catalog = seed_catalog(&store).await;
    let row = WarehouseStock::new(catalog.main.id, catalog.variant.id, 10, 0).unwrap();
    store.insert_stock(&row).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.ensure_stock_row(catalog.north.id, catalog.variant.id)
        .await
        .unwrap();
    tx.ensure_stock_row(catalog.north.id, catalog.variant.id)
        .await
        .unwrap();
    let locked = tx
        .lock_stock_rows(catalog.variant.id, &[catalog.main.id, catalog.north.id])
        .await
        .unwrap();
    assert_eq!(locked.len(), 2);
    assert!(locked[0].warehouse_id < locked[1].warehouse_id);

    let source = locked
        .iter()
        .find(|r| r.warehouse_id == catalog.main.id)
        .unwrap();
    let dest = locked
        .iter()
        .find(|r| r.warehouse_id == catalog.north.id)
        .unwrap();
    tx.set_stock(source.id, source.stock - 4).await.unwrap();
    tx.set_stock(dest.id, dest.stock + 4).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(store.available_stock(catalog.variant.id).await.unwrap(), 10);
    assert_eq!(
        store
            .available_stock_in(catalog.north.id, catalog.variant.id)
            .await
            .unwrap(),
        4
    );
}

/// Moves `quantity` units with the same statement sequence the transfer
/// service uses: open the destination row, lock both rows, rewrite both.
async fn move_stock(
    store: PostgresInventoryStore,
    variant_id: VariantId,
    from: WarehouseId,
    to: WarehouseId,
    quantity: i32,
) -> Result<(), StoreError> {
    let mut tx = store.begin().await?;
    tx.ensure_stock_row(to, variant_id).await?;
    let locked = tx.lock_stock_rows(variant_id, &[from, to]).await?;
    let source = locked.iter().find(|r| r.warehouse_id == from).unwrap();
    let dest = locked.iter().find(|r| r.warehouse_id == to).unwrap();
    tx.set_stock(source.id, source.stock - quantity).await?;
    tx.set_stock(dest.id, dest.stock + quantity).await?;
    tx.commit().await
}

#[tokio::test]
#[serial]
async fn opposite_transfers_run_concurrently_and_conserve_stock() {
    let store = get_test_store().await;
    let catalog = seed_catalog(&store).await;
    let (main, north, variant) = (catalog.main.id, catalog.north.id, catalog.variant.id);
    store
        .insert_stock(&WarehouseStock::new(main, variant, 50, 0).unwrap())
        .await
        .unwrap();
    store
        .insert_stock(&WarehouseStock::new(north, variant, 30, 0).unwrap())
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        move_stock(store.clone(), variant, main, north, 7),
        move_stock(store.clone(), variant, north, main, 3),
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(store.available_stock(variant).await.unwrap(), 80);
    assert_eq!(store.available_stock_in(main, variant).await.unwrap(), 46);
    assert_eq!(store.available_stock_in(north, variant).await.unwrap(), 34);
    assert_eq!(store.stock_by_variant(variant).await.unwrap().len(), 2);
}

#[tokio::test]
#[serial]
async fn concurrent_transfers_into_new_pair_share_one_row() {
    let store = get_test_store().await;
    let catalog = seed_catalog(&store).await;
    let south = Warehouse::new("south", "South", "Ogdenville");
    store.insert_warehouse(&south).await.unwrap();
    let (main, north, variant) = (catalog.main.id, catalog.north.id, catalog.variant.id);
    store
        .insert_stock(&WarehouseStock::new(main, variant, 20, 0).unwrap())
        .await
        .unwrap();
    store
        .insert_stock(&WarehouseStock::new(south.id, variant, 20, 0).unwrap())
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        move_stock(store.clone(), variant, main, north, 5),
        move_stock(store.clone(), variant, south.id, north, 8),
    );
    a.unwrap();
    b.unwrap();

    let rows = store.stock_by_warehouse(north).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].variant_id, variant);
    assert_eq!(rows[0].stock, 13);
    assert_eq!(rows[0].reserved_stock, 0);
    assert_eq!(store.available_stock(variant).await.unwrap(), 40);
}

#[tokio::test]
#[serial]
async fn set_stock_below_reserved_is_rejected() {
    let store = get_test_store().await;
    let catalog = seed_catalog(&store).await;
    let row = WarehouseStock::new(catalog.main.id, catalog.variant.id, 10, 8).unwrap();
    store.insert_stock(&row).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let result = tx.set_stock(row.id, 5).await;
    assert!(matches!(result, Err(StoreError::InvalidStockLevels { .. })));
}

#[tokio::test]
#[serial]
async fn catalog_lookups_by_human_identifier() {
    let store = get_test_store().await;
    let catalog = seed_catalog(&store).await;

    let warehouse = store
        .find_warehouse(&WarehouseRef::parse("north"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(warehouse.id, catalog.north.id);

    let variant = store
        .find_variant(&VariantRef::parse("TEE-M"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(variant.id, catalog.variant.id);

    let mut tx = store.begin().await.unwrap();
    let product = tx
        .find_product(&ProductRef::parse("tee"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.base_price, Money::from_cents(1500));

    let mains = tx.main_warehouses().await.unwrap();
    assert_eq!(mains.len(), 1);
    assert_eq!(mains[0].id, catalog.main.id);

    assert!(
        tx.find_variant(&VariantRef::Id(VariantId::new()))
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        tx.find_warehouse(&WarehouseRef::Id(WarehouseId::new()))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
#[serial]
async fn orders_round_trip_with_items_in_order() {
    let store = get_test_store().await;
    let catalog = seed_catalog(&store).await;
    let order = sample_order(&catalog, 3);

    let mut tx = store.begin().await.unwrap();
    tx.insert_order(&order).await.unwrap();
    tx.commit().await.unwrap();

    let loaded = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(loaded.order_number, order.order_number);
    assert_eq!(loaded.total_amount, Money::from_cents(3 * 1600 + 1500));
    assert_eq!(loaded.items.len(), 2);
    assert_eq!(loaded.items[0].variant_id, Some(catalog.variant.id));
    assert_eq!(loaded.items[1].variant_id, None);
    assert_eq!(loaded.customer_notes.as_deref(), Some("leave at door"));

    let for_user = store.orders_for_user(order.user_id).await.unwrap();
    assert_eq!(for_user.len(), 1);
    assert_eq!(for_user[0].items.len(), 2);
}

#[tokio::test]
#[serial]
async fn order_status_updates_persist() {
    let store = get_test_store().await;
    let catalog = seed_catalog(&store).await;
    let order = sample_order(&catalog, 1);

    let mut tx = store.begin().await.unwrap();
    tx.insert_order(&order).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let mut locked = tx.lock_order(order.id).await.unwrap().unwrap();
    locked.ship(Some("TRK-42".to_string()), Utc::now()).unwrap();
    tx.update_order_status(&locked).await.unwrap();
    tx.commit().await.unwrap();

    let loaded = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, OrderStatus::Shipped);
    assert_eq!(loaded.tracking_number.as_deref(), Some("TRK-42"));
    assert!(loaded.shipped_at.is_some());
}
