use std::collections::HashMap;

use async_trait::async_trait;
use common::{OrderId, ProductId, StockId, UserId, VariantId, WarehouseId};
use domain::{
    Money, Order, OrderItem, OrderNumber, Product, ProductRef, ProductVariant, Quantity,
    ShippingInfo, StockOperation, VariantRef, Warehouse, WarehouseRef, WarehouseStock,
};
use sqlx::{
    PgConnection, PgPool, Postgres, Row, Transaction,
    postgres::{PgPoolOptions, PgRow},
};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{InventoryStore, InventoryTx},
};

const STOCK_COLUMNS: &str =
    "id, warehouse_id, variant_id, stock, reserved_stock, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, order_number, user_id, warehouse_id, status, payment_status, \
     payment_method, total_amount_cents, shipping_method, shipping_address, pickup_point, \
     customer_notes, tracking_number, shipped_at, created_at, updated_at";

/// PostgreSQL-backed inventory store implementation.
#[derive(Clone)]
pub struct PostgresInventoryStore {
    pool: PgPool,
}

impl PostgresInventoryStore {
    /// Creates a new PostgreSQL inventory store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("inventory migrations applied");
        Ok(())
    }

    /// Adds a warehouse to the catalog.
    pub async fn insert_warehouse(&self, warehouse: &Warehouse) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO warehouses (id, slug, name, city, is_active, is_main, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(warehouse.id.as_uuid())
        .bind(&warehouse.slug)
        .bind(&warehouse.name)
        .bind(&warehouse.city)
        .bind(warehouse.is_active)
        .bind(warehouse.is_main)
        .bind(warehouse.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Adds a product to the catalog.
    pub async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, slug, name, base_price_cents, is_active)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.slug)
        .bind(&product.name)
        .bind(product.base_price.cents())
        .bind(product.is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Adds a variant to the catalog.
    pub async fn insert_variant(&self, variant: &ProductVariant) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO product_variants (id, product_id, sku, name, price_cents, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(variant.id.as_uuid())
        .bind(variant.product_id.as_uuid())
        .bind(&variant.sku)
        .bind(&variant.name)
        .bind(variant.price.cents())
        .bind(variant.is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_warehouse(row: PgRow) -> Result<Warehouse> {
    Ok(Warehouse {
        id: WarehouseId::from_uuid(row.try_get::<Uuid, _>("id")?),
        slug: row.try_get("slug")?,
        name: row.try_get("name")?,
        city: row.try_get("city")?,
        is_active: row.try_get("is_active")?,
        is_main: row.try_get("is_main")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_product(row: PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
        slug: row.try_get("slug")?,
        name: row.try_get("name")?,
        base_price: Money::from_cents(row.try_get("base_price_cents")?),
        is_active: row.try_get("is_active")?,
    })
}

fn row_to_variant(row: PgRow) -> Result<ProductVariant> {
    Ok(ProductVariant {
        id: VariantId::from_uuid(row.try_get::<Uuid, _>("id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        sku: row.try_get("sku")?,
        name: row.try_get("name")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        is_active: row.try_get("is_active")?,
    })
}

fn row_to_stock(row: PgRow) -> Result<WarehouseStock> {
    Ok(WarehouseStock {
        id: StockId::from_uuid(row.try_get::<Uuid, _>("id")?),
        warehouse_id: WarehouseId::from_uuid(row.try_get::<Uuid, _>("warehouse_id")?),
        variant_id: VariantId::from_uuid(row.try_get::<Uuid, _>("variant_id")?),
        stock: row.try_get("stock")?,
        reserved_stock: row.try_get("reserved_stock")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_item(row: PgRow) -> Result<OrderItem> {
    let quantity: i32 = row.try_get("quantity")?;
    Ok(OrderItem {
        id: row.try_get("id")?,
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        variant_id: row
            .try_get::<Option<Uuid>, _>("variant_id")?
            .map(VariantId::from_uuid),
        quantity: Quantity::new(quantity.into())?.get(),
        price: Money::from_cents(row.try_get("price_cents")?),
    })
}

/// Maps an order row without its items.
fn row_to_order(row: PgRow) -> Result<Order> {
    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_number: OrderNumber::from_string(row.try_get::<String, _>("order_number")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        warehouse_id: WarehouseId::from_uuid(row.try_get::<Uuid, _>("warehouse_id")?),
        status: row.try_get::<String, _>("status")?.parse()?,
        payment_status: row.try_get::<String, _>("payment_status")?.parse()?,
        payment_method: row.try_get::<String, _>("payment_method")?.parse()?,
        total_amount: Money::from_cents(row.try_get("total_amount_cents")?),
        shipping: ShippingInfo {
            method: row.try_get::<String, _>("shipping_method")?.parse()?,
            address: row.try_get("shipping_address")?,
            pickup_point: row.try_get("pickup_point")?,
        },
        customer_notes: row.try_get("customer_notes")?,
        tracking_number: row.try_get("tracking_number")?,
        shipped_at: row.try_get("shipped_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        items: Vec::new(),
    })
}

/// Maps check and unique constraint violations on `warehouse_stocks`.
fn map_stock_error(
    err: sqlx::Error,
    pair: Option<(WarehouseId, VariantId)>,
    stock: i32,
    reserved: i32,
) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        match (db_err.constraint(), pair) {
            (Some("unique_warehouse_variant"), Some((warehouse_id, variant_id))) => {
                return StoreError::DuplicateStockRow {
                    warehouse_id,
                    variant_id,
                };
            }
            (Some("warehouse_stocks_levels_check"), _) => {
                return StoreError::InvalidStockLevels {
                    stock: stock.into(),
                    reserved: reserved.into(),
                };
            }
            _ => {}
        }
    }
    StoreError::Database(err)
}

fn stock_not_found(id: StockId) -> StoreError {
    StoreError::NotFound {
        entity: "warehouse stock",
        id: id.to_string(),
    }
}

async fn fetch_warehouse(
    conn: &mut PgConnection,
    reference: &WarehouseRef,
) -> Result<Option<Warehouse>> {
    let query = match reference {
        WarehouseRef::Id(id) => sqlx::query(
            "SELECT id, slug, name, city, is_active, is_main, created_at FROM warehouses WHERE id = $1",
        )
        .bind(id.as_uuid()),
        WarehouseRef::Slug(slug) => sqlx::query(
            "SELECT id, slug, name, city, is_active, is_main, created_at FROM warehouses WHERE slug = $1",
        )
        .bind(slug.clone()),
    };
    query
        .fetch_optional(conn)
        .await?
        .map(row_to_warehouse)
        .transpose()
}

async fn fetch_product(conn: &mut PgConnection, reference: &ProductRef) -> Result<Option<Product>> {
    let query = match reference {
        ProductRef::Id(id) => sqlx::query(
            "SELECT id, slug, name, base_price_cents, is_active FROM products WHERE id = $1",
        )
        .bind(id.as_uuid()),
        ProductRef::Slug(slug) => sqlx::query(
            "SELECT id, slug, name, base_price_cents, is_active FROM products WHERE slug = $1",
        )
        .bind(slug.clone()),
    };
    query
        .fetch_optional(conn)
        .await?
        .map(row_to_product)
        .transpose()
}

async fn fetch_variant(
    conn: &mut PgConnection,
    reference: &VariantRef,
) -> Result<Option<ProductVariant>> {
    let query = match reference {
        VariantRef::Id(id) => sqlx::query(
            "SELECT id, product_id, sku, name, price_cents, is_active FROM product_variants WHERE id = $1",
        )
        .bind(id.as_uuid()),
        VariantRef::Sku(sku) => sqlx::query(
            "SELECT id, product_id, sku, name, price_cents, is_active FROM product_variants WHERE sku = $1",
        )
        .bind(sku.clone()),
    };
    query
        .fetch_optional(conn)
        .await?
        .map(row_to_variant)
        .transpose()
}

async fn fetch_available_in(
    conn: &mut PgConnection,
    warehouse_id: WarehouseId,
    variant_id: VariantId,
) -> Result<i64> {
    let available: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(stock - reserved_stock), 0)::BIGINT
        FROM warehouse_stocks
        WHERE warehouse_id = $1 AND variant_id = $2
        "#,
    )
    .bind(warehouse_id.as_uuid())
    .bind(variant_id.as_uuid())
    .fetch_one(conn)
    .await?;
    Ok(available)
}

/// Loads the items of the given orders and attaches them in position order.
async fn attach_items(conn: &mut PgConnection, orders: &mut [Order]) -> Result<()> {
    if orders.is_empty() {
        return Ok(());
    }
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id.as_uuid()).collect();
    let rows = sqlx::query(
        r#"
        SELECT id, order_id, product_id, variant_id, quantity, price_cents
        FROM order_items
        WHERE order_id = ANY($1)
        ORDER BY order_id, position ASC
        "#,
    )
    .bind(&ids)
    .fetch_all(conn)
    .await?;

    let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
    for row in rows {
        let item = row_to_item(row)?;
        by_order.entry(item.order_id).or_default().push(item);
    }
    for order in orders.iter_mut() {
        order.items = by_order.remove(&order.id).unwrap_or_default();
    }
    Ok(())
}

async fn fetch_order(conn: &mut PgConnection, id: OrderId, for_update: bool) -> Result<Option<Order>> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1{}",
        if for_update { " FOR UPDATE" } else { "" }
    );
    let Some(row) = sqlx::query(&sql)
        .bind(id.as_uuid())
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };
    let mut orders = [row_to_order(row)?];
    attach_items(conn, &mut orders).await?;
    let [order] = orders;
    Ok(Some(order))
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    type Tx = PostgresTx;

    async fn begin(&self) -> Result<PostgresTx> {
        Ok(PostgresTx {
            tx: self.pool.begin().await?,
        })
    }

    async fn find_warehouse(&self, reference: &WarehouseRef) -> Result<Option<Warehouse>> {
        let mut conn = self.pool.acquire().await?;
        fetch_warehouse(&mut conn, reference).await
    }

    async fn find_variant(&self, reference: &VariantRef) -> Result<Option<ProductVariant>> {
        let mut conn = self.pool.acquire().await?;
        fetch_variant(&mut conn, reference).await
    }

    async fn get_stock(&self, id: StockId) -> Result<Option<WarehouseStock>> {
        let sql = format!("SELECT {STOCK_COLUMNS} FROM warehouse_stocks WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_stock)
            .transpose()
    }

    async fn get_stock_for(
        &self,
        warehouse_id: WarehouseId,
        variant_id: VariantId,
    ) -> Result<Option<WarehouseStock>> {
        let sql = format!(
            "SELECT {STOCK_COLUMNS} FROM warehouse_stocks WHERE warehouse_id = $1 AND variant_id = $2"
        );
        sqlx::query(&sql)
            .bind(warehouse_id.as_uuid())
            .bind(variant_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_stock)
            .transpose()
    }

    async fn stock_by_variant(&self, variant_id: VariantId) -> Result<Vec<WarehouseStock>> {
        let sql = format!(
            "SELECT {STOCK_COLUMNS} FROM warehouse_stocks WHERE variant_id = $1 ORDER BY warehouse_id"
        );
        let rows = sqlx::query(&sql)
            .bind(variant_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_stock).collect()
    }

    async fn stock_by_warehouse(&self, warehouse_id: WarehouseId) -> Result<Vec<WarehouseStock>> {
        let sql = format!(
            "SELECT {STOCK_COLUMNS} FROM warehouse_stocks WHERE warehouse_id = $1 ORDER BY variant_id"
        );
        let rows = sqlx::query(&sql)
            .bind(warehouse_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_stock).collect()
    }

    async fn list_stock(&self) -> Result<Vec<WarehouseStock>> {
        let sql = format!(
            "SELECT {STOCK_COLUMNS} FROM warehouse_stocks ORDER BY warehouse_id, variant_id"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_stock).collect()
    }

    async fn available_stock(&self, variant_id: VariantId) -> Result<i64> {
        let available: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(stock - reserved_stock), 0)::BIGINT
            FROM warehouse_stocks
            WHERE variant_id = $1
            "#,
        )
        .bind(variant_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(available)
    }

    async fn available_stock_in(
        &self,
        warehouse_id: WarehouseId,
        variant_id: VariantId,
    ) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        fetch_available_in(&mut conn, warehouse_id, variant_id).await
    }

    async fn insert_stock(&self, row: &WarehouseStock) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO warehouse_stocks (id, warehouse_id, variant_id, stock, reserved_stock, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(row.id.as_uuid())
        .bind(row.warehouse_id.as_uuid())
        .bind(row.variant_id.as_uuid())
        .bind(row.stock)
        .bind(row.reserved_stock)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_stock_error(
                e,
                Some((row.warehouse_id, row.variant_id)),
                row.stock,
                row.reserved_stock,
            )
        })?;
        Ok(())
    }

    async fn overwrite_stock(
        &self,
        id: StockId,
        stock: i32,
        reserved: i32,
    ) -> Result<WarehouseStock> {
        let sql = format!(
            "UPDATE warehouse_stocks SET stock = $2, reserved_stock = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING {STOCK_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(stock)
            .bind(reserved)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_stock_error(e, None, stock, reserved))?
            .ok_or_else(|| stock_not_found(id))?;
        row_to_stock(row)
    }

    async fn delete_stock(&self, id: StockId) -> Result<()> {
        let result = sqlx::query("DELETE FROM warehouse_stocks WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(stock_not_found(id));
        }
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        fetch_order(&mut conn, id, false).await
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.as_uuid())
            .fetch_all(&mut *conn)
            .await?;
        let mut orders = rows
            .into_iter()
            .map(row_to_order)
            .collect::<Result<Vec<_>>>()?;
        attach_items(&mut conn, &mut orders).await?;
        Ok(orders)
    }
}

/// Transaction over [`PostgresInventoryStore`].
///
/// Dropping it without calling `commit` rolls back.
pub struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl InventoryTx for PostgresTx {
    async fn find_warehouse(&mut self, reference: &WarehouseRef) -> Result<Option<Warehouse>> {
        fetch_warehouse(&mut self.tx, reference).await
    }

    async fn main_warehouses(&mut self) -> Result<Vec<Warehouse>> {
        let rows = sqlx::query(
            r#"
            SELECT id, slug, name, city, is_active, is_main, created_at
            FROM warehouses
            WHERE is_main = TRUE AND is_active = TRUE
            ORDER BY id
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(row_to_warehouse).collect()
    }

    async fn find_product(&mut self, reference: &ProductRef) -> Result<Option<Product>> {
        fetch_product(&mut self.tx, reference).await
    }

    async fn find_variant(&mut self, reference: &VariantRef) -> Result<Option<ProductVariant>> {
        fetch_variant(&mut self.tx, reference).await
    }

    async fn apply_stock_operation(
        &mut self,
        operation: StockOperation,
        warehouse_id: WarehouseId,
        variant_id: VariantId,
        quantity: Quantity,
    ) -> Result<bool> {
        let sql = match operation {
            StockOperation::Reserve => {
                r#"
                UPDATE warehouse_stocks
                SET reserved_stock = reserved_stock + $3, updated_at = NOW()
                WHERE warehouse_id = $1 AND variant_id = $2 AND stock - reserved_stock >= $3
                "#
            }
            StockOperation::Release => {
                r#"
                UPDATE warehouse_stocks
                SET reserved_stock = reserved_stock - $3, updated_at = NOW()
                WHERE warehouse_id = $1 AND variant_id = $2 AND reserved_stock >= $3
                "#
            }
            StockOperation::Consume => {
                r#"
                UPDATE warehouse_stocks
                SET stock = stock - $3, reserved_stock = reserved_stock - $3, updated_at = NOW()
                WHERE warehouse_id = $1 AND variant_id = $2 AND reserved_stock >= $3
                "#
            }
        };
        let result = sqlx::query(sql)
            .bind(warehouse_id.as_uuid())
            .bind(variant_id.as_uuid())
            .bind(quantity.as_i32())
            .execute(&mut *self.tx)
            .await?;
        let applied = result.rows_affected() > 0;
        if !applied {
            tracing::debug!(%warehouse_id, %variant_id, %quantity, %operation, "stock guard rejected update");
        }
        Ok(applied)
    }

    async fn available_stock_in(
        &mut self,
        warehouse_id: WarehouseId,
        variant_id: VariantId,
    ) -> Result<i64> {
        fetch_available_in(&mut self.tx, warehouse_id, variant_id).await
    }

    async fn ensure_stock_row(
        &mut self,
        warehouse_id: WarehouseId,
        variant_id: VariantId,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO warehouse_stocks (id, warehouse_id, variant_id, stock, reserved_stock)
            VALUES ($1, $2, $3, 0, 0)
            ON CONFLICT (warehouse_id, variant_id) DO NOTHING
            "#,
        )
        .bind(StockId::new().as_uuid())
        .bind(warehouse_id.as_uuid())
        .bind(variant_id.as_uuid())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn lock_stock_rows(
        &mut self,
        variant_id: VariantId,
        warehouse_ids: &[WarehouseId],
    ) -> Result<Vec<WarehouseStock>> {
        let ids: Vec<Uuid> = warehouse_ids.iter().map(WarehouseId::as_uuid).collect();
        let sql = format!(
            "SELECT {STOCK_COLUMNS} FROM warehouse_stocks \
             WHERE variant_id = $1 AND warehouse_id = ANY($2) \
             ORDER BY warehouse_id FOR UPDATE"
        );
        let rows = sqlx::query(&sql)
            .bind(variant_id.as_uuid())
            .bind(&ids)
            .fetch_all(&mut *self.tx)
            .await?;
        rows.into_iter().map(row_to_stock).collect()
    }

    async fn set_stock(&mut self, id: StockId, stock: i32) -> Result<WarehouseStock> {
        let reserved: i32 =
            sqlx::query_scalar("SELECT reserved_stock FROM warehouse_stocks WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await?
                .ok_or_else(|| stock_not_found(id))?;
        WarehouseStock::validate_levels(stock, reserved).map_err(|_| {
            StoreError::InvalidStockLevels {
                stock: stock.into(),
                reserved: reserved.into(),
            }
        })?;

        let sql = format!(
            "UPDATE warehouse_stocks SET stock = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {STOCK_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(stock)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_stock_error(e, None, stock, reserved))?;
        row_to_stock(row)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, user_id, warehouse_id, status, payment_status, payment_method,
                total_amount_cents, shipping_method, shipping_address, pickup_point,
                customer_notes, tracking_number, shipped_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.order_number.as_str())
        .bind(order.user_id.as_uuid())
        .bind(order.warehouse_id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.payment_method.as_str())
        .bind(order.total_amount.cents())
        .bind(order.shipping.method.as_str())
        .bind(order.shipping.address.as_deref())
        .bind(order.shipping.pickup_point.as_deref())
        .bind(order.customer_notes.as_deref())
        .bind(order.tracking_number.as_deref())
        .bind(order.shipped_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, position, product_id, variant_id, quantity, price_cents)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(item.id)
            .bind(order.id.as_uuid())
            .bind(position as i32)
            .bind(item.product_id.as_uuid())
            .bind(item.variant_id.map(|v| v.as_uuid()))
            .bind(item.quantity as i32)
            .bind(item.price.cents())
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        fetch_order(&mut self.tx, id, true).await
    }

    async fn update_order_status(&mut self, order: &Order) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, payment_status = $3, tracking_number = $4, shipped_at = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.tracking_number.as_deref())
        .bind(order.shipped_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "order",
                id: order.id.to_string(),
            });
        }
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
