//! Order creation and the status operations that move reserved stock.

use std::time::Instant;

use chrono::Utc;
use common::{OrderId, UserId};
use domain::{
    Money, Order, OrderItem, OrderNumber, OrderStatus, PaymentMethod, PaymentStatus, ProductRef,
    Quantity, ShippingInfo, VariantRef,
};
use inventory_store::{InventoryStore, InventoryTx};
use uuid::Uuid;

use crate::catalog::resolve_line;
use crate::directory::{MainWarehouseSelector, main_warehouse};
use crate::error::{InventoryError, Result};
use crate::reservation::{consume_in, release_in, reserve_in};
use crate::transaction::finish;

/// One requested order line.
#[derive(Debug, Clone)]
pub struct OrderLineRequest {
    pub product: ProductRef,
    /// Lines without a variant are priced at the product's base price and
    /// are not stock-checked.
    pub variant: Option<VariantRef>,
    pub quantity: i64,
}

impl OrderLineRequest {
    pub fn new(product: ProductRef, variant: Option<VariantRef>, quantity: i64) -> Self {
        Self {
            product,
            variant,
            quantity,
        }
    }
}

/// Everything needed to place an order.
#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    pub user_id: UserId,
    pub items: Vec<OrderLineRequest>,
    pub shipping: ShippingInfo,
    pub payment_method: PaymentMethod,
    pub customer_notes: Option<String>,
}

struct ValidatedLine<'a> {
    product: &'a ProductRef,
    variant: Option<&'a VariantRef>,
    quantity: Quantity,
}

fn validate(request: &CreateOrderRequest) -> Result<Vec<ValidatedLine<'_>>> {
    if request.items.is_empty() {
        return Err(InventoryError::Validation(
            "order must contain at least one item".to_string(),
        ));
    }
    request.shipping.validate()?;
    request
        .items
        .iter()
        .map(|line| {
            Ok::<_, InventoryError>(ValidatedLine {
                product: &line.product,
                variant: line.variant.as_ref(),
                quantity: Quantity::new(line.quantity)?,
            })
        })
        .collect()
}

/// Places orders against the main warehouse and moves their reservations.
pub struct OrderFulfillment<S: InventoryStore> {
    store: S,
    main_warehouse: MainWarehouseSelector,
}

impl<S: InventoryStore> OrderFulfillment<S> {
    /// Creates a new order fulfillment service using the flagged main warehouse.
    pub fn new(store: S) -> Self {
        Self {
            store,
            main_warehouse: MainWarehouseSelector::Flagged,
        }
    }

    /// Overrides how the main warehouse is chosen.
    pub fn with_main_warehouse(mut self, selector: MainWarehouseSelector) -> Self {
        self.main_warehouse = selector;
        self
    }

    /// Places an order.
    ///
    /// Every variant line is reserved at the main warehouse and the order is
    /// inserted in the same transaction. The first failing line aborts the
    /// whole order and releases whatever was reserved before it.
    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id, items = request.items.len()))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<Order> {
        let start = Instant::now();
        let result = self.try_create_order(&request).await;
        metrics::histogram!("order_creation_duration_seconds")
            .record(start.elapsed().as_secs_f64());

        match &result {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                tracing::info!(
                    order_id = %order.id,
                    order_number = %order.order_number,
                    total = %order.total_amount,
                    "order created"
                );
            }
            Err(e) => {
                metrics::counter!("order_creation_failures_total", "reason" => e.kind())
                    .increment(1);
                if e.is_configuration_error() {
                    tracing::error!(error = %e, "order rejected: main warehouse misconfigured");
                } else {
                    tracing::warn!(error = %e, "order rejected");
                }
            }
        }
        result
    }

    async fn try_create_order(&self, request: &CreateOrderRequest) -> Result<Order> {
        let lines = validate(request)?;
        let mut tx = self.store.begin().await?;
        let result = self.place(&mut tx, request, &lines).await;
        finish(tx, result).await
    }

    async fn place(
        &self,
        tx: &mut S::Tx,
        request: &CreateOrderRequest,
        lines: &[ValidatedLine<'_>],
    ) -> Result<Order> {
        let warehouse = main_warehouse(tx, &self.main_warehouse).await?;
        let order_id = OrderId::new();
        let now = Utc::now();

        let mut items = Vec::with_capacity(lines.len());
        let mut total = Money::zero();
        for line in lines {
            let (product, variant) = resolve_line(tx, line.product, line.variant).await?;
            if let Some(variant) = &variant {
                reserve_in(tx, warehouse.id, variant.id, line.quantity).await?;
            }

            let item = OrderItem {
                id: Uuid::new_v4(),
                order_id,
                product_id: product.id,
                price: variant.as_ref().map_or(product.base_price, |v| v.price),
                variant_id: variant.map(|v| v.id),
                quantity: line.quantity.get(),
            };
            total = item
                .line_total()
                .and_then(|line_total| total.checked_add(line_total))
                .ok_or_else(|| InventoryError::Validation("order total overflows".to_string()))?;
            items.push(item);
        }

        let order = Order {
            id: order_id,
            order_number: OrderNumber::generate(now),
            user_id: request.user_id,
            warehouse_id: warehouse.id,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: request.payment_method,
            total_amount: total,
            shipping: request.shipping.clone(),
            customer_notes: request
                .customer_notes
                .as_deref()
                .map(str::trim)
                .filter(|notes| !notes.is_empty())
                .map(str::to_string),
            tracking_number: None,
            shipped_at: None,
            created_at: now,
            updated_at: now,
            items,
        };
        tx.insert_order(&order).await?;
        Ok(order)
    }

    /// Retrieves an order with its items.
    pub async fn get_order(&self, id: OrderId) -> Result<Order> {
        self.store
            .get_order(id)
            .await?
            .ok_or_else(|| InventoryError::not_found("order", id))
    }

    /// Retrieves a user's orders, newest first.
    pub async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        Ok(self.store.orders_for_user(user_id).await?)
    }

    /// Cancels an order and releases its reservations.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, id: OrderId) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let result = Self::cancel_in(&mut tx, id).await;
        let order = finish(tx, result).await?;
        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(order_id = %id, "order cancelled");
        Ok(order)
    }

    async fn cancel_in(tx: &mut S::Tx, id: OrderId) -> Result<Order> {
        let mut order = tx
            .lock_order(id)
            .await?
            .ok_or_else(|| InventoryError::not_found("order", id))?;
        let holds_reservations = order.status.holds_reservations();
        order.cancel(Utc::now())?;
        if holds_reservations {
            for (variant_id, quantity) in order.reserved_lines() {
                let quantity = Quantity::new(quantity.into())?;
                release_in(tx, order.warehouse_id, variant_id, quantity).await?;
            }
        }
        tx.update_order_status(&order).await?;
        Ok(order)
    }

    /// Ships an order, consuming its reservations.
    #[tracing::instrument(skip(self))]
    pub async fn ship_order(&self, id: OrderId, tracking_number: Option<String>) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let result = Self::ship_in(&mut tx, id, tracking_number).await;
        let order = finish(tx, result).await?;
        metrics::counter!("orders_shipped_total").increment(1);
        tracing::info!(order_id = %id, "order shipped");
        Ok(order)
    }

    async fn ship_in(
        tx: &mut S::Tx,
        id: OrderId,
        tracking_number: Option<String>,
    ) -> Result<Order> {
        let mut order = tx
            .lock_order(id)
            .await?
            .ok_or_else(|| InventoryError::not_found("order", id))?;
        order.ship(tracking_number, Utc::now())?;
        for (variant_id, quantity) in order.reserved_lines() {
            let quantity = Quantity::new(quantity.into())?;
            consume_in(tx, order.warehouse_id, variant_id, quantity).await?;
        }
        tx.update_order_status(&order).await?;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use domain::{Product, Warehouse};

    fn request(items: Vec<OrderLineRequest>) -> CreateOrderRequest {
        CreateOrderRequest {
            user_id: UserId::new(),
            items,
            shipping: ShippingInfo::delivery("742 Evergreen Terrace"),
            payment_method: PaymentMethod::Card,
            customer_notes: Some("  ".to_string()),
        }
    }

    fn tee_line(quantity: i64) -> OrderLineRequest {
        OrderLineRequest::new(
            ProductRef::parse("tee"),
            Some(VariantRef::parse("TEE-M")),
            quantity,
        )
    }

    #[tokio::test]
    async fn test_create_order_reserves_and_prices() {
        let fx = Fixture::with_stock(10, 0).await;
        let service = OrderFulfillment::new(fx.store.clone());

        let order = service
            .create_order(request(vec![
                tee_line(3),
                OrderLineRequest::new(ProductRef::parse("mug"), None, 2),
            ]))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.warehouse_id, fx.main.id);
        assert_eq!(order.total_amount, Money::from_cents(3 * 1600 + 2 * 800));
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[1].variant_id, None);
        assert_eq!(order.customer_notes, None);
        assert_eq!(fx.levels().await, (10, 3));

        let stored = service.get_order(order.id).await.unwrap();
        assert_eq!(stored, order);
    }

    #[tokio::test]
    async fn test_failing_line_rolls_back_earlier_reservations() {
        let fx = Fixture::with_stock(10, 0).await;
        let service = OrderFulfillment::new(fx.store.clone());

        let err = service
            .create_order(request(vec![
                tee_line(4),
                OrderLineRequest::new(
                    ProductRef::parse("mug"),
                    Some(VariantRef::parse("MUG-BLUE")),
                    1,
                ),
            ]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            InventoryError::InsufficientStock { available: 0, .. }
        ));
        assert_eq!(fx.levels().await, (10, 0));
        assert_eq!(fx.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_order_insert_failure_rolls_back() {
        let fx = Fixture::with_stock(10, 0).await;
        fx.store.set_fail_on_order_insert(true);
        let service = OrderFulfillment::new(fx.store.clone());

        let err = service.create_order(request(vec![tee_line(2)])).await.unwrap_err();
        assert!(matches!(err, InventoryError::Store(_)));
        assert_eq!(fx.levels().await, (10, 0));
    }

    #[tokio::test]
    async fn test_pre_validation() {
        let fx = Fixture::with_stock(10, 0).await;
        let service = OrderFulfillment::new(fx.store.clone());

        let err = service.create_order(request(vec![])).await.unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));

        let err = service
            .create_order(request(vec![tee_line(1), tee_line(0)]))
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));

        let mut pickup = request(vec![tee_line(1)]);
        pickup.shipping = ShippingInfo {
            method: domain::ShippingMethod::Pickup,
            address: None,
            pickup_point: None,
        };
        let err = service.create_order(pickup).await.unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
        assert_eq!(fx.levels().await, (10, 0));
    }

    #[tokio::test]
    async fn test_order_total_overflow_is_rejected() {
        let fx = Fixture::with_stock(10, 0).await;
        fx.store
            .insert_product(Product::new(
                "bullion",
                "Gold Bar",
                Money::from_cents(5_000_000_000),
            ))
            .await;
        let service = OrderFulfillment::new(fx.store.clone());

        let err = service
            .create_order(request(vec![
                tee_line(2),
                OrderLineRequest::new(ProductRef::parse("bullion"), None, 2_000_000_000),
            ]))
            .await
            .unwrap_err();

        assert!(matches!(err, InventoryError::Validation(ref m) if m.contains("overflows")));
        assert_eq!(fx.levels().await, (10, 0));
        assert_eq!(fx.store.order_count().await, 0);

        let order = service
            .create_order(request(vec![OrderLineRequest::new(
                ProductRef::parse("bullion"),
                None,
                1_000_000,
            )]))
            .await
            .unwrap();
        assert_eq!(order.total_amount.cents(), 5_000_000_000_000_000);
    }

    #[tokio::test]
    async fn test_main_warehouse_errors_are_distinct() {
        let fx = Fixture::with_stock(10, 0).await;
        fx.store
            .insert_warehouse(Warehouse::new("south", "South", "Ogdenville").main())
            .await;
        let service = OrderFulfillment::new(fx.store.clone());

        let err = service.create_order(request(vec![tee_line(1)])).await.unwrap_err();
        assert!(matches!(
            err,
            InventoryError::AmbiguousMainWarehouse { count: 2 }
        ));
        assert!(err.is_configuration_error());

        let configured = OrderFulfillment::new(fx.store.clone())
            .with_main_warehouse(MainWarehouseSelector::Slug("central".to_string()));
        let order = configured
            .create_order(request(vec![tee_line(1)]))
            .await
            .unwrap();
        assert_eq!(order.warehouse_id, fx.main.id);
    }

    #[tokio::test]
    async fn test_cancel_releases_reservations() {
        let fx = Fixture::with_stock(10, 0).await;
        let service = OrderFulfillment::new(fx.store.clone());
        let order = service.create_order(request(vec![tee_line(4)])).await.unwrap();
        assert_eq!(fx.levels().await, (10, 4));

        let cancelled = service.cancel_order(order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Cancelled);
        assert_eq!(fx.levels().await, (10, 0));

        let err = service.cancel_order(order.id).await.unwrap_err();
        assert!(matches!(err, InventoryError::InvalidStatusTransition { .. }));
        assert_eq!(fx.levels().await, (10, 0));
    }

    #[tokio::test]
    async fn test_ship_consumes_reservations() {
        let fx = Fixture::with_stock(10, 0).await;
        let service = OrderFulfillment::new(fx.store.clone());
        let order = service.create_order(request(vec![tee_line(4)])).await.unwrap();

        let shipped = service
            .ship_order(order.id, Some("TRK-1".to_string()))
            .await
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert_eq!(shipped.tracking_number.as_deref(), Some("TRK-1"));
        assert_eq!(fx.levels().await, (6, 0));

        let err = service.cancel_order(order.id).await.unwrap_err();
        assert!(matches!(err, InventoryError::InvalidStatusTransition { .. }));

        let stored = service.get_order(order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let fx = Fixture::with_stock(10, 0).await;
        let service = OrderFulfillment::new(fx.store.clone());

        let err = service.get_order(OrderId::new()).await.unwrap_err();
        assert!(matches!(err, InventoryError::NotFound { entity: "order", .. }));
        let err = service.ship_order(OrderId::new(), None).await.unwrap_err();
        assert!(matches!(err, InventoryError::NotFound { entity: "order", .. }));
    }

    #[tokio::test]
    async fn test_list_orders_for_user() {
        let fx = Fixture::with_stock(10, 0).await;
        let service = OrderFulfillment::new(fx.store.clone());
        let mut first = request(vec![tee_line(1)]);
        let user_id = first.user_id;
        first.customer_notes = Some(" ring twice ".to_string());

        let placed = service.create_order(first).await.unwrap();
        assert_eq!(placed.customer_notes.as_deref(), Some("ring twice"));
        service.create_order(request(vec![tee_line(1)])).await.unwrap();

        let orders = service.list_orders_for_user(user_id).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, placed.id);
    }
}
