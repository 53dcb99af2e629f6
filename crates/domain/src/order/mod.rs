//! Orders and order items.

mod shipping;
mod status;

pub use shipping::{PaymentMethod, ShippingInfo, ShippingMethod};
pub use status::{OrderStatus, PaymentStatus};

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId, VariantId, WarehouseId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::money::Money;

/// Human-facing unique order number, e.g. `ORD-20260101120000-1a2b3c4d`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generates a new order number stamped with `now`.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("ORD-{}-{}", now.format("%Y%m%d%H%M%S"), &suffix[..8]))
    }

    /// Wraps an order number read back from storage.
    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A line of an order. Price is a snapshot taken when the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    /// Unit price at order time.
    pub price: Money,
}

impl OrderItem {
    /// Returns `price * quantity`, `None` if it does not fit in [`Money`].
    pub fn line_total(&self) -> Option<Money> {
        self.price.checked_times(self.quantity)
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    /// Warehouse whose stock is reserved for this order.
    pub warehouse_id: WarehouseId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub total_amount: Money,
    pub shipping: ShippingInfo,
    pub customer_notes: Option<String>,
    pub tracking_number: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Sum of the item line totals, `None` on overflow.
    pub fn items_total(&self) -> Option<Money> {
        self.items
            .iter()
            .map(OrderItem::line_total)
            .try_fold(Money::zero(), |total, line| total.checked_add(line?))
    }

    /// Items whose stock was reserved, as `(variant, quantity)` pairs.
    pub fn reserved_lines(&self) -> impl Iterator<Item = (VariantId, u32)> + '_ {
        self.items
            .iter()
            .filter_map(|item| item.variant_id.map(|v| (v, item.quantity)))
    }

    /// Moves the order to cancelled.
    ///
    /// Payment status becomes cancelled unless money already moved.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.status.can_cancel() {
            return Err(DomainError::InvalidStatusTransition {
                current: self.status,
                action: "cancel",
            });
        }
        self.status = OrderStatus::Cancelled;
        if !self.payment_status.is_settled() {
            self.payment_status = PaymentStatus::Cancelled;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Moves the order to shipped.
    pub fn ship(
        &mut self,
        tracking_number: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.status.can_ship() {
            return Err(DomainError::InvalidStatusTransition {
                current: self.status,
                action: "ship",
            });
        }
        self.status = OrderStatus::Shipped;
        self.tracking_number = tracking_number;
        self.shipped_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}
