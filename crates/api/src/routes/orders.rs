//! Order placement and status endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{
    Order, OrderItem, PaymentMethod, ProductRef, ShippingInfo, ShippingMethod, VariantRef,
};
use fulfillment::{CreateOrderRequest, OrderLineRequest};
use inventory_store::InventoryStore;
use serde::{Deserialize, Serialize};

use super::{parse_uuid, user_id};
use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderBody {
    pub items: Vec<OrderItemBody>,
    #[serde(default)]
    pub shipping_method: ShippingMethod,
    pub shipping_address: Option<String>,
    pub pickup_point: Option<String>,
    pub payment_method: PaymentMethod,
    pub customer_notes: Option<String>,
}

/// One line; `product` and `variant` accept an id, a slug or a SKU.
/// A blank `variant` is the same as leaving it out.
#[derive(Deserialize)]
pub struct OrderItemBody {
    pub product: String,
    pub variant: Option<String>,
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct ShipOrderBody {
    pub tracking_number: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub order_number: String,
    pub user_id: String,
    pub warehouse_id: String,
    pub status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub total_amount_cents: i64,
    pub shipping_method: String,
    pub shipping_address: Option<String>,
    pub pickup_point: Option<String>,
    pub customer_notes: Option<String>,
    pub tracking_number: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub quantity: u32,
    pub price_cents: i64,
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id.to_string(),
            variant_id: item.variant_id.map(|id| id.to_string()),
            quantity: item.quantity,
            price_cents: item.price.cents(),
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_string(),
            order_number: order.order_number.to_string(),
            user_id: order.user_id.to_string(),
            warehouse_id: order.warehouse_id.to_string(),
            status: order.status.to_string(),
            payment_status: order.payment_status.to_string(),
            payment_method: order.payment_method.as_str().to_string(),
            total_amount_cents: order.total_amount.cents(),
            shipping_method: order.shipping.method.as_str().to_string(),
            items: order.items.iter().map(OrderItemResponse::from).collect(),
            shipping_address: order.shipping.address,
            pickup_point: order.shipping.pickup_point,
            customer_notes: order.customer_notes,
            tracking_number: order.tracking_number,
            shipped_at: order.shipped_at,
            created_at: order.created_at,
        }
    }
}

// -- Handlers --

/// POST /orders: place an order for the caller against the main warehouse.
#[tracing::instrument(skip(state, headers, body))]
pub async fn create<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(body): Json<CreateOrderBody>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let request = CreateOrderRequest {
        user_id: user_id(&headers)?,
        items: body
            .items
            .iter()
            .map(|item| {
                OrderLineRequest::new(
                    ProductRef::parse(&item.product),
                    item.variant
                        .as_deref()
                        .map(str::trim)
                        .filter(|variant| !variant.is_empty())
                        .map(VariantRef::parse),
                    item.quantity,
                )
            })
            .collect(),
        shipping: ShippingInfo {
            method: body.shipping_method,
            address: body.shipping_address,
            pickup_point: body.pickup_point,
        },
        payment_method: body.payment_method,
        customer_notes: body.customer_notes,
    };

    let order = state.orders.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders: the caller's orders, newest first.
#[tracing::instrument(skip(state, headers))]
pub async fn list<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state
        .orders
        .list_orders_for_user(user_id(&headers)?)
        .await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.orders.get_order(parse_order_id(&id)?).await?;
    Ok(Json(order.into()))
}

/// POST /orders/{id}/cancel: cancel and release the order's reservations.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.orders.cancel_order(parse_order_id(&id)?).await?;
    Ok(Json(order.into()))
}

/// POST /orders/{id}/ship: ship and consume the order's reservations.
#[tracing::instrument(skip(state, body))]
pub async fn ship<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    body: Option<Json<ShipOrderBody>>,
) -> Result<Json<OrderResponse>, ApiError> {
    let tracking_number = body.and_then(|Json(body)| body.tracking_number);
    let order = state
        .orders
        .ship_order(parse_order_id(&id)?, tracking_number)
        .await?;
    Ok(Json(order.into()))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    parse_uuid("order", id).map(OrderId::from_uuid)
}
