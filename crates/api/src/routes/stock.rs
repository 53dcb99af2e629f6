//! Stock ledger, availability and transfer endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::StockId;
use domain::{VariantRef, WarehouseRef, WarehouseStock};
use fulfillment::TransferOutcome;
use inventory_store::InventoryStore;
use serde::{Deserialize, Serialize};

use super::parse_uuid;
use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateStockBody {
    pub warehouse: String,
    pub variant: String,
    pub stock: i32,
    #[serde(default)]
    pub reserved_stock: i32,
}

#[derive(Deserialize)]
pub struct UpdateStockBody {
    pub stock: i32,
    pub reserved_stock: i32,
}

#[derive(Deserialize)]
pub struct TransferBody {
    pub from: String,
    pub to: String,
    pub variant: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub quantity: Option<i64>,
    pub warehouse: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub variant: String,
    pub warehouse: Option<String>,
    pub available: i64,
    pub requested: i64,
    pub sufficient: bool,
}

// -- Handlers --

/// GET /stock
#[tracing::instrument(skip(state))]
pub async fn list<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<WarehouseStock>>, ApiError> {
    Ok(Json(state.ledger.list().await?))
}

/// POST /stock: open a ledger row for a pair that has none.
#[tracing::instrument(skip(state, body))]
pub async fn create<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(body): Json<CreateStockBody>,
) -> Result<(StatusCode, Json<WarehouseStock>), ApiError> {
    let row = state
        .ledger
        .create(
            &WarehouseRef::parse(&body.warehouse),
            &VariantRef::parse(&body.variant),
            body.stock,
            body.reserved_stock,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /stock/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<WarehouseStock>, ApiError> {
    Ok(Json(state.ledger.get(parse_stock_id(&id)?).await?))
}

/// PUT /stock/{id}: overwrite both levels of a row.
#[tracing::instrument(skip(state, body))]
pub async fn update<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStockBody>,
) -> Result<Json<WarehouseStock>, ApiError> {
    let row = state
        .ledger
        .update_stock(parse_stock_id(&id)?, body.stock, body.reserved_stock)
        .await?;
    Ok(Json(row))
}

/// DELETE /stock/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.ledger.delete(parse_stock_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /stock/transfer: move free units between two warehouses.
#[tracing::instrument(skip(state, body))]
pub async fn transfer<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(body): Json<TransferBody>,
) -> Result<Json<TransferOutcome>, ApiError> {
    let outcome = state
        .transfers
        .transfer_stock(
            &WarehouseRef::parse(&body.from),
            &WarehouseRef::parse(&body.to),
            &VariantRef::parse(&body.variant),
            body.quantity,
        )
        .await?;
    Ok(Json(outcome))
}

/// GET /warehouses/{warehouse}/stock
#[tracing::instrument(skip(state))]
pub async fn by_warehouse<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(warehouse): Path<String>,
) -> Result<Json<Vec<WarehouseStock>>, ApiError> {
    let rows = state
        .ledger
        .get_by_warehouse(&WarehouseRef::parse(&warehouse))
        .await?;
    Ok(Json(rows))
}

/// GET /variants/{variant}/stock
#[tracing::instrument(skip(state))]
pub async fn by_variant<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(variant): Path<String>,
) -> Result<Json<Vec<WarehouseStock>>, ApiError> {
    let rows = state
        .ledger
        .get_by_variant(&VariantRef::parse(&variant))
        .await?;
    Ok(Json(rows))
}

/// GET /variants/{variant}/availability?quantity=&warehouse=
///
/// Without `warehouse` the free units of every warehouse are summed.
/// `quantity` defaults to one unit.
#[tracing::instrument(skip(state))]
pub async fn availability<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(variant): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let reference = VariantRef::parse(&variant);
    let requested = query.quantity.unwrap_or(1);

    let (available, sufficient) = match query.warehouse.as_deref() {
        Some(warehouse) => {
            let warehouse = WarehouseRef::parse(warehouse);
            let sufficient = state
                .ledger
                .check_availability_in_warehouse(&warehouse, &reference, requested)
                .await?;
            let available = state
                .ledger
                .available_in_warehouse(&warehouse, &reference)
                .await?;
            (available, sufficient)
        }
        None => {
            let sufficient = state
                .ledger
                .check_availability(&reference, requested)
                .await?;
            (state.ledger.available(&reference).await?, sufficient)
        }
    };

    Ok(Json(AvailabilityResponse {
        variant,
        warehouse: query.warehouse,
        available,
        requested,
        sufficient,
    }))
}

fn parse_stock_id(id: &str) -> Result<StockId, ApiError> {
    parse_uuid("stock", id).map(StockId::from_uuid)
}
