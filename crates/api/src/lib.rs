//! HTTP API server for inventory reservation and order fulfillment.
//!
//! Provides REST endpoints for order placement, order status changes, the
//! stock ledger and inter-warehouse transfers, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod demo;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use fulfillment::{MainWarehouseSelector, OrderFulfillment, StockLedger, TransferCoordinator};
use inventory_store::InventoryStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: InventoryStore> {
    pub orders: OrderFulfillment<S>,
    pub ledger: StockLedger<S>,
    pub transfers: TransferCoordinator<S>,
}

impl<S: InventoryStore + Clone> AppState<S> {
    /// Builds the services over one store.
    pub fn new(store: S, main_warehouse: MainWarehouseSelector) -> Self {
        Self {
            orders: OrderFulfillment::new(store.clone()).with_main_warehouse(main_warehouse),
            ledger: StockLedger::new(store.clone()),
            transfers: TransferCoordinator::new(store),
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: InventoryStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/orders",
            post(routes::orders::create::<S>).get(routes::orders::list::<S>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route("/orders/{id}/ship", post(routes::orders::ship::<S>))
        .route(
            "/stock",
            post(routes::stock::create::<S>).get(routes::stock::list::<S>),
        )
        .route("/stock/transfer", post(routes::stock::transfer::<S>))
        .route(
            "/stock/{id}",
            get(routes::stock::get::<S>)
                .put(routes::stock::update::<S>)
                .delete(routes::stock::delete::<S>),
        )
        .route(
            "/warehouses/{warehouse}/stock",
            get(routes::stock::by_warehouse::<S>),
        )
        .route("/variants/{variant}/stock", get(routes::stock::by_variant::<S>))
        .route(
            "/variants/{variant}/availability",
            get(routes::stock::availability::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
