//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fulfillment::InventoryError;
use inventory_store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// The caller did not identify themselves.
    Unauthorized(String),
    /// Inventory or order operation error.
    Inventory(InventoryError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Inventory(err) => inventory_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn inventory_error_to_response(err: InventoryError) -> (StatusCode, String) {
    let status = match &err {
        InventoryError::NotFound { .. } => StatusCode::NOT_FOUND,
        InventoryError::Inactive { .. }
        | InventoryError::VariantMismatch { .. }
        | InventoryError::Validation(_) => StatusCode::BAD_REQUEST,
        InventoryError::InsufficientStock { .. }
        | InventoryError::InsufficientReserved { .. }
        | InventoryError::InvalidStatusTransition { .. }
        | InventoryError::Store(StoreError::DuplicateStockRow { .. }) => StatusCode::CONFLICT,
        e if e.is_configuration_error() => {
            tracing::error!(error = %e, "fulfillment is misconfigured");
            StatusCode::SERVICE_UNAVAILABLE
        }
        e => {
            tracing::error!(error = %e, "internal server error");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            );
        }
    };
    (status, err.to_string())
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        ApiError::Inventory(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{VariantId, WarehouseId};
    use domain::DomainError;

    fn status_of(err: InventoryError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(InventoryError::NotFound {
                entity: "variant",
                identifier: "NOPE".to_string(),
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(InventoryError::Validation("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(InventoryError::InsufficientStock {
                warehouse: WarehouseId::new(),
                variant: VariantId::new(),
                requested: 3,
                available: 1,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(InventoryError::Store(StoreError::DuplicateStockRow {
                warehouse_id: WarehouseId::new(),
                variant_id: VariantId::new(),
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(InventoryError::AmbiguousMainWarehouse { count: 2 }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(InventoryError::Store(StoreError::InvalidRecord(
                DomainError::UnknownValue {
                    kind: "order status",
                    value: "lost".to_string(),
                }
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
