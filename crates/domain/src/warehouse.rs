//! Warehouse entity.

use chrono::{DateTime, Utc};
use common::WarehouseId;
use serde::{Deserialize, Serialize};

/// A physical fulfillment location holding stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub slug: String,
    pub name: String,
    pub city: String,
    pub is_active: bool,
    /// Marks the default fulfillment source when no explicit one is configured.
    pub is_main: bool,
    pub created_at: DateTime<Utc>,
}

impl Warehouse {
    /// Creates an active, non-main warehouse.
    pub fn new(slug: impl Into<String>, name: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            id: WarehouseId::new(),
            slug: slug.into(),
            name: name.into(),
            city: city.into(),
            is_active: true,
            is_main: false,
            created_at: Utc::now(),
        }
    }

    /// Flags this warehouse as the main one.
    pub fn main(mut self) -> Self {
        self.is_main = true;
        self
    }

    /// Marks this warehouse inactive.
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}
