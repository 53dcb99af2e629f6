//! Stock ledger row and the per-unit reservation state machine.

use chrono::{DateTime, Utc};
use common::{StockId, VariantId, WarehouseId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Stock of one variant at one warehouse.
///
/// At most one row exists per warehouse/variant pair, and
/// `0 <= reserved_stock <= stock` holds for every persisted row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseStock {
    pub id: StockId,
    pub warehouse_id: WarehouseId,
    pub variant_id: VariantId,
    /// Units physically present.
    pub stock: i32,
    /// Units committed to in-flight orders.
    pub reserved_stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WarehouseStock {
    /// Creates a new row after checking the stock levels.
    pub fn new(
        warehouse_id: WarehouseId,
        variant_id: VariantId,
        stock: i32,
        reserved_stock: i32,
    ) -> Result<Self, DomainError> {
        Self::validate_levels(stock, reserved_stock)?;
        let now = Utc::now();
        Ok(Self {
            id: StockId::new(),
            warehouse_id,
            variant_id,
            stock,
            reserved_stock,
            created_at: now,
            updated_at: now,
        })
    }

    /// Creates the empty row a transfer materializes at a new destination.
    pub fn empty(warehouse_id: WarehouseId, variant_id: VariantId) -> Self {
        let now = Utc::now();
        Self {
            id: StockId::new(),
            warehouse_id,
            variant_id,
            stock: 0,
            reserved_stock: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Units free to sell against: `stock - reserved_stock`.
    pub fn available(&self) -> i32 {
        self.stock - self.reserved_stock
    }

    /// Checks `0 <= reserved <= stock`.
    pub fn validate_levels(stock: i32, reserved: i32) -> Result<(), DomainError> {
        if stock < 0 || reserved < 0 || reserved > stock {
            return Err(DomainError::InvalidStockLevels {
                stock: stock.into(),
                reserved: reserved.into(),
            });
        }
        Ok(())
    }
}

/// A positive unit count that fits the ledger's integer columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// Largest quantity a single operation may move.
    pub const MAX: u32 = i32::MAX as u32;

    /// Creates a quantity, rejecting zero, negatives and overflow.
    pub fn new(quantity: i64) -> Result<Self, DomainError> {
        if quantity < 1 || quantity > Self::MAX as i64 {
            return Err(DomainError::InvalidQuantity {
                quantity,
                max: Self::MAX as i64,
            });
        }
        Ok(Self(quantity as u32))
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    /// The quantity as a ledger column value.
    pub fn as_i32(&self) -> i32 {
        self.0 as i32
    }
}

impl TryFrom<i64> for Quantity {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self {
        q.0
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The state of a single unit of stock.
///
/// State transitions:
/// ```text
/// Free ──reserve──► Reserved ──consume──► Consumed
///   ▲                  │
///   └─────release──────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UnitState {
    /// Counted in `stock`, not in `reserved_stock`.
    #[default]
    Free,

    /// Counted in both `stock` and `reserved_stock`.
    Reserved,

    /// Left the pool (terminal state).
    Consumed,
}

impl UnitState {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UnitState::Consumed)
    }

    /// Applies an operation to a unit in this state.
    pub fn apply(self, operation: StockOperation) -> Result<UnitState, DomainError> {
        if self != operation.source_state() {
            return Err(DomainError::InvalidUnitTransition {
                state: self,
                operation: operation.as_str(),
            });
        }
        Ok(operation.target_state())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitState::Free => "free",
            UnitState::Reserved => "reserved",
            UnitState::Consumed => "consumed",
        }
    }
}

impl std::fmt::Display for UnitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A conditional ledger update moving units between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockOperation {
    /// Free → Reserved, guarded by `stock - reserved_stock >= qty`.
    Reserve,
    /// Reserved → Free, guarded by `reserved_stock >= qty`.
    Release,
    /// Reserved → Consumed, guarded by `reserved_stock >= qty`.
    Consume,
}

impl StockOperation {
    pub fn source_state(&self) -> UnitState {
        match self {
            StockOperation::Reserve => UnitState::Free,
            StockOperation::Release | StockOperation::Consume => UnitState::Reserved,
        }
    }

    pub fn target_state(&self) -> UnitState {
        match self {
            StockOperation::Reserve => UnitState::Reserved,
            StockOperation::Release => UnitState::Free,
            StockOperation::Consume => UnitState::Consumed,
        }
    }

    /// Returns true if `row` holds enough units in the source state.
    pub fn guard(&self, row: &WarehouseStock, quantity: Quantity) -> bool {
        match self {
            StockOperation::Reserve => row.available() >= quantity.as_i32(),
            StockOperation::Release | StockOperation::Consume => {
                row.reserved_stock >= quantity.as_i32()
            }
        }
    }

    /// Applies the row-level effect. Callers check [`StockOperation::guard`] first.
    pub fn apply_to(&self, row: &mut WarehouseStock, quantity: Quantity) {
        let qty = quantity.as_i32();
        match self {
            StockOperation::Reserve => row.reserved_stock += qty,
            StockOperation::Release => row.reserved_stock -= qty,
            StockOperation::Consume => {
                row.stock -= qty;
                row.reserved_stock -= qty;
            }
        }
        row.updated_at = Utc::now();
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockOperation::Reserve => "reserve",
            StockOperation::Release => "release",
            StockOperation::Consume => "consume",
        }
    }
}

impl std::fmt::Display for StockOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
