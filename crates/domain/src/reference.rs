//! Lookup references accepted from callers.
//!
//! Callers may name a warehouse, product or variant either by its internal
//! id or by its human identifier (slug or SKU). A free-form string that
//! parses as a UUID is treated as an id; anything else is a slug/SKU.

use common::{ProductId, VariantId, WarehouseId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference to a warehouse by id or slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseRef {
    Id(WarehouseId),
    Slug(String),
}

impl WarehouseRef {
    /// Parses a free-form identifier.
    pub fn parse(identifier: &str) -> Self {
        let identifier = identifier.trim();
        match Uuid::parse_str(identifier) {
            Ok(uuid) => Self::Id(WarehouseId::from_uuid(uuid)),
            Err(_) => Self::Slug(identifier.to_string()),
        }
    }

    /// Returns true if the reference carries no usable identifier.
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Slug(s) if s.trim().is_empty())
    }
}

impl From<WarehouseId> for WarehouseRef {
    fn from(id: WarehouseId) -> Self {
        Self::Id(id)
    }
}

impl std::fmt::Display for WarehouseRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Slug(slug) => write!(f, "{slug}"),
        }
    }
}

/// Reference to a product by id or slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductRef {
    Id(ProductId),
    Slug(String),
}

impl ProductRef {
    /// Parses a free-form identifier.
    pub fn parse(identifier: &str) -> Self {
        let identifier = identifier.trim();
        match Uuid::parse_str(identifier) {
            Ok(uuid) => Self::Id(ProductId::from_uuid(uuid)),
            Err(_) => Self::Slug(identifier.to_string()),
        }
    }

    /// Returns true if the reference carries no usable identifier.
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Slug(s) if s.trim().is_empty())
    }
}

impl From<ProductId> for ProductRef {
    fn from(id: ProductId) -> Self {
        Self::Id(id)
    }
}

impl std::fmt::Display for ProductRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Slug(slug) => write!(f, "{slug}"),
        }
    }
}

/// Reference to a product variant by id or SKU.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantRef {
    Id(VariantId),
    Sku(String),
}

impl VariantRef {
    /// Parses a free-form identifier.
    pub fn parse(identifier: &str) -> Self {
        let identifier = identifier.trim();
        match Uuid::parse_str(identifier) {
            Ok(uuid) => Self::Id(VariantId::from_uuid(uuid)),
            Err(_) => Self::Sku(identifier.to_string()),
        }
    }

    /// Returns true if the reference carries no usable identifier.
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Sku(s) if s.trim().is_empty())
    }
}

impl From<VariantId> for VariantRef {
    fn from(id: VariantId) -> Self {
        Self::Id(id)
    }
}

impl std::fmt::Display for VariantRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Sku(sku) => write!(f, "{sku}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_parses_as_id() {
        let id = WarehouseId::new();
        assert_eq!(WarehouseRef::parse(&id.to_string()), WarehouseRef::Id(id));
    }

    #[test]
    fn test_other_strings_parse_as_slug_or_sku() {
        assert_eq!(
            WarehouseRef::parse(" central "),
            WarehouseRef::Slug("central".to_string())
        );
        assert_eq!(
            ProductRef::parse("phone-x"),
            ProductRef::Slug("phone-x".to_string())
        );
        assert_eq!(
            VariantRef::parse("PX-BLK-128"),
            VariantRef::Sku("PX-BLK-128".to_string())
        );
    }

    #[test]
    fn test_blank_detection() {
        assert!(ProductRef::parse("   ").is_blank());
        assert!(!ProductRef::from(ProductId::new()).is_blank());
        assert!(VariantRef::Sku(String::new()).is_blank());
    }

    #[test]
    fn test_display_shows_identifier() {
        assert_eq!(VariantRef::Sku("SKU-1".into()).to_string(), "SKU-1");
        let id = ProductId::new();
        assert_eq!(ProductRef::Id(id).to_string(), id.to_string());
    }
}
