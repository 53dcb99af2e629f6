//! Catalog entities owned by the product service.
//!
//! Only the fields the fulfillment core reads are modelled here.

use common::{ProductId, VariantId};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    /// Price used for order lines that name no variant.
    pub base_price: Money,
    pub is_active: bool,
}

impl Product {
    /// Creates an active product.
    pub fn new(slug: impl Into<String>, name: impl Into<String>, base_price: Money) -> Self {
        Self {
            id: ProductId::new(),
            slug: slug.into(),
            name: name.into(),
            base_price,
            is_active: true,
        }
    }

    /// Marks this product inactive.
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// A purchasable SKU of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub price: Money,
    pub is_active: bool,
}

impl ProductVariant {
    /// Creates an active variant of `product`.
    pub fn new(
        product_id: ProductId,
        sku: impl Into<String>,
        name: impl Into<String>,
        price: Money,
    ) -> Self {
        Self {
            id: VariantId::new(),
            product_id,
            sku: sku.into(),
            name: name.into(),
            price,
            is_active: true,
        }
    }

    /// Marks this variant inactive.
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}
