//! Product and variant lookups for order lines.

use domain::{Product, ProductRef, ProductVariant, VariantRef};
use inventory_store::InventoryTx;

use crate::error::{InventoryError, Result};

/// Resolves an active product by id or slug.
pub async fn resolve_product<T: InventoryTx>(tx: &mut T, reference: &ProductRef) -> Result<Product> {
    if reference.is_blank() {
        return Err(InventoryError::Validation(
            "product identifier is required".to_string(),
        ));
    }
    let product = tx
        .find_product(reference)
        .await?
        .ok_or_else(|| InventoryError::not_found("product", reference))?;
    if !product.is_active {
        return Err(InventoryError::inactive("product", reference));
    }
    Ok(product)
}

/// Resolves a variant by id or SKU, active or not.
pub async fn find_variant<T: InventoryTx>(
    tx: &mut T,
    reference: &VariantRef,
) -> Result<ProductVariant> {
    if reference.is_blank() {
        return Err(InventoryError::Validation(
            "variant identifier is required".to_string(),
        ));
    }
    tx.find_variant(reference)
        .await?
        .ok_or_else(|| InventoryError::not_found("variant", reference))
}

/// Resolves an active variant by id or SKU.
pub async fn resolve_variant<T: InventoryTx>(
    tx: &mut T,
    reference: &VariantRef,
) -> Result<ProductVariant> {
    let variant = find_variant(tx, reference).await?;
    if !variant.is_active {
        return Err(InventoryError::inactive("variant", reference));
    }
    Ok(variant)
}

/// Resolves the product of an order line and, if named, its variant.
///
/// The variant has to belong to the product.
pub async fn resolve_line<T: InventoryTx>(
    tx: &mut T,
    product: &ProductRef,
    variant: Option<&VariantRef>,
) -> Result<(Product, Option<ProductVariant>)> {
    let product = resolve_product(tx, product).await?;
    let Some(reference) = variant else {
        return Ok((product, None));
    };

    let variant = resolve_variant(tx, reference).await?;
    if variant.product_id != product.id {
        return Err(InventoryError::VariantMismatch {
            product: product.id,
            variant: variant.id,
        });
    }
    Ok((product, Some(variant)))
}
