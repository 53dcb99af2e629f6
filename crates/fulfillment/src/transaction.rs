use inventory_store::InventoryTx;

use crate::error::Result;

/// Commits on success and rolls back on failure.
///
/// A failed rollback is logged and the original error is returned; the
/// transaction is discarded either way.
pub(crate) async fn finish<T, R>(tx: T, result: Result<R>) -> Result<R>
where
    T: InventoryTx,
{
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "transaction rollback failed");
            }
            Err(e)
        }
    }
}
