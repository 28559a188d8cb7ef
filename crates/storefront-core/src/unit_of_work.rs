//! Explicit transaction scopes.
//!
//! A unit of work is a closure handed an open [`Transaction`]. If the closure
//! returns `Ok`, every write it staged is committed together; if it returns
//! `Err`, all of them are rolled back and the error is returned unchanged.

use futures_util::future::BoxFuture;

use crate::error::DomainError;
use crate::store::{Transaction, TransactionalStore};

/// Runs `work` inside a new transaction on `store`.
///
/// # Errors
///
/// Returns the closure's error after rolling back, or
/// `DomainError::Persistence` if the transaction cannot be opened or
/// committed.
pub async fn in_transaction<T, F>(store: &dyn TransactionalStore, work: F) -> Result<T, DomainError>
where
    T: Send,
    F: for<'t> FnOnce(&'t mut dyn Transaction) -> BoxFuture<'t, Result<T, DomainError>> + Send,
{
    let mut tx = store.begin().await?;

    match work(tx.as_mut()).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "rollback failed after aborted unit of work");
            }
            Err(err)
        }
    }
}
