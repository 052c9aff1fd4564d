//! Database transaction utilities
//!
//! Every repository operation accepts an optional transaction through its
//! `_tx` variant; this module provides the helper that owns the
//! begin/commit/rollback lifecycle around those variants.

use std::future::Future;
use std::pin::Pin;

use mediabase_core::AppError;
use sqlx::{PgPool, Postgres, Transaction};

/// Execute a closure within a database transaction, committing on success
/// and rolling back on error.
///
/// Tag reconciliation is the main consumer: `set_tags` issues its unrelate
/// and relate writes as independent units, so a caller that needs the pair
/// to be atomic runs `set_tags_tx` through this helper instead.
///
/// # Example
///
/// ```ignore
/// use mediabase_db::{with_transaction, MediaRepository};
///
/// async fn example(pool: &sqlx::PgPool, repo: MediaRepository) -> Result<(), mediabase_core::AppError> {
///     with_transaction(pool, |tx| {
///         Box::pin(async move {
///             repo.set_tags_tx(tx, 7, vec![]).await?;
///             Ok(())
///         })
///     })
///     .await
/// }
/// ```
pub async fn with_transaction<F, R>(pool: &PgPool, f: F) -> Result<R, AppError>
where
    F: for<'a> FnOnce(
        &'a mut Transaction<'_, Postgres>,
    ) -> Pin<Box<dyn Future<Output = Result<R, AppError>> + Send + 'a>>,
{
    let mut tx = pool.begin().await?;

    match f(&mut tx).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            tx.rollback().await.ok(); // Ignore rollback errors
            Err(err)
        }
    }
}
