//! Write transactions — BEGIN IMMEDIATE so the write lock is taken up front
//! and contention surfaces as a bounded busy wait rather than a mid-transaction
//! upgrade failure.

use repocache_core::errors::StorageError;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use super::sqlite_error;

/// Run `f` inside a BEGIN IMMEDIATE transaction and commit on success.
/// On error the transaction is rolled back when dropped.
pub fn with_immediate_transaction<F, T>(conn: &mut Connection, f: F) -> Result<T, StorageError>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, StorageError>,
{
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(sqlite_error)?;

    let result = f(&tx)?;

    tx.commit().map_err(sqlite_error)?;
    Ok(result)
}
