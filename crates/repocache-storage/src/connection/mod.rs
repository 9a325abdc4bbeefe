//! Connection setup and error mapping.

pub mod writer;

use std::path::Path;
use std::time::Duration;

use repocache_core::errors::StorageError;
use rusqlite::{Connection, ErrorCode};

/// Open a connection configured for multi-process use: WAL journal,
/// `NORMAL` sync, and a bounded busy wait.
pub fn open_connection(path: &Path, busy_timeout: Duration) -> Result<Connection, StorageError> {
    let conn = Connection::open(path).map_err(sqlite_error)?;
    conn.busy_timeout(busy_timeout).map_err(sqlite_error)?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(sqlite_error)?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .map_err(sqlite_error)?;
    Ok(conn)
}

/// Map a rusqlite error, separating lock contention from other failures.
pub fn sqlite_error(e: rusqlite::Error) -> StorageError {
    match e.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => StorageError::Busy {
            message: e.to_string(),
        },
        _ => StorageError::Sqlite {
            message: e.to_string(),
        },
    }
}
