//! Table creation and in-place migration.
//!
//! Table names are interpolated into DDL, so every name passes
//! [`validate_identifier`] before reaching this module.

use repocache_core::errors::StorageError;
use rusqlite::Connection;

use crate::connection::sqlite_error;
use crate::connection::writer::with_immediate_transaction;

/// Accept only non-empty `[A-Za-z0-9_]+` identifiers.
pub fn validate_identifier(name: &str) -> Result<(), StorageError> {
    let ok = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}

/// Create the table and indexes if missing, and upgrade tables written
/// before `last_accessed_at` existed.
///
/// Runs under `BEGIN IMMEDIATE`, so concurrent openers of a legacy file
/// serialise on the write lock and only the first one alters the table.
pub fn ensure_schema(conn: &mut Connection, table: &str) -> Result<(), StorageError> {
    validate_identifier(table)?;

    with_immediate_transaction(conn, |tx| {
        tx.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                 scope TEXT NOT NULL,
                 key TEXT NOT NULL,
                 payload TEXT NOT NULL,
                 metadata TEXT NOT NULL,
                 updated_at INTEGER NOT NULL,
                 last_accessed_at INTEGER,
                 PRIMARY KEY (scope, key)
             );"
        ))
        .map_err(sqlite_error)?;

        if !has_column(tx, table, "last_accessed_at")? {
            tracing::info!(table, "migrating cache table: adding last_accessed_at");
            tx.execute_batch(&format!(
                "ALTER TABLE {table} ADD COLUMN last_accessed_at INTEGER;
                 UPDATE {table} SET last_accessed_at = updated_at WHERE last_accessed_at IS NULL;"
            ))
            .map_err(sqlite_error)?;
        }

        tx.execute_batch(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_scope_updated ON {table} (scope, updated_at);
             CREATE INDEX IF NOT EXISTS idx_{table}_scope_accessed ON {table} (scope, last_accessed_at);"
        ))
        .map_err(sqlite_error)?;

        Ok(())
    })
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool, StorageError> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .map_err(sqlite_error)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(sqlite_error)?;
    for name in names {
        if name.map_err(sqlite_error)? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_charset() {
        assert!(validate_identifier("metadata_cache").is_ok());
        assert!(validate_identifier("Cache2").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("cache; DROP TABLE x").is_err());
        assert!(validate_identifier("cache-name").is_err());
        assert!(validate_identifier("caché").is_err());
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        ensure_schema(&mut conn, "entries").unwrap();
        ensure_schema(&mut conn, "entries").unwrap();
        assert!(has_column(&conn, "entries", "last_accessed_at").unwrap());
    }

    #[test]
    fn test_legacy_table_gets_backfilled_column() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE legacy (
                 scope TEXT NOT NULL, key TEXT NOT NULL, payload TEXT NOT NULL,
                 metadata TEXT NOT NULL, updated_at INTEGER NOT NULL,
                 PRIMARY KEY (scope, key));
             INSERT INTO legacy VALUES ('s', 'k', '{}', '{}', 42);",
        )
        .unwrap();

        ensure_schema(&mut conn, "legacy").unwrap();

        let accessed: i64 = conn
            .query_row("SELECT last_accessed_at FROM legacy WHERE key = 'k'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(accessed, 42);
    }
}
