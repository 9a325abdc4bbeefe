//! Cache record queries. `table` must already be validated.

use repocache_core::errors::StorageError;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::connection::sqlite_error;

/// A stored cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    pub scope: String,
    pub key: String,
    pub payload: String,
    /// JSON-encoded metadata mapping.
    pub metadata: String,
    pub updated_at: i64,
    pub last_accessed_at: Option<i64>,
}

impl CacheRecord {
    /// Parse the metadata column. Returns `None` when the stored text is not JSON.
    pub fn metadata_value(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.metadata).ok()
    }

    /// `last_accessed_at`, falling back to `updated_at` for rows that
    /// predate access tracking.
    pub fn effective_access(&self) -> i64 {
        self.last_accessed_at.unwrap_or(self.updated_at)
    }
}

/// Summary counts for one cache table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub records: usize,
    pub scopes: usize,
    pub oldest_access: Option<i64>,
    pub newest_access: Option<i64>,
}

const RECORD_COLUMNS: &str = "scope, key, payload, metadata, updated_at, last_accessed_at";

fn map_record(row: &Row<'_>) -> rusqlite::Result<CacheRecord> {
    Ok(CacheRecord {
        scope: row.get(0)?,
        key: row.get(1)?,
        payload: row.get(2)?,
        metadata: row.get(3)?,
        updated_at: row.get(4)?,
        last_accessed_at: row.get(5)?,
    })
}

/// Insert or replace the record for `(scope, key)`, stamping both timestamps with `now`.
pub fn upsert_record(
    conn: &Connection,
    table: &str,
    scope: &str,
    key: &str,
    payload: &str,
    metadata: &str,
    now: i64,
) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "INSERT INTO {table} ({RECORD_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT (scope, key) DO UPDATE SET
                 payload = excluded.payload,
                 metadata = excluded.metadata,
                 updated_at = excluded.updated_at,
                 last_accessed_at = excluded.last_accessed_at"
        ))
        .map_err(sqlite_error)?;
    stmt.execute(params![scope, key, payload, metadata, now])
        .map_err(sqlite_error)?;
    Ok(())
}

/// Delete every record last accessed before `cutoff`.
pub fn purge_before(conn: &Connection, table: &str, cutoff: i64) -> Result<usize, StorageError> {
    conn.execute(
        &format!("DELETE FROM {table} WHERE COALESCE(last_accessed_at, updated_at) < ?1"),
        params![cutoff],
    )
    .map_err(sqlite_error)
}

/// Most recently accessed record in `scope`, ties broken by most recently updated.
pub fn latest_in_scope(
    conn: &Connection,
    table: &str,
    scope: &str,
) -> Result<Option<CacheRecord>, StorageError> {
    conn.query_row(
        &format!(
            "SELECT {RECORD_COLUMNS} FROM {table}
             WHERE scope = ?1
             ORDER BY COALESCE(last_accessed_at, updated_at) DESC, updated_at DESC
             LIMIT 1"
        ),
        params![scope],
        map_record,
    )
    .optional()
    .map_err(sqlite_error)
}

pub fn get_record(
    conn: &Connection,
    table: &str,
    scope: &str,
    key: &str,
) -> Result<Option<CacheRecord>, StorageError> {
    conn.query_row(
        &format!("SELECT {RECORD_COLUMNS} FROM {table} WHERE scope = ?1 AND key = ?2"),
        params![scope, key],
        map_record,
    )
    .optional()
    .map_err(sqlite_error)
}

/// Set `last_accessed_at = now`. Returns whether a row was touched.
pub fn touch_record(
    conn: &Connection,
    table: &str,
    scope: &str,
    key: &str,
    now: i64,
) -> Result<bool, StorageError> {
    let changed = conn
        .execute(
            &format!("UPDATE {table} SET last_accessed_at = ?3 WHERE scope = ?1 AND key = ?2"),
            params![scope, key, now],
        )
        .map_err(sqlite_error)?;
    Ok(changed > 0)
}

pub fn delete_record(
    conn: &Connection,
    table: &str,
    scope: &str,
    key: &str,
) -> Result<bool, StorageError> {
    let changed = conn
        .execute(
            &format!("DELETE FROM {table} WHERE scope = ?1 AND key = ?2"),
            params![scope, key],
        )
        .map_err(sqlite_error)?;
    Ok(changed > 0)
}

pub fn delete_scope(conn: &Connection, table: &str, scope: &str) -> Result<usize, StorageError> {
    conn.execute(&format!("DELETE FROM {table} WHERE scope = ?1"), params![scope])
        .map_err(sqlite_error)
}

pub fn count_records(conn: &Connection, table: &str) -> Result<usize, StorageError> {
    let n: i64 = conn
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .map_err(sqlite_error)?;
    Ok(n as usize)
}

pub fn list_scopes(conn: &Connection, table: &str) -> Result<Vec<String>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!("SELECT DISTINCT scope FROM {table} ORDER BY scope"))
        .map_err(sqlite_error)?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(sqlite_error)?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row.map_err(sqlite_error)?);
    }
    Ok(result)
}

pub fn table_stats(conn: &Connection, table: &str) -> Result<StoreStats, StorageError> {
    conn.query_row(
        &format!(
            "SELECT COUNT(*), COUNT(DISTINCT scope),
                    MIN(COALESCE(last_accessed_at, updated_at)),
                    MAX(COALESCE(last_accessed_at, updated_at))
             FROM {table}"
        ),
        [],
        |row| {
            Ok(StoreStats {
                records: row.get::<_, i64>(0)? as usize,
                scopes: row.get::<_, i64>(1)? as usize,
                oldest_access: row.get(2)?,
                newest_access: row.get(3)?,
            })
        },
    )
    .map_err(sqlite_error)
}
