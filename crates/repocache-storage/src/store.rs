//! `CacheStore` — a scoped, TTL-bounded table of opaque cache entries.
//!
//! Every operation opens its own connection, runs one transaction and
//! drops the connection, so no lock outlives a call. Expired rows are only
//! removed by the purge that runs ahead of a write, or ahead of a read that
//! names a TTL.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use repocache_core::clock::{Clock, SystemClock};
use repocache_core::errors::StorageError;
use rusqlite::Connection;

use crate::connection::open_connection;
use crate::connection::writer::with_immediate_transaction;
use crate::migrations::{ensure_schema, validate_identifier};
use crate::queries::records::{self, CacheRecord, StoreStats};

/// Construction options for a [`CacheStore`].
#[derive(Clone)]
pub struct StoreOptions {
    /// TTL applied by the purge that precedes each `upsert`.
    pub ttl: Option<Duration>,
    pub busy_timeout: Duration,
    pub clock: Arc<dyn Clock>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            ttl: None,
            busy_timeout: Duration::from_secs(5),
            clock: Arc::new(SystemClock),
        }
    }
}

impl std::fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreOptions")
            .field("ttl", &self.ttl)
            .field("busy_timeout", &self.busy_timeout)
            .finish_non_exhaustive()
    }
}

/// One cache table inside one SQLite file.
pub struct CacheStore {
    db_path: PathBuf,
    table: String,
    options: StoreOptions,
}

impl CacheStore {
    /// Open (creating if needed) `table` in the database at `db_path`.
    ///
    /// Fails with [`StorageError::InvalidIdentifier`] before touching the
    /// filesystem if `table` is not `[A-Za-z0-9_]+`.
    pub fn open(
        db_path: impl Into<PathBuf>,
        table: &str,
        options: StoreOptions,
    ) -> Result<Self, StorageError> {
        validate_identifier(table)?;
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::Io {
                    message: format!("failed to create {}: {e}", parent.display()),
                })?;
            }
        }

        let store = Self {
            db_path,
            table: table.to_string(),
            options,
        };
        let mut conn = store.connect()?;
        ensure_schema(&mut conn, &store.table)?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.options.ttl
    }

    fn connect(&self) -> Result<Connection, StorageError> {
        open_connection(&self.db_path, self.options.busy_timeout)
    }

    fn now(&self) -> i64 {
        self.options.clock.now()
    }

    fn cutoff(&self, ttl: Duration) -> i64 {
        let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        self.now().saturating_sub(secs)
    }

    /// Insert or replace the record for `(scope, key)`.
    ///
    /// Expired rows in this table are purged first when a TTL is configured.
    pub fn upsert(
        &self,
        scope: &str,
        key: &str,
        payload: &str,
        metadata: &serde_json::Value,
    ) -> Result<(), StorageError> {
        let metadata = serde_json::to_string(metadata).map_err(|e| StorageError::Serialization {
            message: e.to_string(),
        })?;
        let now = self.now();
        let cutoff = self.options.ttl.map(|ttl| self.cutoff(ttl));
        let table = self.table.as_str();

        let mut conn = self.connect()?;
        let purged = with_immediate_transaction(&mut conn, |tx| {
            let purged = match cutoff {
                Some(cutoff) => records::purge_before(tx, table, cutoff)?,
                None => 0,
            };
            records::upsert_record(tx, table, scope, key, payload, &metadata, now)?;
            Ok(purged)
        })?;

        if purged > 0 {
            tracing::debug!(table, purged, "purged expired cache records");
        }
        Ok(())
    }

    /// The most recently accessed record for `scope`, after purging rows
    /// older than `ttl` when one is given.
    pub fn load_latest(
        &self,
        scope: &str,
        ttl: Option<Duration>,
    ) -> Result<Option<CacheRecord>, StorageError> {
        let table = self.table.as_str();
        let mut conn = self.connect()?;

        match ttl {
            Some(ttl) => {
                let cutoff = self.cutoff(ttl);
                let (purged, record) = with_immediate_transaction(&mut conn, |tx| {
                    let purged = records::purge_before(tx, table, cutoff)?;
                    Ok((purged, records::latest_in_scope(tx, table, scope)?))
                })?;
                if purged > 0 {
                    tracing::debug!(table, purged, "purged expired cache records");
                }
                Ok(record)
            }
            None => records::latest_in_scope(&conn, table, scope),
        }
    }

    /// Refresh `last_accessed_at` without touching the payload.
    /// Returns `false` if no such record exists.
    pub fn touch(&self, scope: &str, key: &str) -> Result<bool, StorageError> {
        let conn = self.connect()?;
        records::touch_record(&conn, &self.table, scope, key, self.now())
    }

    /// Exact lookup. Does not purge and does not touch.
    pub fn get(&self, scope: &str, key: &str) -> Result<Option<CacheRecord>, StorageError> {
        let conn = self.connect()?;
        records::get_record(&conn, &self.table, scope, key)
    }

    /// Delete every record whose last access is older than `ttl`.
    pub fn purge_expired(&self, ttl: Duration) -> Result<usize, StorageError> {
        let cutoff = self.cutoff(ttl);
        let table = self.table.as_str();
        let mut conn = self.connect()?;
        with_immediate_transaction(&mut conn, |tx| records::purge_before(tx, table, cutoff))
    }

    pub fn delete(&self, scope: &str, key: &str) -> Result<bool, StorageError> {
        let conn = self.connect()?;
        records::delete_record(&conn, &self.table, scope, key)
    }

    pub fn delete_scope(&self, scope: &str) -> Result<usize, StorageError> {
        let conn = self.connect()?;
        records::delete_scope(&conn, &self.table, scope)
    }

    pub fn count(&self) -> Result<usize, StorageError> {
        let conn = self.connect()?;
        records::count_records(&conn, &self.table)
    }

    pub fn scopes(&self) -> Result<Vec<String>, StorageError> {
        let conn = self.connect()?;
        records::list_scopes(&conn, &self.table)
    }

    pub fn stats(&self) -> Result<StoreStats, StorageError> {
        let conn = self.connect()?;
        records::table_stats(&conn, &self.table)
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("db_path", &self.db_path)
            .field("table", &self.table)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repocache_core::clock::ManualClock;
    use serde_json::json;

    fn store_with_clock(dir: &Path, ttl: Option<Duration>) -> (CacheStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let store = CacheStore::open(
            dir.join("cache.db"),
            "entries",
            StoreOptions {
                ttl,
                clock: clock.clone(),
                ..StoreOptions::default()
            },
        )
        .unwrap();
        (store, clock)
    }

    #[test]
    fn test_upsert_replaces_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let (store, clock) = store_with_clock(dir.path(), None);

        store.upsert("repo", "k", "one", &json!({"v": 1})).unwrap();
        clock.advance(10);
        store.upsert("repo", "k", "two", &json!({"v": 2})).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        let rec = store.get("repo", "k").unwrap().unwrap();
        assert_eq!(rec.payload, "two");
        assert_eq!(rec.metadata_value(), Some(json!({"v": 2})));
        assert_eq!(rec.updated_at, 1_010);
        assert_eq!(rec.last_accessed_at, Some(1_010));
    }

    #[test]
    fn test_load_latest_prefers_most_recently_accessed() {
        let dir = tempfile::tempdir().unwrap();
        let (store, clock) = store_with_clock(dir.path(), None);

        store.upsert("repo", "old", "a", &json!({})).unwrap();
        clock.advance(5);
        store.upsert("repo", "new", "b", &json!({})).unwrap();
        assert_eq!(store.load_latest("repo", None).unwrap().unwrap().key, "new");

        clock.advance(5);
        assert!(store.touch("repo", "old").unwrap());
        assert_eq!(store.load_latest("repo", None).unwrap().unwrap().key, "old");
    }

    #[test]
    fn test_load_latest_tie_breaks_on_updated_at() {
        let dir = tempfile::tempdir().unwrap();
        let (store, clock) = store_with_clock(dir.path(), None);

        store.upsert("repo", "first", "a", &json!({})).unwrap();
        clock.advance(5);
        store.upsert("repo", "second", "b", &json!({})).unwrap();
        // Bring "first" level with "second" on last access.
        assert!(store.touch("repo", "first").unwrap());

        assert_eq!(store.load_latest("repo", None).unwrap().unwrap().key, "second");
    }

    #[test]
    fn test_scopes_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = store_with_clock(dir.path(), None);

        store.upsert("/repo/a", "k", "a", &json!({})).unwrap();
        store.upsert("/repo/b", "k", "b", &json!({})).unwrap();

        assert_eq!(store.load_latest("/repo/a", None).unwrap().unwrap().payload, "a");
        assert_eq!(store.load_latest("/repo/b", None).unwrap().unwrap().payload, "b");
        assert!(store.load_latest("/repo/c", None).unwrap().is_none());
        assert_eq!(store.scopes().unwrap(), vec!["/repo/a", "/repo/b"]);
    }

    #[test]
    fn test_ttl_expiry_without_access() {
        let dir = tempfile::tempdir().unwrap();
        let ttl = Duration::from_secs(100);
        let (store, clock) = store_with_clock(dir.path(), Some(ttl));

        store.upsert("repo", "k", "p", &json!({})).unwrap();
        clock.advance(100);
        assert!(store.load_latest("repo", Some(ttl)).unwrap().is_some());
        clock.advance(1);
        assert!(store.load_latest("repo", Some(ttl)).unwrap().is_none());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_huge_ttl_keeps_fresh_records() {
        let dir = tempfile::tempdir().unwrap();
        let ttl = Duration::from_secs(u64::MAX);
        let (store, _) = store_with_clock(dir.path(), Some(ttl));

        store.upsert("repo", "k", "p", &json!({})).unwrap();
        store.upsert("repo", "k2", "p", &json!({})).unwrap();

        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.load_latest("repo", Some(ttl)).unwrap().unwrap().key, "k2");
        assert_eq!(store.purge_expired(ttl).unwrap(), 0);
    }

    #[test]
    fn test_touch_slides_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let ttl = Duration::from_secs(100);
        let (store, clock) = store_with_clock(dir.path(), Some(ttl));

        store.upsert("repo", "k", "p", &json!({})).unwrap();
        clock.advance(99);
        assert!(store.touch("repo", "k").unwrap());
        clock.advance(99);
        assert!(store.load_latest("repo", Some(ttl)).unwrap().is_some());
    }

    #[test]
    fn test_upsert_purges_other_expired_rows() {
        let dir = tempfile::tempdir().unwrap();
        let (store, clock) = store_with_clock(dir.path(), Some(Duration::from_secs(10)));

        store.upsert("old", "k", "p", &json!({})).unwrap();
        clock.advance(11);
        store.upsert("new", "k", "p", &json!({})).unwrap();

        assert_eq!(store.scopes().unwrap(), vec!["new"]);
    }

    #[test]
    fn test_touch_missing_record() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = store_with_clock(dir.path(), None);
        assert!(!store.touch("repo", "nope").unwrap());
    }

    #[test]
    fn test_invalid_table_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = CacheStore::open(dir.path().join("x.db"), "bad name", StoreOptions::default())
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidIdentifier { .. }));
        assert!(!dir.path().join("x.db").exists());
    }

    #[test]
    fn test_delete_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let (store, clock) = store_with_clock(dir.path(), None);

        store.upsert("a", "k1", "p", &json!({})).unwrap();
        clock.advance(1);
        store.upsert("a", "k2", "p", &json!({})).unwrap();
        store.upsert("b", "k1", "p", &json!({})).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.records, 3);
        assert_eq!(stats.scopes, 2);
        assert_eq!(stats.oldest_access, Some(1_000));
        assert_eq!(stats.newest_access, Some(1_001));

        assert!(store.delete("a", "k1").unwrap());
        assert!(!store.delete("a", "k1").unwrap());
        assert_eq!(store.delete_scope("a").unwrap(), 1);
        assert_eq!(store.count().unwrap(), 1);
    }
}
