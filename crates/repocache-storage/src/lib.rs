//! # repocache-storage
//!
//! SQLite persistence for cache entries. One table per cache domain,
//! WAL mode, bounded busy wait, one short-lived connection per operation.
//! The store knows nothing about what it caches: rows are opaque
//! `(scope, key, payload, metadata)` tuples.

pub mod connection;
pub mod migrations;
pub mod queries;
pub mod store;

pub use queries::records::{CacheRecord, StoreStats};
pub use store::{CacheStore, StoreOptions};
