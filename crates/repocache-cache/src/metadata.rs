//! Metadata cache: one model-produced analysis result per repository.
//!
//! Two strategies implement [`ResultCache`]: [`MetadataCache`] backed by a
//! SQLite table, and [`DisabledMetadataCache`], which never hits and never
//! writes. [`metadata_cache_for`] picks one from configuration.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use repocache_core::clock::Clock;
use repocache_core::config::CacheConfig;
use repocache_core::errors::CacheError;
use repocache_storage::{CacheStore, StoreOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::identity::{CacheIdentity, CachedMetadata};

/// Table holding metadata entries.
pub const METADATA_TABLE: &str = "metadata_cache";

/// A cache of typed results keyed by [`CacheIdentity`].
pub trait ResultCache<T>: Send + Sync {
    /// The cached result if one exists and is still valid for `identity`.
    ///
    /// Corrupt or incompatible entries are a miss, never an error.
    fn load_if_valid(&self, identity: &CacheIdentity) -> Result<Option<T>, CacheError>;

    fn save(&self, identity: &CacheIdentity, result: &T) -> Result<(), CacheError>;

    /// Drop every entry for a repository scope. Returns the number removed.
    fn invalidate(&self, scope: &str) -> Result<usize, CacheError>;
}

/// SQLite-backed metadata cache with a sliding TTL.
pub struct MetadataCache<T> {
    store: CacheStore,
    ttl: Duration,
    _result: PhantomData<fn() -> T>,
}

impl<T> MetadataCache<T> {
    pub fn open(
        db_path: impl Into<PathBuf>,
        ttl: Duration,
        busy_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CacheError> {
        let store = CacheStore::open(
            db_path,
            METADATA_TABLE,
            StoreOptions {
                ttl: Some(ttl),
                busy_timeout,
                clock,
            },
        )?;
        Ok(Self {
            store,
            ttl,
            _result: PhantomData,
        })
    }

    pub fn from_config(
        config: &CacheConfig,
        repo_root: &Path,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CacheError> {
        Self::open(
            config.metadata_db_path(repo_root),
            config.metadata_ttl(),
            config.busy_timeout(),
            clock,
        )
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }
}

impl<T> ResultCache<T> for MetadataCache<T>
where
    T: Serialize + DeserializeOwned,
{
    fn load_if_valid(&self, identity: &CacheIdentity) -> Result<Option<T>, CacheError> {
        let Some(record) = self.store.load_latest(identity.scope(), Some(self.ttl))? else {
            tracing::debug!(scope = %identity.scope(), "metadata cache miss: no entry");
            return Ok(None);
        };

        let cached: CachedMetadata = match serde_json::from_str(&record.metadata) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(scope = %identity.scope(), key = %record.key, error = %e, "unreadable cache metadata, treating as miss");
                return Ok(None);
            }
        };

        if let Some(reason) = identity.mismatch_reason(&cached) {
            tracing::debug!(scope = %identity.scope(), %reason, "metadata cache miss: stale entry");
            return Ok(None);
        }

        let result: T = match serde_json::from_str(&record.payload) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(scope = %identity.scope(), key = %record.key, error = %e, "unreadable cached result, treating as miss");
                return Ok(None);
            }
        };

        if let Err(e) = self.store.touch(&record.scope, &record.key) {
            tracing::warn!(scope = %identity.scope(), error = %e, "failed to refresh cache entry access time");
        }
        tracing::debug!(scope = %identity.scope(), key = %record.key, "metadata cache hit");
        Ok(Some(result))
    }

    fn save(&self, identity: &CacheIdentity, result: &T) -> Result<(), CacheError> {
        let payload = serde_json::to_string(result).map_err(|e| CacheError::Serialization {
            message: e.to_string(),
        })?;
        let metadata = serde_json::to_value(identity.to_cache_metadata()).map_err(|e| {
            CacheError::Serialization {
                message: e.to_string(),
            }
        })?;
        self.store
            .upsert(identity.scope(), identity.fingerprint(), &payload, &metadata)?;
        tracing::debug!(scope = %identity.scope(), key = %identity.fingerprint(), "saved metadata cache entry");
        Ok(())
    }

    fn invalidate(&self, scope: &str) -> Result<usize, CacheError> {
        Ok(self.store.delete_scope(scope)?)
    }
}

/// A cache that is switched off.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledMetadataCache;

impl<T> ResultCache<T> for DisabledMetadataCache {
    fn load_if_valid(&self, _identity: &CacheIdentity) -> Result<Option<T>, CacheError> {
        Ok(None)
    }

    fn save(&self, _identity: &CacheIdentity, _result: &T) -> Result<(), CacheError> {
        Ok(())
    }

    fn invalidate(&self, _scope: &str) -> Result<usize, CacheError> {
        Ok(0)
    }
}

/// The metadata cache strategy `config` asks for.
pub fn metadata_cache_for<T>(
    config: &CacheConfig,
    repo_root: &Path,
    clock: Arc<dyn Clock>,
) -> Result<Box<dyn ResultCache<T>>, CacheError>
where
    T: Serialize + DeserializeOwned + 'static,
{
    if !config.enabled {
        tracing::debug!("metadata cache disabled by configuration");
        return Ok(Box::new(DisabledMetadataCache));
    }
    Ok(Box::new(MetadataCache::<T>::from_config(config, repo_root, clock)?))
}
