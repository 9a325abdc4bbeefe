//! Error types, one enum per layer.

use std::path::PathBuf;

/// Errors raised by the persistent key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite error: {message}")]
    Sqlite { message: String },

    /// Lock contention outlasted the configured busy timeout.
    #[error("database busy: {message}")]
    Busy { message: String },

    #[error("invalid identifier {name:?}: only ASCII letters, digits and '_' are allowed")]
    InvalidIdentifier { name: String },

    #[error("serialization error: {message}")]
    Serialization { message: String },

    #[error("io error: {message}")]
    Io { message: String },
}

/// Errors raised while fingerprinting a repository.
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    #[error("repository root not found: {}", path.display())]
    RootNotFound { path: PathBuf },

    #[error("walk failed: {message}")]
    Walk { message: String },
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config: {message}")]
    Parse { message: String },

    #[error("failed to read config: {message}")]
    Io { message: String },

    #[error("invalid config value for `{field}`: {message}")]
    Invalid { field: String, message: String },
}

/// Errors surfaced by the cache facades.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("io error at {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("serialization error: {message}")]
    Serialization { message: String },
}
