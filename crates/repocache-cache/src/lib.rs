//! # repocache-cache
//!
//! Cache identities and the two cache domains built on them:
//!
//! - the metadata cache, keyed by repository and validated against a
//!   fingerprint of dependencies, file tree, docs, model and prompt version;
//! - the static-analysis cache, one JSON file per language and subproject,
//!   versioned by the caller's commit hash and iteration id.

pub mod identity;
pub mod metadata;
pub mod model;
pub mod static_analysis;

pub use identity::{CacheIdentity, CachedMetadata, MismatchReason};
pub use metadata::{metadata_cache_for, DisabledMetadataCache, MetadataCache, ResultCache};
pub use model::{model_id, prompt_version_digest, ModelDescriptor, ModelInfo};
pub use static_analysis::{
    AnalysisPayload, ClusterResult, StaticAnalysisCache, StaticAnalysisClientIdentity,
};
