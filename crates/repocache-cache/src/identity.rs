//! `CacheIdentity` — everything that decides whether a cached metadata
//! result is still valid, plus the policy that decides it.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use repocache_core::errors::FingerprintError;
use repocache_fingerprint::digest::sha256_fields;
use repocache_fingerprint::{
    fingerprint_repository, DocsCompatibility, DocsManifest, IgnorePredicate, RepoFingerprint,
};
use serde::{Deserialize, Serialize};

use crate::model::{model_id, ModelDescriptor};

/// Layout version of [`CachedMetadata`] itself.
pub const METADATA_FORMAT_VERSION: u32 = 1;

/// Snapshot of cache-relevant state, built fresh for every lookup.
///
/// Fields are read-only once built so the cached fingerprint always
/// describes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheIdentity {
    scope: String,
    deps_hash: String,
    tree_hash: String,
    model_id: String,
    prompt_version: String,
    docs_manifest: DocsManifest,
    fingerprint: String,
}

/// The persisted part of an identity, stored alongside each cached result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedMetadata {
    pub format_version: u32,
    pub fingerprint: String,
    pub deps_hash: String,
    pub tree_hash: String,
    pub model_id: String,
    pub prompt_version: String,
    pub docs_manifest: DocsManifest,
}

/// Why a cached entry was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum MismatchReason {
    FormatVersion { cached: u32 },
    ModelId,
    PromptVersion,
    DepsHash,
    TreeHash,
    Docs(DocsCompatibility),
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MismatchReason::FormatVersion { cached } => {
                write!(f, "metadata format v{cached}, expected v{METADATA_FORMAT_VERSION}")
            }
            MismatchReason::ModelId => f.write_str("model changed"),
            MismatchReason::PromptVersion => f.write_str("prompt version changed"),
            MismatchReason::DepsHash => f.write_str("dependency files changed"),
            MismatchReason::TreeHash => f.write_str("file tree changed"),
            MismatchReason::Docs(DocsCompatibility::SchemaMismatch { cached, current }) => {
                write!(f, "docs manifest schema v{cached}, expected v{current}")
            }
            MismatchReason::Docs(DocsCompatibility::PriorityChanged) => {
                f.write_str("priority docs changed")
            }
            MismatchReason::Docs(DocsCompatibility::FileSetChanged) => {
                f.write_str("docs added or removed")
            }
            MismatchReason::Docs(DocsCompatibility::BelowThreshold { similarity }) => {
                write!(f, "docs similarity {similarity:.4} below threshold")
            }
            MismatchReason::Docs(DocsCompatibility::Compatible) => f.write_str("docs compatible"),
        }
    }
}

impl CacheIdentity {
    pub fn new(
        scope: impl Into<String>,
        deps_hash: impl Into<String>,
        tree_hash: impl Into<String>,
        model_id: impl Into<String>,
        prompt_version: impl Into<String>,
        docs_manifest: DocsManifest,
    ) -> Self {
        let mut identity = Self {
            scope: scope.into(),
            deps_hash: deps_hash.into(),
            tree_hash: tree_hash.into(),
            model_id: model_id.into(),
            prompt_version: prompt_version.into(),
            docs_manifest,
            fingerprint: String::new(),
        };
        identity.fingerprint = identity.compute_fingerprint();
        identity
    }

    pub fn from_fingerprint(
        repo: RepoFingerprint,
        model_id: impl Into<String>,
        prompt_version: impl Into<String>,
    ) -> Self {
        Self::new(
            repo.root.to_string_lossy().into_owned(),
            repo.deps_hash,
            repo.tree_hash,
            model_id,
            prompt_version,
            repo.docs_manifest,
        )
    }

    /// Fingerprint the repository at `repo_root` and combine it with the
    /// model identifier and prompt version.
    pub fn from_repo(
        repo_root: &Path,
        model: &dyn ModelDescriptor,
        ignore: Arc<dyn IgnorePredicate>,
        prompt_version: &str,
    ) -> Result<Self, FingerprintError> {
        let repo = fingerprint_repository(repo_root, ignore)?;
        Ok(Self::from_fingerprint(repo, model_id(model), prompt_version))
    }

    /// Resolved absolute repository path.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn deps_hash(&self) -> &str {
        &self.deps_hash
    }

    pub fn tree_hash(&self) -> &str {
        &self.tree_hash
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn prompt_version(&self) -> &str {
        &self.prompt_version
    }

    pub fn docs_manifest(&self) -> &DocsManifest {
        &self.docs_manifest
    }

    /// The cache key: a digest over every field in fixed order.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    fn compute_fingerprint(&self) -> String {
        let schema = self.docs_manifest.schema_version.to_string();
        let docs = self.docs_manifest.digest();
        sha256_fields([
            self.scope.as_str(),
            self.deps_hash.as_str(),
            self.tree_hash.as_str(),
            self.model_id.as_str(),
            self.prompt_version.as_str(),
            schema.as_str(),
            docs.as_str(),
        ])
    }

    /// Everything needed to re-run [`Self::mismatch_reason`] later.
    pub fn to_cache_metadata(&self) -> CachedMetadata {
        CachedMetadata {
            format_version: METADATA_FORMAT_VERSION,
            fingerprint: self.fingerprint.clone(),
            deps_hash: self.deps_hash.clone(),
            tree_hash: self.tree_hash.clone(),
            model_id: self.model_id.clone(),
            prompt_version: self.prompt_version.clone(),
            docs_manifest: self.docs_manifest.clone(),
        }
    }

    /// First reason `cached` is not valid for this identity, or `None`.
    ///
    /// Exact-match fields are checked before the docs similarity.
    pub fn mismatch_reason(&self, cached: &CachedMetadata) -> Option<MismatchReason> {
        if cached.format_version != METADATA_FORMAT_VERSION {
            return Some(MismatchReason::FormatVersion {
                cached: cached.format_version,
            });
        }
        if cached.model_id != self.model_id {
            return Some(MismatchReason::ModelId);
        }
        if cached.prompt_version != self.prompt_version {
            return Some(MismatchReason::PromptVersion);
        }
        if cached.deps_hash != self.deps_hash {
            return Some(MismatchReason::DepsHash);
        }
        if cached.tree_hash != self.tree_hash {
            return Some(MismatchReason::TreeHash);
        }
        match self.docs_manifest.compatibility(&cached.docs_manifest) {
            DocsCompatibility::Compatible => None,
            other => Some(MismatchReason::Docs(other)),
        }
    }

    pub fn matches_cached_metadata(&self, cached: &CachedMetadata) -> bool {
        self.mismatch_reason(cached).is_none()
    }
}
