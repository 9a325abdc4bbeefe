//! One-walk fingerprint of a repository.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use repocache_core::errors::FingerprintError;

use crate::dependencies::dependency_digest;
use crate::docs::DocsManifest;
use crate::ignore_rules::IgnorePredicate;
use crate::tree::tree_digest;
use crate::walker::walk_repository;

/// Digests describing the current state of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFingerprint {
    /// Resolved absolute repository root.
    pub root: PathBuf,
    pub deps_hash: String,
    pub tree_hash: String,
    pub docs_manifest: DocsManifest,
}

/// Resolve `repo_root` to an absolute path, canonical when possible.
pub fn resolve_root(repo_root: &Path) -> Result<PathBuf, FingerprintError> {
    repo_root
        .canonicalize()
        .map_err(|_| FingerprintError::RootNotFound {
            path: repo_root.to_path_buf(),
        })
}

/// Walk the repository once and derive every digest from that walk.
pub fn fingerprint_repository(
    repo_root: &Path,
    ignore: Arc<dyn IgnorePredicate>,
) -> Result<RepoFingerprint, FingerprintError> {
    let root = resolve_root(repo_root)?;
    let files = walk_repository(&root, ignore)?;

    let fingerprint = RepoFingerprint {
        deps_hash: dependency_digest(&files),
        tree_hash: tree_digest(&files),
        docs_manifest: DocsManifest::build(&files),
        root,
    };
    tracing::debug!(
        root = %fingerprint.root.display(),
        files = files.len(),
        docs = fingerprint.docs_manifest.file_digests.len(),
        "fingerprinted repository"
    );
    Ok(fingerprint)
}
