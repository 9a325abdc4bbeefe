//! Static-analysis cache: one JSON file per (language, project path) client.
//!
//! There is no validity predicate here. Callers own the version history and
//! compare the returned commit hash and iteration id themselves.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use repocache_core::config::CacheConfig;
use repocache_core::errors::CacheError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

const PATH_DIGEST_LEN: usize = 12;

/// Isolates cache files per language analyzer and per subproject.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StaticAnalysisClientIdentity {
    pub language: String,
    pub project_path_digest: String,
}

impl StaticAnalysisClientIdentity {
    pub fn new(language: &str, project_path: &Path) -> Self {
        let resolved = resolve_path(project_path);
        let digest = hex::encode(Sha1::digest(resolved.to_string_lossy().as_bytes()));
        Self {
            language: sanitize_language(language),
            project_path_digest: digest[..PATH_DIGEST_LEN].to_string(),
        }
    }

    /// `<language>_<first 12 hex chars of sha1(resolved path)>`
    pub fn client_id(&self) -> String {
        format!("{}_{}", self.language, self.project_path_digest)
    }
}

fn resolve_path(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn sanitize_language(language: &str) -> String {
    language
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Grouping of analysis nodes into clusters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterResult {
    pub clusters: BTreeMap<u32, BTreeSet<String>>,
    pub file_to_clusters: BTreeMap<String, BTreeSet<u32>>,
    pub cluster_to_files: BTreeMap<u32, BTreeSet<String>>,
    pub strategy: String,
}

impl ClusterResult {
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            ..Self::default()
        }
    }

    /// Place `node` in `cluster_id`, recording its file when known.
    pub fn add_node(&mut self, cluster_id: u32, node: &str, file: Option<&str>) {
        self.clusters
            .entry(cluster_id)
            .or_default()
            .insert(node.to_string());
        if let Some(file) = file {
            self.file_to_clusters
                .entry(file.to_string())
                .or_default()
                .insert(cluster_id);
            self.cluster_to_files
                .entry(cluster_id)
                .or_default()
                .insert(file.to_string());
        }
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }
}

/// What a client cache file holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload<R> {
    pub result: R,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_results: Option<BTreeMap<String, ClusterResult>>,
    pub commit_hash: String,
    pub iteration_id: u64,
}

/// File-per-client cache rooted at one directory.
#[derive(Debug, Clone)]
pub struct StaticAnalysisCache {
    root: PathBuf,
}

impl StaticAnalysisCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &CacheConfig, repo_root: &Path) -> Self {
        Self::new(config.static_analysis_root(repo_root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cache file for a client. Same inputs, same path; different language
    /// or project path, different file.
    pub fn get_client_cache_path(&self, language: &str, project_path: &Path) -> PathBuf {
        let client = StaticAnalysisClientIdentity::new(language, project_path);
        self.root.join(format!("{}.json", client.client_id()))
    }

    pub fn save_cache<R: Serialize>(
        &self,
        path: &Path,
        result: &R,
        commit_hash: &str,
        iteration_id: u64,
    ) -> Result<(), CacheError> {
        write_payload(
            path,
            &AnalysisPayload {
                result,
                cluster_results: None,
                commit_hash: commit_hash.to_string(),
                iteration_id,
            },
        )
    }

    /// Stored `(result, commit hash, iteration id)`, or `None` when absent
    /// or unreadable.
    pub fn load_cache<R: DeserializeOwned>(
        &self,
        path: &Path,
    ) -> Result<Option<AnalysisPayload<R>>, CacheError> {
        read_payload(path)
    }

    pub fn save_cache_with_clusters<R: Serialize>(
        &self,
        path: &Path,
        result: &R,
        cluster_results: &BTreeMap<String, ClusterResult>,
        commit_hash: &str,
        iteration_id: u64,
    ) -> Result<(), CacheError> {
        write_payload(
            path,
            &AnalysisPayload {
                result,
                cluster_results: Some(cluster_results.clone()),
                commit_hash: commit_hash.to_string(),
                iteration_id,
            },
        )
    }

    /// Like [`Self::load_cache`], but a file saved without cluster results
    /// is a miss.
    pub fn load_cache_with_clusters<R: DeserializeOwned>(
        &self,
        path: &Path,
    ) -> Result<Option<AnalysisPayload<R>>, CacheError> {
        let payload: Option<AnalysisPayload<R>> = read_payload(path)?;
        Ok(payload.filter(|p| {
            let has = p.cluster_results.is_some();
            if !has {
                tracing::debug!(path = %path.display(), "static analysis cache has no cluster results");
            }
            has
        }))
    }

    /// Delete a client cache file. Returns whether one existed.
    pub fn invalidate(&self, path: &Path) -> Result<bool, CacheError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(path, e)),
        }
    }
}

fn io_error(path: &Path, e: std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}

/// Serialize, write to a temp file beside `path`, and rename into place
/// while holding an exclusive lock on the sidecar lock file.
fn write_payload<T: Serialize>(path: &Path, payload: &T) -> Result<(), CacheError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| io_error(&parent, e))?;

    let bytes = serde_json::to_vec(payload).map_err(|e| CacheError::Serialization {
        message: e.to_string(),
    })?;

    let lock_file_path = lock_path(path);
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_file_path)
        .map_err(|e| io_error(&lock_file_path, e))?;
    let mut lock = fd_lock::RwLock::new(lock_file);
    let _guard = lock.write().map_err(|e| io_error(&lock_file_path, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(|e| io_error(&parent, e))?;
    tmp.write_all(&bytes).map_err(|e| io_error(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| io_error(path, e))?;
    tmp.persist(path).map_err(|e| io_error(path, e.error))?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "saved static analysis cache");
    Ok(())
}

fn read_payload<R: DeserializeOwned>(path: &Path) -> Result<Option<AnalysisPayload<R>>, CacheError> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error(path, e)),
    };
    match serde_json::from_slice(&bytes) {
        Ok(payload) => Ok(Some(payload)),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable static analysis cache, treating as miss");
            Ok(None)
        }
    }
}
