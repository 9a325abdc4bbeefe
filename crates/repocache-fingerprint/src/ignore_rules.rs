//! The ignore predicate consulted for every digest.
//!
//! Any `Fn(&Path) -> bool` works; [`RepoIgnore`] is the standard
//! implementation built from the default ignore list and `.gitignore`.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use repocache_core::constants::DEFAULT_IGNORES;
use repocache_core::errors::FingerprintError;

/// Returns `true` for paths excluded from dependency, tree and docs digests.
/// Paths handed to the predicate are absolute.
pub trait IgnorePredicate: Send + Sync {
    fn is_ignored(&self, path: &Path) -> bool;
}

impl<F> IgnorePredicate for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn is_ignored(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Gitignore-syntax rules rooted at a repository: the default ignore
/// directories, the root `.gitignore`, and any extra patterns.
pub struct RepoIgnore {
    root: PathBuf,
    matcher: Gitignore,
}

impl RepoIgnore {
    pub fn new(root: &Path) -> Result<Self, FingerprintError> {
        Self::with_patterns(root, &[])
    }

    pub fn with_patterns(root: &Path, extra: &[&str]) -> Result<Self, FingerprintError> {
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let mut builder = GitignoreBuilder::new(&root);

        for dir in DEFAULT_IGNORES {
            add_line(&mut builder, &format!("{dir}/"))?;
        }

        let gitignore = root.join(".gitignore");
        if gitignore.is_file() {
            if let Some(err) = builder.add(&gitignore) {
                tracing::warn!(path = %gitignore.display(), error = %err, "partially invalid .gitignore");
            }
        }

        for pattern in extra {
            add_line(&mut builder, pattern)?;
        }

        let matcher = builder.build().map_err(|e| FingerprintError::Walk {
            message: format!("failed to build ignore rules: {e}"),
        })?;
        Ok(Self { root, matcher })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn add_line(builder: &mut GitignoreBuilder, line: &str) -> Result<(), FingerprintError> {
    builder
        .add_line(None, line)
        .map(|_| ())
        .map_err(|e| FingerprintError::Walk {
            message: format!("invalid ignore pattern {line:?}: {e}"),
        })
}

impl IgnorePredicate for RepoIgnore {
    fn is_ignored(&self, path: &Path) -> bool {
        if path == self.root || !path.starts_with(&self.root) {
            return false;
        }
        self.matcher
            .matched_path_or_any_parents(path, path.is_dir())
            .is_ignore()
    }
}

impl std::fmt::Debug for RepoIgnore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoIgnore")
            .field("root", &self.root)
            .field("rules", &self.matcher.num_ignores())
            .finish()
    }
}
