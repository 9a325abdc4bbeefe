//! Repository walker built on the `ignore` crate.
//!
//! Built-in gitignore handling is switched off: the ignore predicate is the
//! only authority on what is excluded, except for VCS metadata directories,
//! which are never walked.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use repocache_core::errors::FingerprintError;

use crate::ignore_rules::IgnorePredicate;

const VCS_DIRS: &[&str] = &[".git", ".hg", ".svn"];

/// A regular file discovered under the repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFile {
    pub path: PathBuf,
    /// Path relative to the root, `/`-separated.
    pub relative: String,
}

impl RepoFile {
    pub fn file_name(&self) -> &str {
        self.relative.rsplit('/').next().unwrap_or(&self.relative)
    }

    /// Directory components of the relative path, excluding the file name.
    pub fn parent_components(&self) -> impl Iterator<Item = &str> {
        let mut parts: Vec<&str> = self.relative.split('/').collect();
        parts.pop();
        parts.into_iter()
    }
}

/// Walk `root`, returning non-ignored regular files sorted by relative path.
///
/// Ignored directories are pruned without descending. Entries that cannot
/// be read are skipped.
pub fn walk_repository(
    root: &Path,
    ignore: Arc<dyn IgnorePredicate>,
) -> Result<Vec<RepoFile>, FingerprintError> {
    if !root.is_dir() {
        return Err(FingerprintError::RootNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut builder = ignore::WalkBuilder::new(root);
    builder.standard_filters(false).follow_links(false);
    builder.filter_entry(move |entry| {
        if entry.depth() == 0 {
            return true;
        }
        let is_vcs = entry.file_type().is_some_and(|ft| ft.is_dir())
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| VCS_DIRS.contains(&name));
        !is_vcs && !ignore.is_ignored(entry.path())
    });

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push(RepoFile {
            path: entry.path().to_path_buf(),
            relative,
        });
    }

    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let p = root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, rel).unwrap();
    }

    #[test]
    fn test_walk_sorted_and_relative() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.txt");
        touch(dir.path(), "a/z.rs");
        touch(dir.path(), "a/b/c.rs");
        touch(dir.path(), ".git/HEAD");

        let files = walk_repository(dir.path(), Arc::new(|_: &Path| false)).unwrap();
        let rels: Vec<_> = files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(rels, vec!["a/b/c.rs", "a/z.rs", "b.txt"]);
        assert_eq!(files[0].file_name(), "c.rs");
        assert_eq!(files[0].parent_components().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_ignored_directories_are_pruned() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "keep/x.md");
        touch(dir.path(), "skip/y.md");

        let files = walk_repository(
            dir.path(),
            Arc::new(|p: &Path| p.file_name().is_some_and(|n| n == "skip")),
        )
        .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative, "keep/x.md");
    }

    #[test]
    fn test_missing_root() {
        let err = walk_repository(Path::new("/definitely/not/here"), Arc::new(|_: &Path| false))
            .unwrap_err();
        assert!(matches!(err, FingerprintError::RootNotFound { .. }));
    }
}
