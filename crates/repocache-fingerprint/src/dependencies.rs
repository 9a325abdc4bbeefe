//! Dependency manifest detection and digest.
//!
//! Classification reads the shared lists in
//! `repocache_core::constants`, the same lists any dependency listing uses.

use std::sync::OnceLock;

use glob::Pattern;
use repocache_core::constants::{
    DEPENDENCY_FILE_NAMES, DEPENDENCY_GLOB_PATTERNS, DEPENDENCY_SUBDIRECTORIES,
};

use crate::digest::sha256_hex;
use crate::walker::RepoFile;

fn glob_patterns() -> &'static [Pattern] {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        DEPENDENCY_GLOB_PATTERNS
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect()
    })
}

/// Whether a file is a dependency manifest or lock file.
pub fn is_dependency_file(file: &RepoFile) -> bool {
    let name = file.file_name();
    DEPENDENCY_FILE_NAMES.contains(&name)
        || glob_patterns().iter().any(|p| p.matches(name))
        || file
            .parent_components()
            .any(|dir| DEPENDENCY_SUBDIRECTORIES.contains(&dir))
}

/// Dependency files among `files`, in the order given.
pub fn dependency_files(files: &[RepoFile]) -> Vec<&RepoFile> {
    files.iter().filter(|f| is_dependency_file(f)).collect()
}

/// Digest over `relative_path\ncontent\n` for every dependency file, in
/// path order. Unreadable files contribute empty content.
pub fn dependency_digest(files: &[RepoFile]) -> String {
    let mut deps = dependency_files(files);
    deps.sort_by(|a, b| a.relative.cmp(&b.relative));

    let mut buf = String::new();
    for file in deps {
        let content = match std::fs::read(&file.path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                tracing::warn!(path = %file.relative, error = %e, "unreadable dependency file, hashing as empty");
                String::new()
            }
        };
        buf.push_str(&file.relative);
        buf.push('\n');
        buf.push_str(&content);
        buf.push('\n');
    }
    sha256_hex(buf.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file(rel: &str) -> RepoFile {
        RepoFile {
            path: PathBuf::from("/nonexistent").join(rel),
            relative: rel.to_string(),
        }
    }

    #[test]
    fn test_classification() {
        assert!(is_dependency_file(&file("Cargo.toml")));
        assert!(is_dependency_file(&file("web/package.json")));
        assert!(is_dependency_file(&file("requirements-test.txt")));
        assert!(is_dependency_file(&file("requirements/base.in")));
        assert!(is_dependency_file(&file("App/App.csproj")));
        assert!(!is_dependency_file(&file("src/main.rs")));
        assert!(!is_dependency_file(&file("README.md")));
    }

    #[test]
    fn test_unreadable_files_hash_as_empty() {
        let files = vec![file("Cargo.toml")];
        let a = dependency_digest(&files);
        let b = dependency_digest(&files);
        assert_eq!(a, b);
        assert_ne!(a, dependency_digest(&[]));
    }

    #[test]
    fn test_digest_ignores_non_dependency_files() {
        let with_src = vec![file("Cargo.toml"), file("src/lib.rs")];
        assert_eq!(
            dependency_digest(&with_src),
            dependency_digest(&[file("Cargo.toml")])
        );
    }
}
