//! Documentation manifest and its compatibility check.
//!
//! Priority docs (root README/CONTRIBUTING/ARCHITECTURE and docs index
//! pages) must match exactly. Other docs are compared by token-overlap
//! similarity of their concatenated text, so typo fixes do not invalidate.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use repocache_core::constants::{
    DOCS_INDEX_DIRS, DOCS_INDEX_STEMS, DOCS_MANIFEST_SCHEMA_VERSION, DOCS_SIMILARITY_THRESHOLD,
    DOC_EXTENSIONS, PRIORITY_DOC_STEMS, TEST_PATH_MARKERS,
};
use serde::{Deserialize, Serialize};

use crate::dependencies::is_dependency_file;
use crate::digest::sha256_hex;
use crate::similarity::token_overlap_similarity;
use crate::walker::RepoFile;

/// Per-file digests of documentation, split into priority and the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocsManifest {
    pub schema_version: u32,
    /// Relative path to content digest, for every documentation file.
    pub file_digests: BTreeMap<String, String>,
    pub priority_files: BTreeSet<String>,
    /// Non-priority documentation text, concatenated in path order.
    pub docs_text: String,
}

/// Outcome of comparing a current manifest against a cached one.
#[derive(Debug, Clone, PartialEq)]
pub enum DocsCompatibility {
    Compatible,
    SchemaMismatch { cached: u32, current: u32 },
    PriorityChanged,
    FileSetChanged,
    BelowThreshold { similarity: f64 },
}

impl DocsCompatibility {
    pub fn is_compatible(&self) -> bool {
        matches!(self, DocsCompatibility::Compatible)
    }
}

struct DocEntry {
    relative: String,
    digest: String,
    text: String,
    priority: bool,
}

impl DocsManifest {
    /// Build the manifest from walked files. Unreadable docs hash as empty.
    pub fn build(files: &[RepoFile]) -> Self {
        let mut entries: Vec<DocEntry> = files
            .par_iter()
            .filter(|f| is_doc_file(f))
            .map(|f| {
                let bytes = match std::fs::read(&f.path) {
                    Ok(b) => b,
                    Err(e) => {
                        tracing::warn!(path = %f.relative, error = %e, "unreadable doc file, hashing as empty");
                        Vec::new()
                    }
                };
                DocEntry {
                    relative: f.relative.clone(),
                    digest: sha256_hex(&bytes),
                    text: String::from_utf8_lossy(&bytes).into_owned(),
                    priority: is_priority_doc(f),
                }
            })
            .collect();
        entries.sort_by(|a, b| a.relative.cmp(&b.relative));

        let mut file_digests = BTreeMap::new();
        let mut priority_files = BTreeSet::new();
        let mut texts = Vec::new();
        for entry in entries {
            if entry.priority {
                priority_files.insert(entry.relative.clone());
            } else {
                texts.push(entry.text);
            }
            file_digests.insert(entry.relative, entry.digest);
        }

        Self {
            schema_version: DOCS_MANIFEST_SCHEMA_VERSION,
            file_digests,
            priority_files,
            docs_text: texts.join("\n"),
        }
    }

    fn priority_digests(&self) -> BTreeMap<&str, &str> {
        self.priority_files
            .iter()
            .map(|p| {
                let digest = self.file_digests.get(p).map(String::as_str).unwrap_or("");
                (p.as_str(), digest)
            })
            .collect()
    }

    fn non_priority_digests(&self) -> BTreeMap<&str, &str> {
        self.file_digests
            .iter()
            .filter(|(p, _)| !self.priority_files.contains(*p))
            .map(|(p, d)| (p.as_str(), d.as_str()))
            .collect()
    }

    /// Compare `self` (current) against a `cached` manifest.
    ///
    /// Checks run cheapest first: schema version, priority digests, file
    /// set, then similarity of the non-priority text.
    pub fn compatibility(&self, cached: &DocsManifest) -> DocsCompatibility {
        if cached.schema_version != self.schema_version {
            return DocsCompatibility::SchemaMismatch {
                cached: cached.schema_version,
                current: self.schema_version,
            };
        }
        if cached.priority_digests() != self.priority_digests() {
            return DocsCompatibility::PriorityChanged;
        }
        if !cached.file_digests.keys().eq(self.file_digests.keys()) {
            return DocsCompatibility::FileSetChanged;
        }
        if cached.non_priority_digests() == self.non_priority_digests() {
            return DocsCompatibility::Compatible;
        }

        let similarity = token_overlap_similarity(&cached.docs_text, &self.docs_text);
        if similarity >= DOCS_SIMILARITY_THRESHOLD {
            DocsCompatibility::Compatible
        } else {
            DocsCompatibility::BelowThreshold { similarity }
        }
    }

    /// Stable digest over schema version, per-file digests and the priority set.
    pub fn digest(&self) -> String {
        let mut buf = format!("v{}\n", self.schema_version);
        for (path, digest) in &self.file_digests {
            buf.push_str(path);
            buf.push('\t');
            buf.push_str(digest);
            buf.push('\n');
        }
        buf.push_str("priority\n");
        for path in &self.priority_files {
            buf.push_str(path);
            buf.push('\n');
        }
        sha256_hex(buf.as_bytes())
    }
}

fn lower_ext_and_stem(name: &str) -> (String, String) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (ext.to_ascii_lowercase(), stem.to_ascii_lowercase()),
        _ => (String::new(), name.to_ascii_lowercase()),
    }
}

/// Documentation by extension, excluding dependency manifests and anything
/// under a test-related directory.
pub fn is_doc_file(file: &RepoFile) -> bool {
    let (ext, _) = lower_ext_and_stem(file.file_name());
    if !DOC_EXTENSIONS.contains(&ext.as_str()) || is_dependency_file(file) {
        return false;
    }
    !file.parent_components().any(|dir| {
        let dir = dir.to_ascii_lowercase();
        TEST_PATH_MARKERS.iter().any(|m| dir.contains(m))
    })
}

/// Root README/CONTRIBUTING/ARCHITECTURE, or an index page directly under a
/// root docs directory.
pub fn is_priority_doc(file: &RepoFile) -> bool {
    let (_, stem) = lower_ext_and_stem(file.file_name());
    let dirs: Vec<String> = file
        .parent_components()
        .map(|d| d.to_ascii_lowercase())
        .collect();
    match dirs.as_slice() {
        [] => PRIORITY_DOC_STEMS.contains(&stem.as_str()),
        [dir] => {
            DOCS_INDEX_DIRS.contains(&dir.as_str()) && DOCS_INDEX_STEMS.contains(&stem.as_str())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file(rel: &str) -> RepoFile {
        RepoFile {
            path: PathBuf::from(rel),
            relative: rel.to_string(),
        }
    }

    fn manifest(priority: &[(&str, &str)], other: &[(&str, &str)], text: &str) -> DocsManifest {
        let mut file_digests = BTreeMap::new();
        let mut priority_files = BTreeSet::new();
        for (p, d) in priority {
            file_digests.insert(p.to_string(), d.to_string());
            priority_files.insert(p.to_string());
        }
        for (p, d) in other {
            file_digests.insert(p.to_string(), d.to_string());
        }
        DocsManifest {
            schema_version: DOCS_MANIFEST_SCHEMA_VERSION,
            file_digests,
            priority_files,
            docs_text: text.to_string(),
        }
    }

    #[test]
    fn test_doc_classification() {
        assert!(is_doc_file(&file("README.md")));
        assert!(is_doc_file(&file("docs/guide.rst")));
        assert!(!is_doc_file(&file("src/lib.rs")));
        assert!(!is_doc_file(&file("requirements.txt")));
        assert!(!is_doc_file(&file("tests/fixtures/README.md")));
        assert!(!is_doc_file(&file("pkg/__tests__/notes.md")));

        assert!(is_priority_doc(&file("README.md")));
        assert!(is_priority_doc(&file("Contributing.rst")));
        assert!(is_priority_doc(&file("ARCHITECTURE.md")));
        assert!(is_priority_doc(&file("docs/index.md")));
        assert!(is_priority_doc(&file("docs/README.md")));
        assert!(!is_priority_doc(&file("docs/guide.md")));
        assert!(!is_priority_doc(&file("pkg/README.md")));
    }

    #[test]
    fn test_schema_mismatch() {
        let current = manifest(&[], &[], "");
        let mut cached = current.clone();
        cached.schema_version = DOCS_MANIFEST_SCHEMA_VERSION - 1;
        assert_eq!(
            current.compatibility(&cached),
            DocsCompatibility::SchemaMismatch {
                cached: DOCS_MANIFEST_SCHEMA_VERSION - 1,
                current: DOCS_MANIFEST_SCHEMA_VERSION,
            }
        );
    }

    #[test]
    fn test_priority_change_invalidates_regardless_of_similarity() {
        let cached = manifest(&[("README.md", "aaa")], &[("docs/a.md", "x")], "same text");
        let current = manifest(&[("README.md", "bbb")], &[("docs/a.md", "x")], "same text");
        assert_eq!(current.compatibility(&cached), DocsCompatibility::PriorityChanged);
    }

    #[test]
    fn test_file_set_change_invalidates() {
        let cached = manifest(&[], &[("docs/a.md", "x")], "t");
        let current = manifest(&[], &[("docs/a.md", "x"), ("docs/b.md", "")], "t");
        assert_eq!(current.compatibility(&cached), DocsCompatibility::FileSetChanged);
        assert_eq!(cached.compatibility(&current), DocsCompatibility::FileSetChanged);
    }

    #[test]
    fn test_small_edit_is_compatible_large_is_not() {
        let words: Vec<String> = (0..1000).map(|i| format!("w{i}")).collect();
        let old_text = words.join(" ");
        let typo_text = old_text.replacen("w500", "w5OO", 1);
        let rewrite_text = words[..900].join(" ");

        let cached = manifest(&[], &[("docs/a.md", "1")], &old_text);
        let typo = manifest(&[], &[("docs/a.md", "2")], &typo_text);
        let rewrite = manifest(&[], &[("docs/a.md", "3")], &rewrite_text);

        assert!(typo.compatibility(&cached).is_compatible());
        assert!(matches!(
            rewrite.compatibility(&cached),
            DocsCompatibility::BelowThreshold { .. }
        ));
    }

    #[test]
    fn test_identical_digests_skip_similarity() {
        let cached = manifest(&[], &[("docs/a.md", "x")], "completely different");
        let current = manifest(&[], &[("docs/a.md", "x")], "text entirely");
        assert!(current.compatibility(&cached).is_compatible());
    }

    #[test]
    fn test_manifest_roundtrips_through_json() {
        let m = manifest(&[("README.md", "a")], &[("docs/x.md", "b")], "body");
        let json = serde_json::to_string(&m).unwrap();
        let back: DocsManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
        assert_eq!(back.digest(), m.digest());
    }
}
