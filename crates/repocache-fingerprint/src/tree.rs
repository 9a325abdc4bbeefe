//! Tree digest: file paths only, never contents.

use crate::digest::sha256_hex;
use crate::walker::RepoFile;

/// Digest over the sorted, newline-joined relative paths.
pub fn tree_digest(files: &[RepoFile]) -> String {
    let mut paths: Vec<&str> = files.iter().map(|f| f.relative.as_str()).collect();
    paths.sort_unstable();
    sha256_hex(paths.join("\n").as_bytes())
}
