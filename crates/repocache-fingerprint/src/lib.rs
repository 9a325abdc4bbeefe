//! # repocache-fingerprint
//!
//! Deterministic digests over live repository state. Inputs are always
//! sorted before hashing, so results never depend on filesystem iteration
//! order.

pub mod dependencies;
pub mod digest;
pub mod docs;
pub mod ignore_rules;
pub mod similarity;
pub mod snapshot;
pub mod tree;
pub mod walker;

pub use docs::{DocsCompatibility, DocsManifest};
pub use ignore_rules::{IgnorePredicate, RepoIgnore};
pub use similarity::token_overlap_similarity;
pub use snapshot::{fingerprint_repository, RepoFingerprint};
pub use walker::{walk_repository, RepoFile};
