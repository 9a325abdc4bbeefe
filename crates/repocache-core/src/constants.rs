//! Shared file classification lists.
//!
//! `DEPENDENCY_*` is the single authoritative definition of what a
//! dependency manifest is. Cache invalidation and any user-facing dependency
//! listing must both read it from here.

/// Exact manifest and lock file names, matched against a file's name anywhere
/// in the tree.
pub const DEPENDENCY_FILE_NAMES: &[&str] = &[
    // Python
    "requirements.txt",
    "requirements-dev.txt",
    "requirements_dev.txt",
    "dev-requirements.txt",
    "Pipfile",
    "Pipfile.lock",
    "pyproject.toml",
    "poetry.lock",
    "uv.lock",
    "setup.py",
    "setup.cfg",
    "environment.yml",
    "environment.yaml",
    "conda.yml",
    // JavaScript / TypeScript
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lockb",
    "tsconfig.json",
    // Rust
    "Cargo.toml",
    "Cargo.lock",
    // Go
    "go.mod",
    "go.sum",
    // JVM
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "settings.gradle",
    "settings.gradle.kts",
    // Ruby
    "Gemfile",
    "Gemfile.lock",
    // PHP
    "composer.json",
    "composer.lock",
    // .NET
    "packages.config",
    "Directory.Packages.props",
];

/// Directories whose files are all dependency manifests
/// (e.g. `requirements/base.txt`).
pub const DEPENDENCY_SUBDIRECTORIES: &[&str] = &["requirements"];

/// Glob patterns matched against a file's name.
pub const DEPENDENCY_GLOB_PATTERNS: &[&str] = &[
    "requirements*.txt",
    "*.csproj",
    "*.fsproj",
    "*.gemspec",
    "*.cabal",
];

/// Extensions treated as documentation prose.
pub const DOC_EXTENSIONS: &[&str] = &["md", "mdx", "markdown", "rst", "txt", "adoc"];

/// File stems (case-insensitive) that are priority documentation at the
/// repository root.
pub const PRIORITY_DOC_STEMS: &[&str] = &["readme", "contributing", "architecture"];

/// Index pages under these directories are priority documentation.
pub const DOCS_INDEX_DIRS: &[&str] = &["docs", "doc", "documentation"];

/// Stems recognized as a docs index page.
pub const DOCS_INDEX_STEMS: &[&str] = &["index", "readme"];

/// Directory name fragments marking test-related content; documentation
/// under such a path is left out of the docs manifest.
pub const TEST_PATH_MARKERS: &[&str] = &["test", "fixture"];

/// Default directories never walked.
pub const DEFAULT_IGNORES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "dist",
    "build",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".tox",
    ".venv",
    "venv",
    ".next",
    ".nuxt",
    "coverage",
    ".repocache",
];

/// Version of the docs manifest layout. Manifests stored under any other
/// version are incompatible.
pub const DOCS_MANIFEST_SCHEMA_VERSION: u32 = 2;

/// Minimum token-overlap similarity for non-priority docs to be considered
/// unchanged.
pub const DOCS_SIMILARITY_THRESHOLD: f64 = 0.995;

/// Ranked field names probed on a model handle to obtain its identifier.
pub const MODEL_ID_FIELDS: &[&str] = &["model_name", "model", "model_id", "deployment_name"];
