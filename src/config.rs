//! Configuration types for extraction and batch indexing.
//!
//! Both option structs follow the builder style and can also be loaded by a
//! collaborator from its own configuration through `serde`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Exclude patterns applied when none are configured
pub const DEFAULT_EXCLUDES: [&str; 2] = [".dropbox.cache", "handout"];

/// Options for extracting a single document.
///
/// # Examples
///
/// ```rust
/// use slydb::config::ExtractOptions;
///
/// let options = ExtractOptions::new()
///     .with_root_prefix("Dropbox (HMS)")
///     .with_thumbnail_dir("thumbnails");
/// assert!(options.thumbnail_dir.is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Path text to strip from record paths; everything up to and including
    /// its last occurrence is removed
    pub root_prefix: Option<String>,
    /// Where to export slide thumbnails, if anywhere
    pub thumbnail_dir: Option<PathBuf>,
}

impl ExtractOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_root_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.root_prefix = Some(prefix.into());
        self
    }

    #[inline]
    pub fn with_thumbnail_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.thumbnail_dir = Some(dir.into());
        self
    }

    /// Record path for a container path
    pub fn relative_path(&self, path: &Path) -> String {
        let full = path.to_string_lossy();
        match self.root_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => full
                .rsplit_once(prefix)
                .map_or_else(|| full.to_string(), |(_, tail)| tail.to_string()),
            _ => full.into_owned(),
        }
    }
}

/// Options for indexing a directory tree.
///
/// # Examples
///
/// ```rust
/// use slydb::config::IndexOptions;
///
/// let options = IndexOptions::new().with_workers(4).add_exclude("archive");
/// assert_eq!(options.exclude.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    pub extract: ExtractOptions,
    /// Case-insensitive substrings; matching paths are skipped
    pub exclude: Vec<String>,
    /// Size of a dedicated worker pool; the global rayon pool when unset
    pub workers: Option<usize>,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            extract: ExtractOptions::default(),
            exclude: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            workers: None,
        }
    }
}

impl IndexOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_extract(mut self, extract: ExtractOptions) -> Self {
        self.extract = extract;
        self
    }

    /// Replace the exclude patterns
    #[inline]
    pub fn with_exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = patterns.into_iter().map(Into::into).collect();
        self
    }

    #[inline]
    pub fn add_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }

    #[inline]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Whether a path matches one of the exclude patterns
    pub fn is_excluded(&self, path: &Path) -> bool {
        let lowered = path.to_string_lossy().to_lowercase();
        self.exclude
            .iter()
            .any(|pattern| lowered.contains(&pattern.to_lowercase()))
    }
}
