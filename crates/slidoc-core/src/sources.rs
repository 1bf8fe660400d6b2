//! Source providers.
//!
//! Compilation itself never touches the filesystem; these providers load
//! markdown files up front and hand their text to the run driver.

use std::ffi::OsStr;
#[cfg(feature = "walk")]
use std::path::Path;
use std::path::PathBuf;

use eyre::{Result, WrapErr};

/// Extensions treated as slide markdown
pub const SUPPORTED_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Check if a file extension is slide markdown
pub fn is_supported_extension(ext: &OsStr) -> bool {
    ext.to_str()
        .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e))
}

/// A loaded markdown file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// File stem, used in slide ids and output names
    pub name: String,
    pub path: PathBuf,
    pub text: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            path,
            text: text.into(),
        }
    }
}

/// Trait for providing the markdown files of a run
pub trait Sources {
    /// Load every file, in run order
    fn load(self) -> Result<Vec<SourceFile>>;
}

fn read(path: &PathBuf) -> Result<SourceFile> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    Ok(SourceFile::new(path.clone(), text))
}

/// Sources from an explicit list of file paths, kept in the given order
pub struct PathSources(Vec<PathBuf>);

impl PathSources {
    /// Create from an iterator of paths
    pub fn new(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self(paths.into_iter().map(Into::into).collect())
    }
}

impl Sources for PathSources {
    fn load(self) -> Result<Vec<SourceFile>> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            self.0.par_iter().map(read).collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            self.0.iter().map(read).collect()
        }
    }
}

/// In-memory sources (tests, embedding)
pub struct MemorySources(Vec<SourceFile>);

impl MemorySources {
    /// Create empty memory sources
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a file with content
    pub fn add(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.0.push(SourceFile::new(path, content));
        self
    }
}

impl Default for MemorySources {
    fn default() -> Self {
        Self::new()
    }
}

impl Sources for MemorySources {
    fn load(self) -> Result<Vec<SourceFile>> {
        Ok(self.0)
    }
}

/// Gitignore-aware directory walker collecting markdown files, sorted by path
#[cfg(feature = "walk")]
pub struct WalkSources {
    root: PathBuf,
    include: Vec<String>,
    exclude: Vec<String>,
}

#[cfg(feature = "walk")]
impl WalkSources {
    /// Create a walker for the given root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    /// Add include patterns (e.g., `["lectures/**/*.md"]`)
    pub fn include(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.include.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Add exclude patterns (e.g., `["drafts/**"]`)
    pub fn exclude(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }

    fn paths(&self) -> Vec<PathBuf> {
        let walker = ignore::WalkBuilder::new(&self.root)
            .follow_links(true)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .build();

        let mut paths: Vec<PathBuf> = walker
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::warn!(%err, "skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().is_some_and(is_supported_extension))
            .filter(|path| is_included(path, &self.root, &self.include))
            .filter(|path| !is_excluded(path, &self.root, &self.exclude))
            .collect();
        paths.sort();
        paths
    }
}

#[cfg(feature = "walk")]
impl Sources for WalkSources {
    fn load(self) -> Result<Vec<SourceFile>> {
        let paths = self.paths();
        tracing::debug!(root = %self.root.display(), files = paths.len(), "walked sources");
        PathSources::new(paths).load()
    }
}

#[cfg(feature = "walk")]
fn relative(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}

#[cfg(feature = "walk")]
fn is_included(path: &Path, root: &Path, patterns: &[String]) -> bool {
    if patterns.is_empty() {
        return true;
    }
    let relative = relative(path, root);
    patterns
        .iter()
        .any(|p| matches_glob(&relative, &p.replace('\\', "/")))
}

#[cfg(feature = "walk")]
fn is_excluded(path: &Path, root: &Path, patterns: &[String]) -> bool {
    let relative = relative(path, root);
    patterns
        .iter()
        .any(|p| matches_glob(&relative, &p.replace('\\', "/")))
}

#[cfg(feature = "walk")]
fn matches_glob(path: &str, pattern: &str) -> bool {
    // **/*.ext
    if let Some(ext) = pattern.strip_prefix("**/*.") {
        return path.ends_with(&format!(".{ext}"));
    }
    if let Some(rest) = pattern.strip_prefix("**/") {
        return matches_glob(path, rest);
    }
    // prefix/**
    if let Some(prefix) = pattern.strip_suffix("/**") {
        return path.starts_with(&format!("{prefix}/"));
    }
    // prefix/**/suffix
    if let Some((prefix, suffix)) = pattern.split_once("/**/") {
        let Some(after) = path.strip_prefix(&format!("{prefix}/")) else {
            return false;
        };
        return matches_glob(after, suffix) || after.split('/').skip(1).count() > 0 && {
            let tail = after.rsplit('/').next().unwrap_or(after);
            matches_glob(tail, suffix)
        };
    }
    if let Some(ext) = pattern.strip_prefix("*.") {
        return !path.contains('/') && path.ends_with(&format!(".{ext}"));
    }
    if !pattern.contains('*') {
        return path == pattern;
    }

    let parts: Vec<&str> = pattern.split('*').filter(|s| !s.is_empty()).collect();
    let mut remaining = path;
    for part in parts {
        match remaining.find(part) {
            Some(idx) => remaining = &remaining[idx + part.len()..],
            None => return false,
        }
    }
    true
}
