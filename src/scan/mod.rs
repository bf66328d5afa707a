//! Source tree scanning
//!
//! This module provides:
//! - A depth-first directory walk with ignore rules and size/extension filters
//! - A file-count cap with early-stop reporting
//! - Content-hash based change detection

pub mod change;

pub use change::*;

use crate::config::IndexingConfig;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extensions never worth indexing as text
const BINARY_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "a", "o", "bin", "wasm", "class", "pyc", "png", "jpg", "jpeg",
    "gif", "bmp", "webp", "ico", "icns", "pdf", "zip", "tar", "gz", "bz2", "xz", "7z", "jar",
    "woff", "woff2", "ttf", "eot", "otf", "mp3", "mp4", "avi", "mov", "mkv", "sqlite", "db",
];

/// Limits and filters applied to a scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub ignore_patterns: Vec<String>,
    pub max_files: usize,
    pub max_file_size: u64,
    pub max_depth: usize,
}

impl ScanOptions {
    pub fn from_config(config: &IndexingConfig) -> Self {
        Self {
            ignore_patterns: config.ignore_patterns.clone(),
            max_files: config.max_files,
            max_file_size: config.max_file_size,
            max_depth: config.max_depth,
        }
    }
}

/// Walks a root directory and yields candidate file paths
pub struct TreeScanner {
    root: PathBuf,
    options: ScanOptions,
}

impl TreeScanner {
    pub fn new(root: impl Into<PathBuf>, options: ScanOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    /// Start a scan. The returned iterator is lazy, finite, and
    /// non-restartable; call `scan` again for a fresh walk.
    pub fn scan(&self) -> ScanIter {
        let walker = WalkBuilder::new(&self.root)
            .max_depth(Some(self.options.max_depth))
            .standard_filters(true)
            .build();

        ScanIter {
            root: self.root.clone(),
            options: self.options.clone(),
            walker,
            yielded: 0,
            skipped: 0,
            truncated: false,
        }
    }
}

/// Lazy sequence of relative paths produced by a single scan.
///
/// Transient filesystem errors on individual entries are swallowed and
/// counted as skipped; they never abort the walk.
pub struct ScanIter {
    root: PathBuf,
    options: ScanOptions,
    walker: ignore::Walk,
    yielded: usize,
    skipped: usize,
    truncated: bool,
}

impl ScanIter {
    /// Entries skipped for any reason (filters, size, read errors)
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Whether the walk stopped early at the file-count cap
    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

impl Iterator for ScanIter {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        if self.truncated {
            return None;
        }
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    self.skipped += 1;
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let rel = match entry.path().strip_prefix(&self.root) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => continue,
            };

            if is_ignored(&rel, &self.options.ignore_patterns) {
                self.skipped += 1;
                continue;
            }

            if has_binary_extension(&rel) {
                self.skipped += 1;
                continue;
            }

            match entry.metadata() {
                Ok(meta) if meta.len() > self.options.max_file_size => {
                    debug!("Skipping oversized file {:?} ({} bytes)", rel, meta.len());
                    self.skipped += 1;
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Skipping {:?}: {}", rel, e);
                    self.skipped += 1;
                    continue;
                }
            }

            // only an eligible file past the cap proves the walk was cut
            // short; a tree with exactly max_files drains cleanly
            if self.yielded >= self.options.max_files {
                self.truncated = true;
                debug!(
                    "Scan stopped early at {} files (cap reached)",
                    self.yielded
                );
                return None;
            }

            self.yielded += 1;
            return Some(rel);
        }
    }
}

/// Check a relative path against ignore patterns. Patterns are evaluated
/// against the full relative path, the bare filename, and every path
/// component; `*` and `?` wildcards are supported.
pub fn is_ignored(rel_path: &Path, patterns: &[String]) -> bool {
    let rel_str = rel_path.to_string_lossy();
    let file_name = rel_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    patterns.iter().any(|pattern| {
        if wildcard_match(pattern, &rel_str) || wildcard_match(pattern, &file_name) {
            return true;
        }
        rel_path
            .components()
            .any(|c| wildcard_match(pattern, &c.as_os_str().to_string_lossy()))
    })
}

fn has_binary_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| BINARY_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Glob-lite matching: `*` matches any run of characters, `?` a single one
fn wildcard_match(pattern: &str, text: &str) -> bool {
    fn inner(p: &[char], t: &[char]) -> bool {
        match (p.first(), t.first()) {
            (None, None) => true,
            (Some('*'), _) => {
                inner(&p[1..], t) || (!t.is_empty() && inner(p, &t[1..]))
            }
            (Some('?'), Some(_)) => inner(&p[1..], &t[1..]),
            (Some(pc), Some(tc)) if pc == tc => inner(&p[1..], &t[1..]),
            _ => false,
        }
    }
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    inner(&p, &t)
}
