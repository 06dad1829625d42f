//! File discovery: walk the inputs and keep the files worth sending.
//!
//! Walking uses `ignore` so `.gitignore`/`.ignore` rules and hidden-file
//! filtering apply (also outside git repositories). On top of that, files
//! are filtered by extension and by include/exclude glob patterns matched
//! against the path relative to the base directory (the working directory
//! for the CLI), whichever input directory is being walked.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use ignore::WalkBuilder;

use crate::config::{default_exclude_patterns, Config, CONFIG_FILE_PATTERNS};
use crate::error::{CpaiError, Result};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Command-line adjustments to the configured filters
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Drop the default exclude patterns
    pub include_all: bool,
    /// Drop only the config-file exclude patterns
    pub include_configs: bool,
    pub extra_excludes: Vec<String>,
}

// ============ Pattern Matching ============

/// Compiled include or exclude list
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
    match_all: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PlainPath {
    /// `src` matches `src` and everything below it
    Prefix,
    /// `tests` matches any path component named `tests`
    Component,
}

impl PatternSet {
    pub fn include<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        Self::compile(patterns, PlainPath::Prefix)
    }

    pub fn exclude<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        Self::compile(patterns, PlainPath::Component)
    }

    fn compile<S: AsRef<str>>(patterns: &[S], plain: PlainPath) -> Result<Self> {
        let mut set = Self {
            patterns: Vec::new(),
            match_all: false,
        };
        for raw in patterns {
            let raw = raw.as_ref().trim();
            let trimmed = raw.trim_start_matches("./").trim_end_matches('/');
            if trimmed.is_empty() || trimmed == "." {
                if plain == PlainPath::Prefix {
                    set.match_all = true;
                }
                continue;
            }

            let expanded = if is_glob(trimmed) {
                vec![trimmed.to_string()]
            } else {
                match plain {
                    PlainPath::Prefix => vec![trimmed.to_string(), format!("{trimmed}/**")],
                    PlainPath::Component => vec![format!("**/{trimmed}"), format!("**/{trimmed}/**")],
                }
            };
            for pattern in expanded {
                let compiled = Pattern::new(&pattern).map_err(|source| CpaiError::InvalidPattern {
                    pattern: raw.to_string(),
                    source,
                })?;
                set.patterns.push(compiled);
            }
        }
        Ok(set)
    }

    /// Match a `/`-separated relative path
    pub fn matches(&self, relative: &str) -> bool {
        self.match_all || self.patterns.iter().any(|p| p.matches_with(relative, MATCH_OPTIONS))
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

// ============ Discovery ============

/// Extension + include + exclude filter for walked files
#[derive(Debug, Clone)]
pub struct FileFilter {
    extensions: Vec<String>,
    include: PatternSet,
    exclude: PatternSet,
}

impl FileFilter {
    pub fn new(config: &Config, options: &ScanOptions) -> Result<Self> {
        let defaults = default_exclude_patterns();
        let excludes: Vec<&str> = config
            .exclude
            .iter()
            .map(String::as_str)
            .filter(|p| !(options.include_all && defaults.iter().any(|d| d == *p)))
            .filter(|p| !(options.include_configs && CONFIG_FILE_PATTERNS.contains(p)))
            .chain(options.extra_excludes.iter().map(String::as_str))
            .collect();

        Ok(Self {
            extensions: config
                .file_extensions
                .iter()
                .map(|e| normalize_extension(e))
                .collect(),
            include: PatternSet::include(config.include.as_slice())?,
            exclude: PatternSet::exclude(excludes.as_slice())?,
        })
    }

    pub fn accepts(&self, relative: &str) -> bool {
        self.has_extension(relative) && self.include.matches(relative) && !self.exclude.matches(relative)
    }

    fn has_extension(&self, relative: &str) -> bool {
        let Some(ext) = Path::new(relative).extension() else {
            return false;
        };
        let ext = format!(".{}", ext.to_string_lossy().to_lowercase());
        self.extensions.iter().any(|e| *e == ext)
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

/// `/`-separated path of `path` relative to `root`; paths outside `root`
/// are returned whole
pub fn relative_path(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) => relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.to_string_lossy().replace('\\', "/"),
    }
}

/// Resolve inputs to an absolute, de-duplicated, sorted file list.
///
/// Directories are walked and filtered; files named explicitly are always kept.
pub fn collect_files(inputs: &[PathBuf], base: &Path, config: &Config, options: &ScanOptions) -> Result<Vec<PathBuf>> {
    let filter = FileFilter::new(config, options)?;
    let base = fs::canonicalize(base).unwrap_or_else(|_| base.to_path_buf());
    let roots: Vec<PathBuf> = if inputs.is_empty() {
        vec![base.clone()]
    } else {
        inputs.iter().map(|p| if p.is_absolute() { p.clone() } else { base.join(p) }).collect()
    };

    let mut files = BTreeSet::new();
    for root in roots {
        if root.is_file() {
            let path = fs::canonicalize(&root).map_err(|e| CpaiError::io(&root, e))?;
            files.insert(path);
        } else if root.is_dir() {
            let root = fs::canonicalize(&root).map_err(|e| CpaiError::io(&root, e))?;
            // Patterns are relative to the base unless the root lies outside it
            let anchor = if root.starts_with(&base) { base.as_path() } else { root.as_path() };
            walk_directory(&root, anchor, &filter, &mut files);
        } else {
            tracing::warn!("skipping {}: not a file or directory", root.display());
        }
    }

    tracing::debug!("found {} files", files.len());
    Ok(files.into_iter().collect())
}

fn walk_directory(root: &Path, anchor: &Path, filter: &FileFilter, files: &mut BTreeSet<PathBuf>) {
    let walker = WalkBuilder::new(root)
        .standard_filters(true)
        .require_git(false)
        .follow_links(true)
        .build();

    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!("skipping unreadable entry: {}", err);
                continue;
            }
        };
        let path = entry.path();
        // Follows symlinks; broken links are not files
        if !path.is_file() {
            continue;
        }
        let relative = relative_path(path, anchor);
        if filter.accepts(&relative) {
            files.insert(path.to_path_buf());
        } else {
            tracing::trace!("filtered out {}", relative);
        }
    }
}
