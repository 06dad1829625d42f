//! cpai: concatenate project source files into one Markdown document for AI
//! assistants, either in full or as a declaration outline.
//!
//! Pipeline: [`scan`] finds files, [`process_files`] reads them and extracts
//! outlines in parallel, [`assemble`] renders the document and [`output`]
//! delivers it.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

pub mod assemble;
pub mod config;
pub mod error;
pub mod outline;
pub mod output;
pub mod scan;
pub mod tree;

#[cfg(test)]
mod outline_tests;

pub use assemble::OutputMode;
pub use config::Config;
pub use error::{CpaiError, Result};
pub use outline::{Declaration, DeclarationKind, ExtractorRegistry};
pub use scan::ScanOptions;

/// One processed input file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    pub path: PathBuf,
    /// Relative to the run's base directory, `/`-separated
    pub relative_path: String,
    /// `None` when the file could not be read as text
    pub content: Option<String>,
    pub declarations: Vec<Declaration>,
}

/// Read a file as UTF-8 text. Failures are logged and yield `None`.
fn read_file_content(path: &Path) -> Option<String> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::debug!("failed to read {}: {}", path.display(), err);
            return None;
        }
    };
    match String::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(err) => {
            tracing::debug!("{} is not valid UTF-8: {}", path.display(), err);
            None
        }
    }
}

/// Read every file and, in outline mode, extract its declarations.
/// Entries come back in input order.
pub fn process_files(paths: &[PathBuf], base: &Path, mode: OutputMode) -> Vec<FileEntry> {
    let registry = ExtractorRegistry::default();
    paths
        .par_iter()
        .map(|path| {
            let content = read_file_content(path);
            let declarations = match (&content, mode) {
                (Some(text), OutputMode::Outline) => registry.extract_outline(path, text),
                _ => Vec::new(),
            };
            FileEntry {
                path: path.clone(),
                relative_path: scan::relative_path(path, base),
                content,
                declarations,
            }
        })
        .collect()
}

/// Render processed entries into the final document
pub fn build_document(entries: &[FileEntry], mode: OutputMode) -> String {
    assemble::assemble(entries, mode, &ExtractorRegistry::default())
}

/// Everything one invocation needs
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Files or directories; empty means `base`
    pub inputs: Vec<PathBuf>,
    pub base: PathBuf,
    pub mode: OutputMode,
    pub scan: ScanOptions,
    pub config: Config,
}

/// What a run produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub files: usize,
    pub characters: usize,
    pub tokens: Option<usize>,
}

/// Discover, process, assemble and deliver
pub fn run(options: &RunOptions) -> Result<RunSummary> {
    let base = fs::canonicalize(&options.base).map_err(|e| CpaiError::io(&options.base, e))?;
    let files = scan::collect_files(&options.inputs, &base, &options.config, &options.scan)?;
    if files.is_empty() {
        return Err(CpaiError::NoFiles);
    }
    tracing::info!("processing {} files", files.len());

    let entries = process_files(&files, &base, options.mode);
    let document = build_document(&entries, options.mode);
    output::write_output(&document, &options.config)?;

    let summary = RunSummary {
        files: entries.len(),
        characters: document.chars().count(),
        tokens: output::count_tokens(&document),
    };
    match summary.tokens {
        Some(tokens) => tracing::info!(
            "{} files, {} characters, {} tokens",
            summary.files,
            summary.characters,
            tokens
        ),
        None => tracing::info!("{} files, {} characters", summary.files, summary.characters),
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_process_files_reads_and_extracts() {
        let dir = tempfile::tempdir().unwrap();
        let py = write(dir.path(), "pkg/app.py", b"def foo(a, b):\n    pass\n");
        let bin = write(dir.path(), "data.rs", &[0xff, 0xfe, 0x00]);

        let entries = process_files(&[py.clone(), bin], dir.path(), OutputMode::Outline);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, py);
        assert_eq!(entries[0].relative_path, "pkg/app.py");
        assert_eq!(entries[0].declarations.len(), 1);
        assert_eq!(entries[0].declarations[0].name, "foo");
        assert!(entries[1].content.is_none());
        assert!(entries[1].declarations.is_empty());

        let content = process_files(&[py], dir.path(), OutputMode::Content);
        assert!(content[0].declarations.is_empty());
    }

    #[test]
    fn test_run_writes_output_file() {
        let dir = tempfile::Builder::new().prefix("cpai-run").tempdir().unwrap();
        write(dir.path(), "src/lib.rs", b"pub fn hello() {}\n");
        write(dir.path(), "node_modules/x/index.js", b"function skipped() {}\n");

        let out = dir.path().join("out.md");
        let options = RunOptions {
            base: dir.path().to_path_buf(),
            mode: OutputMode::Outline,
            config: Config {
                output_file: Some(out.clone()),
                use_clipboard: false,
                ..Config::default()
            },
            ..RunOptions::default()
        };
        let summary = run(&options).unwrap();
        assert_eq!(summary.files, 1);

        let document = fs::read_to_string(out).unwrap();
        assert!(document.starts_with("## Directory Structure\n```\n└── src\n    └── lib.rs\n        └── hello()\n```\n\n"));
        assert!(document.contains("## src/lib.rs\n```rust\nfunction hello()\n```\n"));
        assert_eq!(summary.characters, document.chars().count());
    }

    #[test]
    fn test_run_without_files() {
        let dir = tempfile::Builder::new().prefix("cpai-empty").tempdir().unwrap();
        let options = RunOptions {
            base: dir.path().to_path_buf(),
            config: Config {
                use_clipboard: false,
                ..Config::default()
            },
            ..RunOptions::default()
        };
        let err = run(&options).unwrap_err();
        assert!(err.is_warning());
    }
}
