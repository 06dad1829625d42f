//! Outline extraction: per-language declaration scanners.
//!
//! Each supported language has its own submodule that turns raw source text
//! into a list of [`Declaration`]s (functions, methods, classes, structs,
//! traits, contracts) with names, lines and leading documentation.
//!
//! ## Architecture
//!
//! ```text
//! outline/
//! ├── mod.rs         - Extractor enum, registry, dispatch
//! ├── common.rs      - Declaration model, filters, scopes, comments
//! ├── fragments.rs   - Comment masking + brace fragmenting (C-family)
//! ├── python.rs      - Python (tree-sitter)
//! ├── typescript.rs  - JavaScript / TypeScript
//! ├── rust_lang.rs   - Rust
//! └── solidity.rs    - Solidity
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use cpai_lib::outline::ExtractorRegistry;
//!
//! let registry = ExtractorRegistry::default();
//! let decls = registry.extract_outline(Path::new("app.py"), "def run(): pass");
//! assert_eq!(decls[0].name, "run");
//! ```

pub mod common;
pub mod fragments;
pub mod python;
pub mod rust_lang;
pub mod solidity;
pub mod typescript;

use std::path::Path;

pub use common::{Declaration, DeclarationKind, OutlineError};
pub use python::PythonExtractor;
pub use rust_lang::RustExtractor;
pub use solidity::SolidityExtractor;
pub use typescript::JavaScriptExtractor;

// ============ Extractors ============

/// One variant per supported language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    JavaScript(JavaScriptExtractor),
    Python(PythonExtractor),
    Rust(RustExtractor),
    Solidity(SolidityExtractor),
}

impl Extractor {
    pub fn name(&self) -> &'static str {
        match self {
            Self::JavaScript(_) => "javascript",
            Self::Python(_) => "python",
            Self::Rust(_) => "rust",
            Self::Solidity(_) => "solidity",
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::JavaScript(_) => typescript::EXTENSIONS,
            Self::Python(_) => python::EXTENSIONS,
            Self::Rust(_) => rust_lang::EXTENSIONS,
            Self::Solidity(_) => solidity::EXTENSIONS,
        }
    }

    /// Line-comment prefix used when rendering leading comments
    pub fn comment_prefix(&self) -> &'static str {
        match self {
            Self::Python(_) => "#",
            _ => "//",
        }
    }

    /// True iff the file name ends (case-insensitively) with a supported extension
    pub fn supports(&self, path: &Path) -> bool {
        let Some(file_name) = path.file_name() else {
            return false;
        };
        let file_name = file_name.to_string_lossy().to_lowercase();
        self.extensions().iter().any(|ext| file_name.ends_with(ext))
    }

    /// Extract declarations; failures are logged and yield an empty list
    pub fn extract(&self, content: &str) -> Vec<Declaration> {
        if content.trim().is_empty() {
            return Vec::new();
        }
        match self.scan(content) {
            Ok(declarations) => declarations,
            Err(err) => {
                tracing::warn!(language = self.name(), "outline extraction failed: {}", err);
                Vec::new()
            }
        }
    }

    fn scan(&self, content: &str) -> Result<Vec<Declaration>, OutlineError> {
        common::ensure_text(content)?;
        match self {
            Self::JavaScript(extractor) => extractor.scan(content),
            Self::Python(extractor) => extractor.scan(content),
            Self::Rust(extractor) => extractor.scan(content),
            Self::Solidity(extractor) => extractor.scan(content),
        }
    }
}

// ============ Registry ============

/// Ordered extractor list with first-match selection
#[derive(Debug, Clone)]
pub struct ExtractorRegistry {
    extractors: Vec<Extractor>,
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self {
            extractors: vec![
                Extractor::JavaScript(JavaScriptExtractor),
                Extractor::Python(PythonExtractor),
                Extractor::Rust(RustExtractor),
                Extractor::Solidity(SolidityExtractor),
            ],
        }
    }
}

impl ExtractorRegistry {
    pub fn new(extractors: Vec<Extractor>) -> Self {
        Self { extractors }
    }

    pub fn extractor_for(&self, path: &Path) -> Option<&Extractor> {
        self.extractors.iter().find(|e| e.supports(path))
    }

    /// Declarations for a file; empty when no extractor supports it
    pub fn extract_outline(&self, path: &Path, content: &str) -> Vec<Declaration> {
        match self.extractor_for(path) {
            Some(extractor) => extractor.extract(content),
            None => {
                tracing::debug!(path = %path.display(), "no outline extractor");
                Vec::new()
            }
        }
    }
}
