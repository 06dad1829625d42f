//! `cpai.config.json` loading and validation.
//!
//! The file is optional. Every field is validated on its own: a field with
//! the wrong type falls back to its default with a warning, the rest of the
//! file still applies.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

// ============ Constants ============

pub const CONFIG_FILE_NAME: &str = "cpai.config.json";
pub const DEFAULT_OUTPUT_FILE: &str = "output-cpai.md";
pub const DEFAULT_CHUNK_SIZE: usize = 90_000;

/// Project configuration files, dropped from the excludes by `--configs`
pub const CONFIG_FILE_PATTERNS: &[&str] = &[
    "**/package.json",
    "**/package-lock.json",
    "**/yarn.lock",
    "**/tsconfig.json",
    "**/jsconfig.json",
    "**/*.config.js",
    "**/pyproject.toml",
    "**/setup.py",
    "**/setup.cfg",
    "**/requirements.txt",
    "**/Pipfile",
    "**/Pipfile.lock",
    "**/bower.json",
    "**/composer.json",
    "**/composer.lock",
];

const GENERATED_AND_VENDOR_PATTERNS: &[&str] = &[
    // Build and cache
    "**/build/**",
    "**/dist/**",
    "**/__pycache__/**",
    "**/.cache/**",
    "**/coverage/**",
    "**/.next/**",
    "**/out/**",
    "**/.nuxt/**",
    "**/.output/**",
    "**/*.egg-info/**",
    "**/target/**",
    // Dependencies
    "**/node_modules/**",
    "**/venv/**",
    "**/virtualenv/**",
    "**/env/**",
    "**/.env/**",
    "**/.venv/**",
    // Tests
    "**/test/**",
    "**/tests/**",
    "**/__tests__/**",
    "**/*.test.*",
    "**/*.spec.*",
    // IDE and OS
    "**/.idea/**",
    "**/.vscode/**",
    "**/.DS_Store",
    // Version control
    "**/.git/**",
    "**/.svn/**",
    "**/.hg/**",
    // Logs
    "**/*.log",
    "**/npm-debug.log*",
    "**/yarn-debug.log*",
    "**/yarn-error.log*",
    // Dotfiles
    "**/.env",
    "**/.envrc",
    "**/.env.*",
    "**/.python-version",
    "**/.ruby-version",
    "**/.node-version",
    // Minified and maps
    "**/*.min.js",
    "**/*.min.css",
    "**/*.map",
    // Binary and media
    "**/*.jpg",
    "**/*.jpeg",
    "**/*.png",
    "**/*.gif",
    "**/*.ico",
    "**/*.pdf",
    "**/*.zip",
    "**/*.tar.gz",
    "**/*.tgz",
    "**/*.woff",
    "**/*.woff2",
    "**/*.ttf",
    "**/*.eot",
    "**/*.mp3",
    "**/*.mp4",
    "**/*.mov",
    "**/*.avi",
];

pub const DEFAULT_FILE_EXTENSIONS: &[&str] = &[
    ".ts", ".js", ".py", ".rs", ".sol", ".go", ".jsx", ".tsx", ".css", ".scss", ".svelte",
    ".html", ".java", ".c", ".cpp", ".h", ".hpp", ".rb", ".php", ".swift", ".kt", ".scala",
    ".sh", ".bash", ".md", ".json", ".yaml", ".yml", ".toml",
];

/// Every default exclude pattern, generated/vendor group first
pub fn default_exclude_patterns() -> Vec<String> {
    GENERATED_AND_VENDOR_PATTERNS
        .iter()
        .chain(CONFIG_FILE_PATTERNS)
        .map(|p| p.to_string())
        .collect()
}

// ============ Config ============

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// `None` means no output file
    pub output_file: Option<PathBuf>,
    pub use_clipboard: bool,
    pub file_extensions: Vec<String>,
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include: vec![".".to_string()],
            exclude: default_exclude_patterns(),
            output_file: None,
            use_clipboard: true,
            file_extensions: DEFAULT_FILE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// On-disk shape; values are checked one by one
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    include: Option<Value>,
    exclude: Option<Value>,
    output_file: Option<Value>,
    use_pastebin: Option<Value>,
    file_extensions: Option<Value>,
    chunk_size: Option<Value>,
}

impl Config {
    /// Load `cpai.config.json` from `dir`, falling back to defaults
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE_NAME);
        match fs::read_to_string(&path) {
            Ok(text) => Self::from_json(&text),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!("no {} found, using defaults", CONFIG_FILE_NAME);
                Self::default()
            }
            Err(err) => {
                tracing::warn!("failed to read {}: {}; using defaults", path.display(), err);
                Self::default()
            }
        }
    }

    pub fn from_json(text: &str) -> Self {
        let raw: RawConfig = match serde_json::from_str(text) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!("invalid {}: {}; using defaults", CONFIG_FILE_NAME, err);
                return Self::default();
            }
        };

        let mut config = Self::default();
        if let Some(value) = raw.include {
            match string_list(&value) {
                Some(list) => config.include = list,
                None => invalid_field("include"),
            }
        }
        if let Some(value) = raw.exclude {
            match string_list(&value) {
                Some(list) => config.exclude = list,
                None => invalid_field("exclude"),
            }
        }
        if let Some(value) = raw.output_file {
            match value {
                Value::Bool(true) => config.output_file = Some(PathBuf::from(DEFAULT_OUTPUT_FILE)),
                Value::Bool(false) => config.output_file = None,
                Value::String(name) if !name.is_empty() => config.output_file = Some(PathBuf::from(name)),
                _ => invalid_field("outputFile"),
            }
        }
        if let Some(value) = raw.use_pastebin {
            match value.as_bool() {
                Some(flag) => config.use_clipboard = flag,
                None => invalid_field("usePastebin"),
            }
        }
        if let Some(value) = raw.file_extensions {
            match string_list(&value) {
                Some(list) => config.file_extensions = list,
                None => invalid_field("fileExtensions"),
            }
        }
        if let Some(value) = raw.chunk_size {
            match value.as_u64().filter(|&n| n > 0) {
                Some(size) => config.chunk_size = size as usize,
                None => invalid_field("chunkSize"),
            }
        }
        config
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(String::from))
        .collect()
}

fn invalid_field(name: &str) {
    tracing::warn!("invalid '{}' in {}, using default", name, CONFIG_FILE_NAME);
}
