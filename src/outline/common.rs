//! Common types and utilities shared across all language extractors.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

// ============ Threshold Constants ============

pub const MAX_COMMENT_LEN: usize = 200;
pub const MAX_COMMENT_LINES: usize = 50;
pub const MAX_PARAM_SPAN: usize = 4096;

// ============ Errors ============

/// Internal extraction failures. These never leave [`super::Extractor::extract`].
#[derive(Debug, Error)]
pub enum OutlineError {
    #[error("content looks binary (NUL byte at offset {0})")]
    Binary(usize),
    #[error("failed to load grammar: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),
    #[error("parser returned no tree")]
    NoTree,
    #[error("masked source is not valid UTF-8: {0}")]
    Masking(#[from] std::string::FromUtf8Error),
}

/// Reject content that is clearly not source text.
pub fn ensure_text(content: &str) -> Result<(), OutlineError> {
    match content.bytes().position(|b| b == 0) {
        Some(offset) => Err(OutlineError::Binary(offset)),
        None => Ok(()),
    }
}

// ============ Declaration Model ============

/// Kind of a recognized declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Function,
    Method,
    Class,
    Struct,
    Enum,
    Trait,
    Contract,
    Interface,
}

impl DeclarationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Trait => "trait",
            Self::Contract => "contract",
            Self::Interface => "interface",
        }
    }

    /// Container kinds render without a parameter list
    pub fn is_container(&self) -> bool {
        !matches!(self, Self::Function | Self::Method)
    }
}

impl std::fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recognized code unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    /// Fully qualified dotted name (`Outer.Inner.method`)
    pub name: String,
    pub kind: DeclarationKind,
    /// 1-based line of the declaration keyword
    pub line: usize,
    pub parameters: Option<String>,
    pub leading_comment: Option<String>,
    pub is_exported: bool,
    pub is_default_export: bool,
}

impl Declaration {
    pub fn new(name: impl Into<String>, kind: DeclarationKind, line: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            line,
            parameters: None,
            leading_comment: None,
            is_exported: false,
            is_default_export: false,
        }
    }

    pub fn with_parameters(mut self, parameters: Option<String>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.leading_comment = comment;
        self
    }

    pub fn exported(mut self, is_exported: bool, is_default: bool) -> Self {
        self.is_exported = is_exported || is_default;
        self.is_default_export = is_default;
        self
    }

    /// The bare identifier (last segment of the qualified name)
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Names of the enclosing containers, outermost first
    pub fn container_path(&self) -> Vec<&str> {
        let mut segments: Vec<&str> = self.name.split('.').collect();
        segments.pop();
        segments
    }

    pub fn export_prefix(&self) -> &'static str {
        if self.is_default_export {
            "export default "
        } else if self.is_exported {
            "export "
        } else {
            ""
        }
    }

    /// Label used by tree rendering: `name(params)`, bare name for containers
    pub fn label(&self) -> String {
        let mut label = String::from(self.export_prefix());
        label.push_str(self.short_name());
        if !self.kind.is_container() {
            label.push('(');
            if let Some(params) = &self.parameters {
                label.push_str(params);
            }
            label.push(')');
        }
        label
    }
}

// ============ Name Filtering ============

/// Per-language signal-to-noise filter applied to bare identifiers
#[derive(Debug, Clone, Copy)]
pub struct NameFilter {
    pub stoplist: &'static [&'static str],
    /// Underscore-prefixed names that are kept anyway
    pub allowed_private: &'static [&'static str],
}

impl NameFilter {
    pub const fn new(stoplist: &'static [&'static str]) -> Self {
        Self {
            stoplist,
            allowed_private: &[],
        }
    }

    pub fn accepts(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        if name.starts_with('_') && !self.allowed_private.contains(&name) {
            return false;
        }
        !self.stoplist.contains(&name)
    }
}

// ============ Per-call Collection ============

/// Ordered declarations plus the set of qualified names already recorded.
/// Created per `extract` call and dropped with it.
#[derive(Debug, Default)]
pub struct DeclarationSet {
    declarations: Vec<Declaration>,
    seen: HashSet<String>,
}

impl DeclarationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a declaration; returns false when the name was already seen
    pub fn insert(&mut self, declaration: Declaration) -> bool {
        if !self.seen.insert(declaration.name.clone()) {
            return false;
        }
        self.declarations.push(declaration);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Declaration> {
        self.declarations.iter_mut()
    }

    pub fn into_vec(self) -> Vec<Declaration> {
        self.declarations
    }
}

// ============ Scope Tracking ============

#[derive(Debug, Clone)]
enum Scope {
    /// class / impl / trait / contract body
    Container { name: String, depth: usize },
    /// function or method body
    Body { depth: usize },
}

impl Scope {
    fn depth(&self) -> usize {
        match self {
            Self::Container { depth, .. } | Self::Body { depth } => *depth,
        }
    }
}

/// Scope a matched declaration claims if its fragment ends with `{`
#[derive(Debug, Clone, PartialEq)]
pub enum Opens {
    Container(String),
    Body,
}

/// Enclosing scopes of the fragment being scanned, keyed by the brace depth
/// inside each scope.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close every scope whose body is deeper than `depth`
    pub fn unwind(&mut self, depth: usize) {
        while self.scopes.last().is_some_and(|s| s.depth() > depth) {
            self.scopes.pop();
        }
    }

    /// Open the scope claimed by a fragment's `{`
    pub fn open(&mut self, opens: Opens, depth: usize) {
        match opens {
            Opens::Container(name) => self.push_container(name, depth),
            Opens::Body => self.push_body(depth),
        }
    }

    pub fn push_container(&mut self, name: impl Into<String>, depth: usize) {
        self.scopes.push(Scope::Container {
            name: name.into(),
            depth,
        });
    }

    pub fn push_body(&mut self, depth: usize) {
        self.scopes.push(Scope::Body { depth });
    }

    /// True inside any function body
    pub fn in_body(&self) -> bool {
        self.scopes.iter().any(|s| matches!(s, Scope::Body { .. }))
    }

    /// Name of the container whose body is exactly at `depth`
    pub fn direct_container(&self, depth: usize) -> Option<&str> {
        match self.scopes.last() {
            Some(Scope::Container { name, depth: d }) if *d == depth => Some(name),
            _ => None,
        }
    }

    /// Prefix `name` with every open container name
    pub fn qualify(&self, name: &str) -> String {
        qualify(
            self.scopes.iter().filter_map(|s| match s {
                Scope::Container { name, .. } => Some(name.as_str()),
                Scope::Body { .. } => None,
            }),
            name,
        )
    }
}

/// Join container names and a leaf name with dots
pub fn qualify<'a>(containers: impl IntoIterator<Item = &'a str>, name: &str) -> String {
    let mut out = String::new();
    for container in containers {
        if container.is_empty() {
            continue;
        }
        out.push_str(container);
        out.push('.');
    }
    out.push_str(name);
    out
}

// ============ Text Utilities ============

/// Truncate a line to a maximum length, adding "..." if truncated
pub fn truncate_line(line: &str, max_len: usize) -> String {
    let mut out = String::new();
    let mut count = 0;
    let mut truncated = false;
    for ch in line.chars() {
        if count >= max_len {
            truncated = true;
            break;
        }
        out.push(ch);
        count += 1;
    }
    if truncated {
        out.push_str("...");
    }
    out
}

/// Collapse every whitespace run to a single space
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize raw parameter text; `None` when nothing is left
pub fn normalize_parameters(raw: &str) -> Option<String> {
    let joined = normalize_whitespace(raw);
    let cleaned = joined.trim().trim_end_matches(',').trim_end();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

fn finish_comment(pieces: &[String]) -> Option<String> {
    let text = normalize_whitespace(&pieces.join(" "));
    if text.is_empty() {
        None
    } else {
        Some(truncate_line(&text, MAX_COMMENT_LEN))
    }
}

/// First meaningful line of a Python docstring literal, quotes stripped
pub fn trim_docstring(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let unprefixed = trimmed.trim_start_matches(['r', 'R', 'u', 'U']);
    let inner = if unprefixed.len() >= 6
        && ((unprefixed.starts_with("\"\"\"") && unprefixed.ends_with("\"\"\""))
            || (unprefixed.starts_with("'''") && unprefixed.ends_with("'''")))
    {
        &unprefixed[3..unprefixed.len() - 3]
    } else if unprefixed.len() >= 2
        && ((unprefixed.starts_with('"') && unprefixed.ends_with('"'))
            || (unprefixed.starts_with('\'') && unprefixed.ends_with('\'')))
    {
        &unprefixed[1..unprefixed.len() - 1]
    } else {
        return None;
    };

    inner
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| truncate_line(&normalize_whitespace(line), MAX_COMMENT_LEN))
}

// ============ Leading Comments ============

/// How comments above a declaration are associated with it
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommentStyle {
    /// `/* */` block or contiguous `//` run (JS/TS, Solidity)
    CFamily,
    /// `///` run, else a trailing comment on the preceding line (Rust)
    RustDoc,
}

static TRAILING_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?://[^\n]*|/\*(?:[^*]|\*[^/])*\*/)\s*$").unwrap());

/// Find the documentation comment directly above `line` (1-based).
///
/// Lines starting with one of `skip_prefixes` (decorators, attributes) are
/// stepped over; a blank line ends the search.
pub fn leading_comment(
    lines: &[&str],
    line: usize,
    style: CommentStyle,
    skip_prefixes: &[&str],
) -> Option<String> {
    let mut idx = line.checked_sub(1)?;
    while idx > 0 {
        let above = lines.get(idx - 1)?.trim();
        if !skip_prefixes.iter().any(|p| above.starts_with(p)) {
            break;
        }
        idx -= 1;
    }
    if idx == 0 {
        return None;
    }

    let prev = lines.get(idx - 1)?.trim();
    if prev.is_empty() {
        return None;
    }

    match style {
        CommentStyle::RustDoc => {
            if prev.starts_with("///") {
                return line_comment_run(lines, idx, |l| l.starts_with("///"));
            }
            if prev.ends_with("*/") {
                return block_comment_above(lines, idx);
            }
            let found = TRAILING_COMMENT.find(prev)?;
            finish_comment(&[strip_comment_markers(found.as_str())])
        }
        CommentStyle::CFamily => {
            if prev.ends_with("*/") {
                return block_comment_above(lines, idx);
            }
            if prev.starts_with("//") {
                return line_comment_run(lines, idx, |l| l.starts_with("//"));
            }
            None
        }
    }
}

/// Contiguous run of line comments ending on line `end` (exclusive index)
fn line_comment_run(lines: &[&str], end: usize, is_member: impl Fn(&str) -> bool) -> Option<String> {
    let mut start = end;
    while start > 0 && end - start < MAX_COMMENT_LINES {
        let candidate = lines[start - 1].trim();
        if !is_member(candidate) {
            break;
        }
        start -= 1;
    }
    let pieces: Vec<String> = lines[start..end]
        .iter()
        .map(|l| strip_comment_markers(l.trim()))
        .collect();
    finish_comment(&pieces)
}

/// `/* ... */` block whose closing line is `end - 1`
fn block_comment_above(lines: &[&str], end: usize) -> Option<String> {
    let mut start = end - 1;
    let floor = end.saturating_sub(MAX_COMMENT_LINES);
    while !lines[start].contains("/*") {
        if start == floor || start == 0 {
            return None;
        }
        start -= 1;
    }

    // Only the comment part of the opening line counts
    let mut pieces = Vec::new();
    for (offset, raw) in lines[start..end].iter().enumerate() {
        let mut text = raw.trim();
        if offset == 0 {
            if let Some(pos) = text.find("/*") {
                text = &text[pos..];
            }
        }
        pieces.push(strip_comment_markers(text));
    }
    finish_comment(&pieces)
}

/// Remove comment delimiters and leading `*` gutters
pub fn strip_comment_markers(text: &str) -> String {
    let mut t = text.trim();
    for prefix in ["///", "//!", "//", "/**", "/*!", "/*"] {
        if let Some(rest) = t.strip_prefix(prefix) {
            t = rest;
            break;
        }
    }
    if let Some(rest) = t.trim_end().strip_suffix("*/") {
        t = rest;
    }
    let t = t.trim();
    t.strip_prefix('*').unwrap_or(t).trim().to_string()
}
