//! Final Markdown document: directory tree header plus one fenced section
//! per file (full content or outline).

use std::collections::BTreeMap;
use std::path::Path;

use crate::outline::{Declaration, ExtractorRegistry};
use crate::tree::{render_structure, render_tree};
use crate::FileEntry;

/// What each file section contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Full file content
    #[default]
    Content,
    /// Declaration outline only
    Outline,
}

/// Fence language tag for a path; unknown extensions map to themselves
pub fn language_tag(path: &str) -> String {
    let ext = Path::new(path)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let tag = match ext.as_str() {
        "py" | "pyw" | "pyi" => "python",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "jsx",
        "ts" | "mts" | "cts" => "typescript",
        "tsx" => "tsx",
        "rs" => "rust",
        "sol" => "solidity",
        "go" => "go",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" => "cpp",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "kt" | "kts" => "kotlin",
        "scala" => "scala",
        "sh" | "bash" => "bash",
        "md" => "markdown",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "css" => "css",
        "scss" => "scss",
        "html" | "htm" => "html",
        "svelte" => "svelte",
        other => return other.to_string(),
    };
    tag.to_string()
}

/// One line per declaration, indented by nesting depth
pub fn render_outline(declarations: &[Declaration], comment_prefix: &str) -> String {
    let mut lines = Vec::with_capacity(declarations.len());
    for decl in declarations {
        let indent = "    ".repeat(decl.container_path().len());
        if let Some(comment) = &decl.leading_comment {
            lines.push(format!("{indent}{comment_prefix} {comment}"));
        }
        let mut line = format!("{indent}{}{} {}", decl.export_prefix(), decl.kind, decl.short_name());
        if !decl.kind.is_container() {
            line.push('(');
            if let Some(params) = &decl.parameters {
                line.push_str(params);
            }
            line.push(')');
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// Assemble the document for already-processed entries
pub fn assemble(entries: &[FileEntry], mode: OutputMode, registry: &ExtractorRegistry) -> String {
    let tree = match mode {
        OutputMode::Content => render_structure(entries.iter().map(|e| e.relative_path.as_str())),
        OutputMode::Outline => {
            let outlines: BTreeMap<&str, Vec<Declaration>> = entries
                .iter()
                .map(|e| (e.relative_path.as_str(), e.declarations.clone()))
                .collect();
            render_tree(outlines)
        }
    };

    let mut out = String::from("## Directory Structure\n```\n");
    out.push_str(&tree);
    out.push_str("```\n\n");

    for entry in entries {
        let body = match mode {
            OutputMode::Content => match &entry.content {
                Some(content) => content.clone(),
                None => continue,
            },
            OutputMode::Outline => {
                if entry.content.is_none() || entry.declarations.is_empty() {
                    continue;
                }
                let prefix = registry
                    .extractor_for(&entry.path)
                    .map_or("//", |e| e.comment_prefix());
                render_outline(&entry.declarations, prefix)
            }
        };

        out.push_str("## ");
        out.push_str(&entry.relative_path);
        out.push_str("\n```");
        out.push_str(&language_tag(&entry.relative_path));
        out.push('\n');
        out.push_str(&body);
        out.push_str("\n```\n\n");
    }

    out
}
