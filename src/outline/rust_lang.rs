//! Rust outline extraction.
//!
//! Records `struct`, `enum`, `trait` and `fn` items. `impl` and `trait`
//! blocks open a container so their functions become `Type.method`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::common::{
    leading_comment, normalize_parameters, CommentStyle, Declaration, DeclarationKind,
    DeclarationSet, NameFilter, Opens, OutlineError, ScopeStack,
};
use super::fragments::{LexOptions, MaskedSource, Terminator};

pub const EXTENSIONS: &[&str] = &[".rs"];

const FILTER: NameFilter = NameFilter::new(&[
    "new", "default", "clone", "drop", "as_ref", "as_mut", "from", "into", "try_from", "try_into",
]);

static TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:pub(?:\s*\([^)]*\))?\s+)?(?:unsafe\s+)?(?:auto\s+)?(struct|enum|trait)\s+([A-Za-z_]\w*)")
        .unwrap()
});

static IMPL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:default\s+)?(?:unsafe\s+)?impl\b").unwrap());

static FN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?:pub(?:\s*\([^)]*\))?\s+)?(?:default\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+(?:"[^"]*"\s+)?)?fn\s+([A-Za-z_]\w*)\s*[(<]"#,
    )
    .unwrap()
});

static FOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\sfor\s").unwrap());

/// Extractor for Rust sources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RustExtractor;

impl RustExtractor {
    pub fn scan(&self, content: &str) -> Result<Vec<Declaration>, OutlineError> {
        let source = MaskedSource::scan(content, LexOptions::RUST)?;
        let lines: Vec<&str> = content.lines().collect();
        let mut scopes = ScopeStack::new();
        let mut found = DeclarationSet::new();

        for fragment in &source.fragments {
            scopes.unwind(fragment.depth);
            if scopes.in_body() {
                continue;
            }

            let mut opens = None;
            for head in source.heads(fragment) {
                let text = &source.masked[head..fragment.end];
                let line = source.line_of(head);

                if IMPL_RE.is_match(text) {
                    opens = impl_target(text).map(Opens::Container);
                    continue;
                }

                if let Some(caps) = TYPE_RE.captures(text) {
                    let (Some(keyword), Some(name)) = (caps.get(1), caps.get(2)) else {
                        continue;
                    };
                    let (kind, scope) = match keyword.as_str() {
                        "struct" => (DeclarationKind::Struct, None),
                        "enum" => (DeclarationKind::Enum, None),
                        _ => (
                            DeclarationKind::Trait,
                            Some(Opens::Container(name.as_str().to_string())),
                        ),
                    };
                    if FILTER.accepts(name.as_str()) {
                        let decl = Declaration::new(scopes.qualify(name.as_str()), kind, line);
                        record(&mut found, decl, &lines);
                    }
                    opens = scope;
                    continue;
                }

                if let Some(caps) = FN_RE.captures(text) {
                    let Some(name) = caps.get(1) else {
                        continue;
                    };
                    opens = Some(Opens::Body);
                    if !FILTER.accepts(name.as_str()) {
                        continue;
                    }
                    let kind = if scopes.direct_container(fragment.depth).is_some() {
                        DeclarationKind::Method
                    } else {
                        DeclarationKind::Function
                    };
                    let params = text[name.end()..]
                        .find('(')
                        .and_then(|rel| source.balanced_parens(head + name.end() + rel))
                        .and_then(normalize_parameters);
                    let decl = Declaration::new(scopes.qualify(name.as_str()), kind, line)
                        .with_parameters(params);
                    record(&mut found, decl, &lines);
                }
            }

            if fragment.terminator == Terminator::Open {
                if let Some(scope) = opens {
                    scopes.open(scope, fragment.depth_after);
                }
            }
        }

        Ok(found.into_vec())
    }
}

fn record(found: &mut DeclarationSet, decl: Declaration, lines: &[&str]) {
    if found.contains(&decl.name) {
        return;
    }
    let comment = leading_comment(lines, decl.line, CommentStyle::RustDoc, &["#["]);
    found.insert(decl.with_comment(comment));
}

/// Type an `impl` header attaches to: `impl<T> Trait for Vec<T>` gives `Vec`
fn impl_target(header: &str) -> Option<String> {
    let rest = header.trim_start();
    let rest = rest.strip_prefix("default").map_or(rest, str::trim_start);
    let rest = rest.strip_prefix("unsafe").map_or(rest, str::trim_start);
    let rest = rest.strip_prefix("impl")?;
    let mut rest = skip_generics(rest.trim_start());

    // Drop the where clause and the opening brace
    if let Some(pos) = rest.find('{') {
        rest = &rest[..pos];
    }
    if let Some(pos) = rest.find(" where") {
        rest = &rest[..pos];
    }
    let padded = format!(" {rest} ");
    let target = match FOR_RE.find_iter(&padded).last() {
        Some(m) => padded[m.end()..].to_string(),
        None => padded,
    };

    let mut ty = target.trim();
    loop {
        let before = ty;
        ty = ty.trim_start_matches(['&', '!', '(']).trim_start();
        if ty.starts_with('\'') {
            ty = ty.trim_start_matches(|c: char| c == '\'' || c.is_alphanumeric() || c == '_').trim_start();
        }
        for keyword in ["dyn ", "mut ", "impl "] {
            if let Some(stripped) = ty.strip_prefix(keyword) {
                ty = stripped.trim_start();
            }
        }
        if ty == before {
            break;
        }
    }

    let path_end = ty
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == ':'))
        .unwrap_or(ty.len());
    let name = ty[..path_end].rsplit("::").next()?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Skip a leading balanced `<...>` group
fn skip_generics(text: &str) -> &str {
    if !text.starts_with('<') {
        return text;
    }
    let mut nesting = 0usize;
    for (i, ch) in text.char_indices() {
        match ch {
            '<' => nesting += 1,
            '>' => {
                nesting = nesting.saturating_sub(1);
                if nesting == 0 {
                    return text[i + 1..].trim_start();
                }
            }
            _ => {}
        }
    }
    ""
}
