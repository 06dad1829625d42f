//! JavaScript/TypeScript outline extraction.
//!
//! Handles: classes, function declarations, arrow/function-expression
//! bindings, class methods and arrow-valued class fields, and export
//! annotation (inline `export`, `export default name;`, `export { a as b }`).

use once_cell::sync::Lazy;
use regex::Regex;

use super::common::{
    leading_comment, normalize_parameters, CommentStyle, Declaration, DeclarationKind,
    DeclarationSet, NameFilter, Opens, OutlineError, ScopeStack,
};
use super::fragments::{LexOptions, MaskedSource, Terminator};

pub const EXTENSIONS: &[&str] = &[".js", ".jsx", ".mjs", ".cjs", ".ts", ".tsx", ".mts", ".cts"];

const STOPLIST: &[&str] = &[
    // React hooks
    "useState",
    "useEffect",
    "useContext",
    "useReducer",
    "useCallback",
    "useMemo",
    "useRef",
    "useLayoutEffect",
    "useImperativeHandle",
    "useDebugValue",
    "useTransition",
    "useDeferredValue",
    "useId",
    "useSyncExternalStore",
    // Class component lifecycle
    "componentDidMount",
    "componentDidUpdate",
    "componentWillUnmount",
    "shouldComponentUpdate",
    "getSnapshotBeforeUpdate",
    "componentDidCatch",
    "getDerivedStateFromProps",
    "getDerivedStateFromError",
    "render",
    // Control keywords that look like calls
    "if",
    "for",
    "while",
    "switch",
    "catch",
    "with",
    "return",
    "function",
    "typeof",
    "await",
    "new",
    "delete",
    "super",
    "else",
    "do",
    "try",
    "yield",
    "throw",
    "case",
];

const FILTER: NameFilter = NameFilter::new(STOPLIST);

const IDENT: &str = r"[A-Za-z_$][\w$]*";

/// Heritage keywords that `CLASS_RE` would otherwise read as a class name
const ANONYMOUS_CLASS_WORDS: &[&str] = &["extends", "implements"];

static CLASS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(export\s+)?(default\s+)?(?:declare\s+)?(?:abstract\s+)?class\s+({IDENT})"
    ))
    .unwrap()
});

static FUNCTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(export\s+)?(default\s+)?(?:declare\s+)?(?:async\s+)?function\s*\*?\s*({IDENT})\s*(?:<[^(]*>)?\s*\("
    ))
    .unwrap()
});

static BINDING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(export\s+)?(?:const|let|var)\s+({IDENT})\s*(?::(?:[^=;]|=>)+)?=\s*(?:async\s+)?(?:(function)\b\s*\*?\s*(?:{IDENT})?\s*(?:<[^(]*>)?\s*\(|(?:<[^(]*>\s*)?\(|({IDENT})\s*=>)"
    ))
    .unwrap()
});

static METHOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?:(?:public|private|protected|static|readonly|async|override|abstract|declare|get|set)\s+)*\*?\s*(#?{IDENT})\s*[?!]?\s*(?:<[^(]*>)?\s*\("
    ))
    .unwrap()
});

static FIELD_ARROW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?:(?:public|private|protected|static|readonly|override|declare)\s+)*(#?{IDENT})\s*[?!]?\s*(?::(?:[^=;]|=>)+)?=\s*(?:async\s+)?(?:(?:<[^(]*>\s*)?\(|({IDENT})\s*=>)"
    ))
    .unwrap()
});

/// `)` followed by an optional return type and `=>`
static ARROW_TAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?::[^=;{]+)?=>").unwrap());

static EXPORT_DEFAULT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?m)^\s*export\s+default\s+({IDENT})\s*;?\s*$")).unwrap()
});

static EXPORT_LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*export\s*\{([^}]*)\}").unwrap());

static FROM_CLAUSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*from\b").unwrap());

/// Extractor for JavaScript and TypeScript sources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JavaScriptExtractor;

impl JavaScriptExtractor {
    pub fn scan(&self, content: &str) -> Result<Vec<Declaration>, OutlineError> {
        let source = MaskedSource::scan(content, LexOptions::JAVASCRIPT)?;
        let lines: Vec<&str> = content.lines().collect();
        let mut scanner = Scanner {
            source: &source,
            lines: &lines,
            scopes: ScopeStack::new(),
            found: DeclarationSet::new(),
        };

        for fragment in &source.fragments {
            scanner.scopes.unwind(fragment.depth);
            if scanner.scopes.in_body() {
                continue;
            }

            let in_class = scanner.scopes.direct_container(fragment.depth).is_some();
            let mut opens = None;
            for head in source.heads(fragment) {
                let matched = if in_class {
                    scanner.class_member(head, fragment.end)
                } else {
                    scanner.top_level(head, fragment.end)
                };
                match matched {
                    Some(scope) => opens = scope,
                    // A new statement without a match owns whatever follows
                    None if source.starts_statement(head) => opens = None,
                    None => {}
                }
            }

            if fragment.terminator == Terminator::Open {
                if let Some(scope) = opens {
                    scanner.scopes.open(scope, fragment.depth_after);
                }
            }
        }

        let mut found = scanner.found;
        apply_export_statements(&source.masked, &mut found);
        Ok(found.into_vec())
    }
}

struct Scanner<'a> {
    source: &'a MaskedSource,
    lines: &'a [&'a str],
    scopes: ScopeStack,
    found: DeclarationSet,
}

impl Scanner<'_> {
    /// Match a head outside classes.
    /// Returns `Some(scope)` when a declaration was recognized.
    fn top_level(&mut self, head: usize, end: usize) -> Option<Option<Opens>> {
        let source = self.source;
        let text = &source.masked[head..end];

        if let Some(caps) = CLASS_RE.captures(text) {
            let name = caps.get(3)?.as_str();
            // `class extends Base` has no name; its members are skipped
            if ANONYMOUS_CLASS_WORDS.contains(&name) {
                return Some(Some(Opens::Body));
            }
            if FILTER.accepts(name) {
                let decl = Declaration::new(self.scopes.qualify(name), DeclarationKind::Class, self.source.line_of(head))
                    .exported(caps.get(1).is_some(), caps.get(2).is_some());
                self.record(decl);
            }
            return Some(Some(Opens::Container(name.to_string())));
        }

        if let Some(caps) = FUNCTION_RE.captures(text) {
            let name = caps.get(3)?.as_str();
            let open = head + caps.get(0)?.end() - 1;
            self.record_callable(
                name,
                DeclarationKind::Function,
                head,
                self.params_at(open),
                (caps.get(1).is_some(), caps.get(2).is_some()),
            );
            return Some(Some(Opens::Body));
        }

        if let Some(caps) = BINDING_RE.captures(text) {
            let name = caps.get(2)?.as_str();
            let params = match caps.get(4) {
                Some(single) => Some(single.as_str().to_string()),
                None => {
                    let open = head + caps.get(0)?.end() - 1;
                    if caps.get(3).is_none() && !self.is_arrow(open) {
                        return None;
                    }
                    self.params_at(open)
                }
            };
            self.record_callable(
                name,
                DeclarationKind::Function,
                head,
                params,
                (caps.get(1).is_some(), false),
            );
            return Some(Some(Opens::Body));
        }

        None
    }

    /// Match a head directly inside a class body
    fn class_member(&mut self, head: usize, end: usize) -> Option<Option<Opens>> {
        let source = self.source;
        let text = &source.masked[head..end];

        if let Some(caps) = FIELD_ARROW_RE.captures(text) {
            let name = caps.get(1)?.as_str();
            let params = match caps.get(2) {
                Some(single) => Some(single.as_str().to_string()),
                None => {
                    let open = head + caps.get(0)?.end() - 1;
                    if !self.is_arrow(open) {
                        return None;
                    }
                    self.params_at(open)
                }
            };
            self.record_method(name, head, params);
            return Some(Some(Opens::Body));
        }

        if let Some(caps) = METHOD_RE.captures(text) {
            let name = caps.get(1)?.as_str();
            let open = head + caps.get(0)?.end() - 1;
            self.record_method(name, head, self.params_at(open));
            return Some(Some(Opens::Body));
        }

        None
    }

    fn record_method(&mut self, name: &str, head: usize, params: Option<String>) {
        if name.starts_with('#') || !FILTER.accepts(name) {
            return;
        }
        let qualified = if name == "constructor" {
            name.to_string()
        } else {
            self.scopes.qualify(name)
        };
        let decl = Declaration::new(qualified, DeclarationKind::Method, self.source.line_of(head))
            .with_parameters(params);
        self.record(decl);
    }

    fn record_callable(
        &mut self,
        name: &str,
        kind: DeclarationKind,
        head: usize,
        params: Option<String>,
        (is_exported, is_default): (bool, bool),
    ) {
        if !FILTER.accepts(name) {
            return;
        }
        let decl = Declaration::new(self.scopes.qualify(name), kind, self.source.line_of(head))
            .with_parameters(params)
            .exported(is_exported, is_default);
        self.record(decl);
    }

    fn record(&mut self, decl: Declaration) {
        if self.found.contains(&decl.name) {
            return;
        }
        let comment = leading_comment(self.lines, decl.line, CommentStyle::CFamily, &["@"]);
        self.found.insert(decl.with_comment(comment));
    }

    fn params_at(&self, open: usize) -> Option<String> {
        self.source.balanced_parens(open).and_then(normalize_parameters)
    }

    /// Whether the parenthesized group at `open` is an arrow parameter list
    fn is_arrow(&self, open: usize) -> bool {
        match self.source.balanced_parens(open) {
            Some(inner) => {
                let after = open + inner.len() + 2;
                self.source
                    .masked
                    .get(after..)
                    .is_some_and(|rest| ARROW_TAIL_RE.is_match(rest))
            }
            None => false,
        }
    }
}

/// Apply `export default name;` and `export { a, b as c }` to top-level declarations
fn apply_export_statements(masked: &str, found: &mut DeclarationSet) {
    let mut marks: Vec<(String, bool)> = Vec::new();

    for caps in EXPORT_DEFAULT_RE.captures_iter(masked) {
        if let Some(name) = caps.get(1) {
            marks.push((name.as_str().to_string(), true));
        }
    }

    for caps in EXPORT_LIST_RE.captures_iter(masked) {
        let (Some(whole), Some(list)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if FROM_CLAUSE_RE.is_match(&masked[whole.end()..]) {
            continue;
        }
        for item in list.as_str().split(',') {
            let mut parts = item.split_whitespace();
            let Some(local) = parts.next() else {
                continue;
            };
            let is_default = parts.next() == Some("as") && parts.next() == Some("default");
            marks.push((local.to_string(), is_default));
        }
    }

    for decl in found.iter_mut() {
        if decl.name.contains('.') {
            continue;
        }
        for (name, is_default) in &marks {
            if &decl.name == name {
                decl.is_exported = true;
                decl.is_default_export |= *is_default;
            }
        }
    }
}
