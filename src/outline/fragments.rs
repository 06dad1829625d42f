//! Comment masking and brace fragmenting for the C-family extractors.
//!
//! The scanner makes a single linear pass over the source:
//! - comments are blanked out (newlines kept, so offsets and lines stay valid)
//! - the masked text is cut at `{`, `}` and `;` outside strings and parens
//! - every fragment remembers the brace depth it starts and ends at

use super::common::{OutlineError, MAX_PARAM_SPAN};

// ============ Options ============

/// Lexical differences between the brace languages
#[derive(Debug, Clone, Copy, Default)]
pub struct LexOptions {
    /// `` `...` `` template literals (JS/TS)
    pub backtick_strings: bool,
    /// `'x'` char literals vs `'a` lifetimes, `r#"..."#` raw strings (Rust)
    pub rust_literals: bool,
    /// `#[...]` / `#![...]` attributes before a declaration (Rust)
    pub attributes: bool,
    /// `@name(...)` decorators before a declaration (JS/TS)
    pub decorators: bool,
    /// `/.../flags` regex literals (JS/TS)
    pub regex_literals: bool,
    /// A line break can end a statement (JS/TS)
    pub automatic_semicolons: bool,
}

impl LexOptions {
    pub const JAVASCRIPT: Self = Self {
        backtick_strings: true,
        rust_literals: false,
        attributes: false,
        decorators: true,
        regex_literals: true,
        automatic_semicolons: true,
    };
    pub const RUST: Self = Self {
        backtick_strings: false,
        rust_literals: true,
        attributes: true,
        decorators: false,
        regex_literals: false,
        automatic_semicolons: false,
    };
    pub const SOLIDITY: Self = Self {
        backtick_strings: false,
        rust_literals: false,
        attributes: false,
        decorators: false,
        regex_literals: false,
        automatic_semicolons: false,
    };
}

// ============ Fragments ============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    Open,
    Close,
    Semicolon,
    Eof,
}

/// A slice of masked source between two structural terminators
#[derive(Debug, Clone, Copy)]
pub struct Fragment {
    pub start: usize,
    /// Exclusive; includes the terminator byte
    pub end: usize,
    /// Brace depth at the start of the fragment
    pub depth: usize,
    /// Brace depth after the terminator
    pub depth_after: usize,
    pub terminator: Terminator,
}

/// Masked copy of a source file plus its fragments
#[derive(Debug)]
pub struct MaskedSource {
    pub masked: String,
    pub fragments: Vec<Fragment>,
    line_starts: Vec<usize>,
    /// Line starts that are outside any parens (statement candidates)
    statement_lines: Vec<usize>,
    options: LexOptions,
}

impl MaskedSource {
    pub fn scan(content: &str, options: LexOptions) -> Result<Self, OutlineError> {
        let bytes = content.as_bytes();
        let mut out = bytes.to_vec();
        let mut fragments = Vec::new();
        let mut statement_lines = Vec::new();

        let mut depth = 0usize;
        let mut parens = 0usize;
        let mut paren_floor = 0usize;
        let mut frag_start = 0usize;
        let mut frag_depth = 0usize;

        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            let next = bytes.get(i + 1).copied();
            match b {
                b'/' if next == Some(b'/') => {
                    let end = find_byte(bytes, i, b'\n').unwrap_or(bytes.len());
                    blank(&mut out, i, end);
                    i = end;
                    continue;
                }
                b'/' if next == Some(b'*') => {
                    let end = find_seq(bytes, i + 2, b"*/").map_or(bytes.len(), |p| p + 2);
                    blank(&mut out, i, end);
                    i = end;
                    continue;
                }
                b'/' if options.regex_literals && regex_may_start(&out, i) => {
                    // Not a literal after all: a lone `/` has no structure
                    i = skip_regex(bytes, i).unwrap_or(i + 1);
                    continue;
                }
                b'"' => {
                    i = skip_string(bytes, i, b'"', options.rust_literals);
                    continue;
                }
                b'\'' if options.rust_literals => {
                    i = skip_char_literal(bytes, i);
                    continue;
                }
                b'\'' => {
                    i = skip_string(bytes, i, b'\'', false);
                    continue;
                }
                b'`' if options.backtick_strings => {
                    i = skip_string(bytes, i, b'`', true);
                    continue;
                }
                b'r' if options.rust_literals && starts_raw_string(bytes, i) => {
                    i = skip_raw_string(bytes, i);
                    continue;
                }
                b'(' | b'[' => {
                    if parens == 0 {
                        paren_floor = depth;
                    }
                    parens += 1;
                }
                b')' | b']' => {
                    parens = parens.saturating_sub(1);
                }
                b'\n' if parens == 0 => {
                    statement_lines.push(i + 1);
                }
                b'{' => {
                    depth += 1;
                    if parens == 0 {
                        fragments.push(Fragment {
                            start: frag_start,
                            end: i + 1,
                            depth: frag_depth,
                            depth_after: depth,
                            terminator: Terminator::Open,
                        });
                        frag_start = i + 1;
                        frag_depth = depth;
                    }
                }
                b'}' => {
                    depth = depth.saturating_sub(1);
                    if parens > 0 && depth < paren_floor {
                        parens = 0;
                    }
                    if parens == 0 {
                        fragments.push(Fragment {
                            start: frag_start,
                            end: i + 1,
                            depth: frag_depth,
                            depth_after: depth,
                            terminator: Terminator::Close,
                        });
                        frag_start = i + 1;
                        frag_depth = depth;
                    }
                }
                b';' if parens == 0 => {
                    fragments.push(Fragment {
                        start: frag_start,
                        end: i + 1,
                        depth: frag_depth,
                        depth_after: depth,
                        terminator: Terminator::Semicolon,
                    });
                    frag_start = i + 1;
                    frag_depth = depth;
                }
                _ => {}
            }
            i += 1;
        }

        if frag_start < bytes.len() {
            fragments.push(Fragment {
                start: frag_start,
                end: bytes.len(),
                depth: frag_depth,
                depth_after: depth,
                terminator: Terminator::Eof,
            });
        }

        let line_starts = std::iter::once(0)
            .chain(
                bytes
                    .iter()
                    .enumerate()
                    .filter(|(_, &b)| b == b'\n')
                    .map(|(i, _)| i + 1),
            )
            .collect();

        Ok(Self {
            masked: String::from_utf8(out)?,
            fragments,
            line_starts,
            statement_lines,
            options,
        })
    }

    /// 1-based line of a byte offset
    pub fn line_of(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset)
    }

    pub fn text(&self, fragment: &Fragment) -> &str {
        &self.masked[fragment.start..fragment.end]
    }

    /// Offset of the first non-whitespace byte of a fragment, if any
    pub fn head_offset(&self, fragment: &Fragment) -> Option<usize> {
        let text = self.text(fragment);
        let skipped = text.len() - text.trim_start().len();
        if skipped == text.len() {
            None
        } else {
            Some(fragment.start + skipped)
        }
    }

    /// Candidate declaration starts inside a fragment, in source order.
    ///
    /// The fragment head plus every later line that starts outside parens,
    /// each advanced past whitespace and any attributes or decorators.
    pub fn heads(&self, fragment: &Fragment) -> Vec<usize> {
        let first = self.statement_lines.partition_point(|&s| s <= fragment.start);
        let later = self.statement_lines[first..]
            .iter()
            .copied()
            .take_while(|&s| s < fragment.end);

        let mut heads: Vec<usize> = std::iter::once(fragment.start)
            .chain(later)
            .filter_map(|offset| self.skip_prelude(offset, fragment.end))
            .collect();
        heads.dedup();
        heads
    }

    /// Whether `head` begins a statement of its own rather than continuing
    /// the previous line. Only languages without mandatory semicolons have
    /// such breaks inside one fragment.
    pub fn starts_statement(&self, head: usize) -> bool {
        if !self.options.automatic_semicolons {
            return false;
        }
        let bytes = self.masked.as_bytes();
        if !bytes.get(head).is_some_and(|&b| is_ident_byte(b) || b == b'$') {
            return false;
        }
        let Some(last) = bytes[..head].iter().rposition(|b| !b.is_ascii_whitespace()) else {
            return false;
        };
        match bytes[last] {
            b')' | b']' | b'"' | b'\'' | b'`' => true,
            b if is_ident_byte(b) || b == b'$' => {
                let start = bytes[..=last]
                    .iter()
                    .rposition(|&b| !(is_ident_byte(b) || b == b'$'))
                    .map_or(0, |p| p + 1);
                !CONTINUATION_WORDS.contains(&&self.masked[start..=last])
            }
            _ => false,
        }
    }

    /// Skip whitespace, attributes and decorators; `None` if nothing is left
    fn skip_prelude(&self, mut offset: usize, end: usize) -> Option<usize> {
        let bytes = self.masked.as_bytes();
        loop {
            while offset < end && bytes[offset].is_ascii_whitespace() {
                offset += 1;
            }
            if offset >= end {
                return None;
            }
            let rest = &bytes[offset..end];
            if self.options.attributes && (rest.starts_with(b"#[") || rest.starts_with(b"#![")) {
                offset = skip_brackets(bytes, offset, end)?;
            } else if self.options.decorators
                && rest.len() > 1
                && rest[0] == b'@'
                && (is_ident_byte(rest[1]) || rest[1] == b'$')
            {
                offset += 1;
                while offset < end
                    && (is_ident_byte(bytes[offset]) || bytes[offset] == b'$' || bytes[offset] == b'.')
                {
                    offset += 1;
                }
                if bytes.get(offset) == Some(&b'(') {
                    let inner = self.balanced_parens(offset)?;
                    offset += inner.len() + 2;
                }
            } else {
                return Some(offset);
            }
        }
    }

    /// Inner text of the balanced `(...)` starting at `open`, bounded in size
    pub fn balanced_parens(&self, open: usize) -> Option<&str> {
        let bytes = self.masked.as_bytes();
        if bytes.get(open) != Some(&b'(') {
            return None;
        }
        let limit = (open + MAX_PARAM_SPAN).min(bytes.len());
        let mut nesting = 0usize;
        let mut quote: Option<u8> = None;
        let mut i = open;
        while i < limit {
            let b = bytes[i];
            if let Some(q) = quote {
                if b == b'\\' {
                    i += 2;
                    continue;
                }
                if b == q {
                    quote = None;
                }
                i += 1;
                continue;
            }
            match b {
                b'"' => quote = Some(b),
                b'`' if self.options.backtick_strings => quote = Some(b),
                b'\'' if !self.options.rust_literals => quote = Some(b),
                b'(' => nesting += 1,
                b')' => {
                    nesting -= 1;
                    if nesting == 0 {
                        return self.masked.get(open + 1..i);
                    }
                }
                _ => {}
            }
            i += 1;
        }
        None
    }
}

// ============ Lexing Helpers ============

fn blank(out: &mut [u8], start: usize, end: usize) {
    for byte in &mut out[start..end] {
        if *byte != b'\n' {
            *byte = b' ';
        }
    }
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes[from..].iter().position(|&b| b == needle).map(|p| p + from)
}

fn find_seq(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Index just past a quoted string starting at `start`.
/// Single-line strings end at an unescaped newline so one bad quote can't
/// swallow the rest of the file.
fn skip_string(bytes: &[u8], start: usize, quote: u8, multiline: bool) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' if !multiline => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Index just past the `]` closing the first `[` at or after `start`
fn skip_brackets(bytes: &[u8], start: usize, end: usize) -> Option<usize> {
    let mut nesting = 0usize;
    for (i, &b) in bytes.iter().enumerate().take(end).skip(start) {
        match b {
            b'[' => nesting += 1,
            b']' => {
                nesting = nesting.saturating_sub(1);
                if nesting == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Words after which a line break continues the statement
const CONTINUATION_WORDS: &[&str] = &[
    "extends", "implements", "new", "typeof", "instanceof", "in", "of", "as", "await", "yield",
    "async", "export", "default",
];

/// Words after which `/` opens a regex literal instead of dividing
const REGEX_PRECEDING_WORDS: &[&str] = &[
    "return", "typeof", "case", "do", "else", "in", "of", "void", "yield", "await", "delete",
    "throw", "new",
];

/// Whether a `/` at `at` (not a comment) starts a regex literal, judged by
/// the previous significant byte of the masked text
fn regex_may_start(masked: &[u8], at: usize) -> bool {
    let Some(last) = masked[..at].iter().rposition(|b| !b.is_ascii_whitespace()) else {
        return true;
    };
    match masked[last] {
        b'=' | b'(' | b',' | b':' | b'[' | b'!' | b'&' | b'|' | b'?' | b'{' | b'}' | b';' => true,
        b if is_ident_byte(b) => {
            let start = masked[..=last]
                .iter()
                .rposition(|&b| !is_ident_byte(b))
                .map_or(0, |p| p + 1);
            std::str::from_utf8(&masked[start..=last])
                .is_ok_and(|word| REGEX_PRECEDING_WORDS.contains(&word))
        }
        _ => false,
    }
}

/// End of the regex literal opening at `start`, flags included.
/// `None` when the line ends first.
fn skip_regex(bytes: &[u8], start: usize) -> Option<usize> {
    let mut in_class = false;
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'\n' => return None,
            b'[' => in_class = true,
            b']' => in_class = false,
            b'/' if !in_class => {
                i += 1;
                while i < bytes.len() && is_ident_byte(bytes[i]) {
                    i += 1;
                }
                return Some(i);
            }
            _ => {}
        }
        i += 1;
    }
    None
}

pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// `'x'` / `'\n'` are char literals; anything else after `'` is a lifetime
fn skip_char_literal(bytes: &[u8], start: usize) -> usize {
    match bytes.get(start + 1) {
        Some(b'\\') => {
            let limit = (start + 12).min(bytes.len());
            let mut i = start + 3;
            while i < limit {
                if bytes[i] == b'\'' {
                    return i + 1;
                }
                i += 1;
            }
            start + 1
        }
        Some(&first) => {
            let width = utf8_width(first);
            if bytes.get(start + 1 + width) == Some(&b'\'') {
                start + 2 + width
            } else {
                start + 1
            }
        }
        None => start + 1,
    }
}

fn utf8_width(first: u8) -> usize {
    match first {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    }
}

fn starts_raw_string(bytes: &[u8], i: usize) -> bool {
    if i > 0 && is_ident_byte(bytes[i - 1]) {
        return false;
    }
    let mut j = i + 1;
    while bytes.get(j) == Some(&b'#') {
        j += 1;
    }
    bytes.get(j) == Some(&b'"')
}

fn skip_raw_string(bytes: &[u8], start: usize) -> usize {
    let mut j = start + 1;
    let mut hashes = 0;
    while bytes.get(j) == Some(&b'#') {
        hashes += 1;
        j += 1;
    }
    let mut i = j + 1;
    while i < bytes.len() {
        if bytes[i] == b'"' && bytes[i + 1..].iter().take(hashes).filter(|&&b| b == b'#').count() == hashes {
            return i + 1 + hashes;
        }
        i += 1;
    }
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heads(source: &MaskedSource) -> Vec<(String, usize, Terminator)> {
        source
            .fragments
            .iter()
            .filter(|f| source.head_offset(f).is_some())
            .map(|f| (source.text(f).trim().to_string(), f.depth, f.terminator))
            .collect()
    }

    #[test]
    fn test_single_line_impl_is_fragmented() {
        let source = MaskedSource::scan(
            "impl Foo { pub fn bar() {} fn new() -> Self { Foo } }",
            LexOptions::RUST,
        )
        .unwrap();
        let heads = heads(&source);
        assert_eq!(heads[0], ("impl Foo {".to_string(), 0, Terminator::Open));
        assert_eq!(heads[1], ("pub fn bar() {".to_string(), 1, Terminator::Open));
        assert!(heads.iter().any(|(t, d, _)| t == "fn new() -> Self {" && *d == 1));
    }

    #[test]
    fn test_comments_are_masked_and_lines_kept() {
        let content = "// a { comment\nfn a() {}\n/* block\n { */ fn b() {}\n";
        let source = MaskedSource::scan(content, LexOptions::RUST).unwrap();
        assert_eq!(source.masked.len(), content.len());
        assert_eq!(source.masked.lines().count(), content.lines().count());
        assert!(!source.masked.contains("comment"));
        let opens: Vec<_> = source
            .fragments
            .iter()
            .filter(|f| f.terminator == Terminator::Open)
            .map(|f| source.line_of(source.head_offset(f).unwrap()))
            .collect();
        assert_eq!(opens, vec![2, 4]);
    }

    #[test]
    fn test_braces_inside_strings_and_parens_do_not_split() {
        let content = "const a = \"{\"; const b = `x ${y} }`; call({ a: 1 }); let f = (x) => { return x; };";
        let source = MaskedSource::scan(content, LexOptions::JAVASCRIPT).unwrap();
        let heads = heads(&source);
        assert_eq!(heads[0].0, "const a = \"{\";");
        assert_eq!(heads[1].0, "const b = `x ${y} }`;");
        assert_eq!(heads[2].0, "call({ a: 1 });");
        assert_eq!(heads[3].0, "let f = (x) => {");
        assert_eq!(heads[3].2, Terminator::Open);
    }

    #[test]
    fn test_lifetimes_are_not_char_literals() {
        let content = "impl<'a> Parser<'a> {\n    fn peek(&self) -> char { '{' }\n}\n";
        let source = MaskedSource::scan(content, LexOptions::RUST).unwrap();
        let heads = heads(&source);
        assert_eq!(heads[0], ("impl<'a> Parser<'a> {".to_string(), 0, Terminator::Open));
        assert_eq!(heads[1].1, 1);
        assert_eq!(source.fragments.last().map(|f| f.depth_after), Some(0));
    }

    #[test]
    fn test_unbalanced_paren_recovers() {
        let content = "fn broken() {\n    call(\n}\nfn next() {}\n";
        let source = MaskedSource::scan(content, LexOptions::RUST).unwrap();
        let next = source
            .fragments
            .iter()
            .find(|f| source.text(f).contains("fn next"))
            .unwrap();
        assert_eq!(next.depth, 0);
    }

    #[test]
    fn test_balanced_parens() {
        let content = "function f(a, { b, c } = {}, d = \")\") {}";
        let source = MaskedSource::scan(content, LexOptions::JAVASCRIPT).unwrap();
        let open = content.find('(').unwrap();
        assert_eq!(
            source.balanced_parens(open),
            Some("a, { b, c } = {}, d = \")\"")
        );
    }

    #[test]
    fn test_heads_cover_semicolonless_lines() {
        let content = "const a = 1\nconst f = () => a\nfunction g() {\n}\n";
        let source = MaskedSource::scan(content, LexOptions::JAVASCRIPT).unwrap();
        let heads: Vec<usize> = source.heads(&source.fragments[0]);
        let lines: Vec<usize> = heads.iter().map(|&h| source.line_of(h)).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn test_heads_skip_attributes_and_decorators() {
        let rust = "#[derive(Debug, Clone)]\n#[serde(rename_all = \"camelCase\")]\npub struct Config {\n}\n";
        let source = MaskedSource::scan(rust, LexOptions::RUST).unwrap();
        let heads = source.heads(&source.fragments[0]);
        assert_eq!(heads.len(), 1);
        assert!(source.masked[heads[0]..].starts_with("pub struct Config"));

        let js = "@Component({ selector: 'app' })\nexport class AppComponent {\n}\n";
        let source = MaskedSource::scan(js, LexOptions::JAVASCRIPT).unwrap();
        let heads = source.heads(&source.fragments[0]);
        assert_eq!(heads.len(), 1);
        assert!(source.masked[heads[0]..].starts_with("export class AppComponent"));
    }

    #[test]
    fn test_raw_strings() {
        let content = "fn a() { let s = r#\"}\"#; }\nfn b() {}";
        let source = MaskedSource::scan(content, LexOptions::RUST).unwrap();
        let b = source
            .fragments
            .iter()
            .find(|f| source.text(f).contains("fn b"))
            .unwrap();
        assert_eq!(b.depth, 0);
    }

    #[test]
    fn test_regex_literals_are_skipped() {
        let content = "const re = /[}'\"]/g;\nconst half = total / 2; const third = 1 / 3;\nfunction f() { return /\\{/.test(x); }\nfunction g() {}";
        let source = MaskedSource::scan(content, LexOptions::JAVASCRIPT).unwrap();
        let g = source
            .fragments
            .iter()
            .find(|f| source.text(f).contains("function g"))
            .unwrap();
        assert_eq!(g.depth, 0);
        let statements = source
            .fragments
            .iter()
            .filter(|f| f.terminator == Terminator::Semicolon)
            .count();
        assert_eq!(statements, 4);
    }

    #[test]
    fn test_statement_starts_after_line_break() {
        let content = "const f = () => a\nconst obj = {\nclass W extends\n  Base {\nfunction h()\n{";
        let source = MaskedSource::scan(content, LexOptions::JAVASCRIPT).unwrap();
        let at = |needle: &str| content.find(needle).unwrap();
        assert!(source.starts_statement(at("const obj")));
        assert!(!source.starts_statement(at("Base")));
        assert!(!source.starts_statement(content.rfind('{').unwrap()));

        let rust = MaskedSource::scan("fn f<T>(x: T)\nwhere\n    T: Clone,\n{", LexOptions::RUST).unwrap();
        assert!(!rust.starts_statement(rust.masked.find("T: Clone").unwrap()));
    }
}
