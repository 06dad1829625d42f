//! Python outline extraction using the tree-sitter Python grammar.
//!
//! The parse tree is error tolerant, so truncated files still yield the
//! definitions that were recognized before the damage.

use tree_sitter::{Node, Parser};

use super::common::{
    normalize_parameters, trim_docstring, Declaration, DeclarationKind, DeclarationSet,
    NameFilter, OutlineError,
};

pub const EXTENSIONS: &[&str] = &[".py", ".pyw", ".pyi"];

const FILTER: NameFilter = NameFilter::new(&[
    "setUp",
    "tearDown",
    "setUpClass",
    "tearDownClass",
    "asyncSetUp",
    "asyncTearDown",
]);

/// Extractor for Python sources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PythonExtractor;

impl PythonExtractor {
    pub fn scan(&self, content: &str) -> Result<Vec<Declaration>, OutlineError> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_python::LANGUAGE.into())?;
        let tree = parser.parse(content, None).ok_or(OutlineError::NoTree)?;

        let mut found = DeclarationSet::new();
        let mut classes = Vec::new();
        visit(tree.root_node(), content.as_bytes(), &mut classes, &mut found);
        Ok(found.into_vec())
    }
}

// ============ Tree Walk ============

fn visit(node: Node, source: &[u8], classes: &mut Vec<String>, found: &mut DeclarationSet) {
    match node.kind() {
        "class_definition" => {
            let Some(name) = field_text(node, "name", source) else {
                visit_children(node, source, classes, found);
                return;
            };
            if FILTER.accepts(name) {
                let decl = Declaration::new(qualify(classes, name), DeclarationKind::Class, line(node))
                    .with_comment(docstring(node, source));
                found.insert(decl);
            }
            classes.push(name.to_string());
            visit_children(node, source, classes, found);
            classes.pop();
        }

        "function_definition" => {
            if let Some(name) = field_text(node, "name", source) {
                if FILTER.accepts(name) {
                    let kind = if classes.is_empty() {
                        DeclarationKind::Function
                    } else {
                        DeclarationKind::Method
                    };
                    let decl = Declaration::new(qualify(classes, name), kind, line(node))
                        .with_parameters(parameters(node, source))
                        .with_comment(docstring(node, source));
                    found.insert(decl);
                }
            }
            // Nested functions are qualified by classes only
            visit_children(node, source, classes, found);
        }

        kind if may_contain_definitions(kind) => visit_children(node, source, classes, found),

        _ => {}
    }
}

fn visit_children(node: Node, source: &[u8], classes: &mut Vec<String>, found: &mut DeclarationSet) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit(child, source, classes, found);
    }
}

/// Statement-level nodes; expressions never hold `def` or `class`
fn may_contain_definitions(kind: &str) -> bool {
    match kind {
        "module" | "block" | "decorated_definition" | "ERROR" => true,
        "expression_statement" => false,
        _ => kind.ends_with("_statement") || kind.ends_with("_clause"),
    }
}

// ============ Node Helpers ============

fn node_text<'a>(node: Node, source: &'a [u8]) -> Option<&'a str> {
    source
        .get(node.start_byte()..node.end_byte())
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
}

fn field_text<'a>(node: Node, field: &str, source: &'a [u8]) -> Option<&'a str> {
    node.child_by_field_name(field)
        .and_then(|child| node_text(child, source))
        .filter(|text| !text.is_empty())
}

fn line(node: Node) -> usize {
    node.start_position().row + 1
}

fn qualify(classes: &[String], name: &str) -> String {
    super::common::qualify(classes.iter().map(String::as_str), name)
}

/// Named children of the parameter list, comments excluded
fn parameters(node: Node, source: &[u8]) -> Option<String> {
    let params = node.child_by_field_name("parameters")?;
    let mut cursor = params.walk();
    let parts: Vec<&str> = params
        .named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .filter_map(|child| node_text(child, source))
        .collect();
    normalize_parameters(&parts.join(", "))
}

/// First line of the docstring: a string literal opening the body
fn docstring(node: Node, source: &[u8]) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let mut cursor = body.walk();
    let first = body.named_children(&mut cursor).find(|c| c.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = first.named_child(0)?;
    if expr.kind() != "string" {
        return None;
    }
    trim_docstring(node_text(expr, source)?)
}
