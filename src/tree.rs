//! Directory / file / declaration tree rendering.
//!
//! Paths are merged into a nested map keyed by segment; files optionally
//! carry their declarations, which are grouped under their containers.
//! `BTreeMap` keys give the lexicographic sibling order for free.

use std::collections::BTreeMap;

use crate::outline::Declaration;

// ============ Glyphs ============

const BRANCH: &str = "├── ";
const CORNER: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

// ============ Tree Model ============

#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Directory(BTreeMap<String, TreeNode>),
    File(Vec<Declaration>),
    Declaration {
        label: String,
        members: BTreeMap<String, TreeNode>,
    },
}

/// Nested path tree built once per invocation
#[derive(Debug, Default, Clone)]
pub struct DeclarationTree {
    root: BTreeMap<String, TreeNode>,
}

impl DeclarationTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tree of files with their declarations
    pub fn from_outlines<I, P>(outlines: I) -> Self
    where
        I: IntoIterator<Item = (P, Vec<Declaration>)>,
        P: AsRef<str>,
    {
        let mut tree = Self::new();
        for (path, declarations) in outlines {
            tree.insert(path.as_ref(), declarations);
        }
        tree
    }

    /// Directory structure only: every file leaf is empty
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        Self::from_outlines(paths.into_iter().map(|p| (p, Vec::new())))
    }

    /// Merge one path into the tree.
    /// A trailing separator marks the path as a directory.
    pub fn insert(&mut self, path: &str, declarations: Vec<Declaration>) {
        let is_dir = path.ends_with(['/', '\\']);
        let segments: Vec<&str> = path
            .split(['/', '\\'])
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut level = &mut self.root;
        for segment in parents {
            level = directory_entry(level, segment);
        }

        if is_dir {
            directory_entry(level, last);
            return;
        }
        match level.get_mut(*last) {
            Some(TreeNode::Directory(_)) => {}
            Some(TreeNode::File(existing)) => {
                if existing.is_empty() {
                    *existing = declarations;
                }
            }
            _ => {
                level.insert((*last).to_string(), TreeNode::File(declarations));
            }
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        render_level(&mut out, &self.root, "");
        out
    }
}

/// Child directory map for `segment`, turning a file leaf into a directory
fn directory_entry<'a>(
    level: &'a mut BTreeMap<String, TreeNode>,
    segment: &str,
) -> &'a mut BTreeMap<String, TreeNode> {
    let node = level
        .entry(segment.to_string())
        .or_insert_with(|| TreeNode::Directory(BTreeMap::new()));
    if !matches!(node, TreeNode::Directory(_)) {
        *node = TreeNode::Directory(BTreeMap::new());
    }
    match node {
        TreeNode::Directory(children) => children,
        _ => unreachable!("node was just made a directory"),
    }
}

// ============ Declaration Grouping ============

#[derive(Default)]
struct Group {
    label: Option<String>,
    members: BTreeMap<String, Group>,
}

/// Group a file's declarations under their containers, keyed by label.
/// A container that was never recorded gets a node named after it.
pub fn declaration_nodes(declarations: &[Declaration]) -> BTreeMap<String, TreeNode> {
    let mut groups: BTreeMap<String, Group> = BTreeMap::new();
    for decl in declarations {
        let mut level = &mut groups;
        for container in decl.container_path() {
            level = &mut level.entry(container.to_string()).or_default().members;
        }
        let group = level.entry(decl.short_name().to_string()).or_default();
        if group.label.is_none() {
            group.label = Some(decl.label());
        }
    }
    into_nodes(groups)
}

fn into_nodes(groups: BTreeMap<String, Group>) -> BTreeMap<String, TreeNode> {
    let mut nodes = BTreeMap::new();
    for (name, group) in groups {
        let label = group.label.unwrap_or(name);
        let members = into_nodes(group.members);
        match nodes.get_mut(&label) {
            Some(TreeNode::Declaration { members: existing, .. }) => existing.extend(members),
            _ => {
                nodes.insert(
                    label.clone(),
                    TreeNode::Declaration { label, members },
                );
            }
        }
    }
    nodes
}

// ============ Serialization ============

fn render_level(out: &mut String, children: &BTreeMap<String, TreeNode>, prefix: &str) {
    let count = children.len();
    for (index, (name, node)) in children.iter().enumerate() {
        let is_last = index + 1 == count;
        out.push_str(prefix);
        out.push_str(if is_last { CORNER } else { BRANCH });
        out.push_str(name);
        out.push('\n');

        let child_prefix = format!("{}{}", prefix, if is_last { SPACE } else { PIPE });
        match node {
            TreeNode::Directory(entries) => render_level(out, entries, &child_prefix),
            TreeNode::File(declarations) => {
                if !declarations.is_empty() {
                    render_level(out, &declaration_nodes(declarations), &child_prefix);
                }
            }
            TreeNode::Declaration { members, .. } => render_level(out, members, &child_prefix),
        }
    }
}

/// Render a path → declarations mapping as a tree diagram
pub fn render_tree<I, P>(outlines: I) -> String
where
    I: IntoIterator<Item = (P, Vec<Declaration>)>,
    P: AsRef<str>,
{
    DeclarationTree::from_outlines(outlines).render()
}

/// Render only the directory structure of `paths`
pub fn render_structure<I, P>(paths: I) -> String
where
    I: IntoIterator<Item = P>,
    P: AsRef<str>,
{
    DeclarationTree::from_paths(paths).render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::DeclarationKind;

    fn decl(name: &str, kind: DeclarationKind, params: Option<&str>) -> Declaration {
        Declaration::new(name, kind, 1).with_parameters(params.map(String::from))
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(render_structure(Vec::<String>::new()), "");
        assert_eq!(render_tree(Vec::<(String, Vec<Declaration>)>::new()), "");
    }

    #[test]
    fn test_directory_structure() {
        let tree = render_structure(["src/main.py", "src/utils/helper.py", "src/utils/format.py", "config/settings.json"]);
        let expected = "\
├── config
│   └── settings.json
└── src
    ├── main.py
    └── utils
        ├── format.py
        └── helper.py
";
        assert_eq!(tree, expected);
    }

    #[test]
    fn test_segments_are_normalized() {
        let tree = render_structure(["./src//a.rs", "src\\b.rs", "docs/"]);
        let expected = "\
├── docs
└── src
    ├── a.rs
    └── b.rs
";
        assert_eq!(tree, expected);
    }

    #[test]
    fn test_file_becomes_directory() {
        let tree = render_structure(["lib", "lib/mod.rs"]);
        assert_eq!(tree, "└── lib\n    └── mod.rs\n");
    }

    #[test]
    fn test_declarations_grouped_under_containers() {
        let decls = vec![
            decl("Greeter", DeclarationKind::Class, None),
            decl("Greeter.greet", DeclarationKind::Method, Some("self")),
            decl("main", DeclarationKind::Function, None),
        ];
        let tree = render_tree([("app/greeter.py", decls)]);
        let expected = "\
└── app
    └── greeter.py
        ├── Greeter
        │   └── greet(self)
        └── main()
";
        assert_eq!(tree, expected);
    }

    #[test]
    fn test_synthetic_container_and_sorting() {
        let decls = vec![
            decl("Foo.zeta", DeclarationKind::Method, None),
            decl("Foo.alpha", DeclarationKind::Method, Some("&self")),
            decl("Bar", DeclarationKind::Struct, None),
            decl("Foo", DeclarationKind::Struct, None),
        ];
        let tree = render_tree([("lib.rs", decls)]);
        let expected = "\
└── lib.rs
    ├── Bar
    └── Foo
        ├── alpha(&self)
        └── zeta()
";
        assert_eq!(tree, expected);
    }

    #[test]
    fn test_export_prefix_and_determinism() {
        let decls = vec![
            decl("add", DeclarationKind::Function, Some("a, b")).exported(true, false),
            decl("main", DeclarationKind::Function, None).exported(true, true),
        ];
        let first = render_tree([("index.js", decls.clone())]);
        let second = render_tree([("index.js", decls)]);
        assert_eq!(first, second);
        assert!(first.contains("├── export add(a, b)\n"));
        assert!(first.contains("└── export default main()\n"));
    }
}
