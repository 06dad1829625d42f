//! Solidity outline extraction.

use once_cell::sync::Lazy;
use regex::Regex;

use super::common::{
    leading_comment, normalize_parameters, CommentStyle, Declaration, DeclarationKind,
    DeclarationSet, NameFilter, Opens, OutlineError, ScopeStack,
};
use super::fragments::{LexOptions, MaskedSource, Terminator};

pub const EXTENSIONS: &[&str] = &[".sol"];

const FILTER: NameFilter = NameFilter::new(&["constructor"]);

static CONTRACT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:abstract\s+)?(contract|library|interface)\s+([A-Za-z_]\w*)").unwrap()
});

static FUNCTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:function\s+([A-Za-z_]\w*)|(fallback|receive)|function)\s*\(").unwrap()
});

/// Constructors and modifiers have bodies but are never recorded
static BODY_ONLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:constructor\s*\(|modifier\s+\w+)").unwrap());

/// Extractor for Solidity sources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolidityExtractor;

impl SolidityExtractor {
    pub fn scan(&self, content: &str) -> Result<Vec<Declaration>, OutlineError> {
        let source = MaskedSource::scan(content, LexOptions::SOLIDITY)?;
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

                if let Some(caps) = CONTRACT_RE.captures(text) {
                    let (Some(keyword), Some(name)) = (caps.get(1), caps.get(2)) else {
                        continue;
                    };
                    let kind = if keyword.as_str() == "interface" {
                        DeclarationKind::Interface
                    } else {
                        DeclarationKind::Contract
                    };
                    if FILTER.accepts(name.as_str()) {
                        let decl = Declaration::new(scopes.qualify(name.as_str()), kind, line);
                        record(&mut found, decl, &lines);
                    }
                    opens = Some(Opens::Container(name.as_str().to_string()));
                    continue;
                }

                if let Some(caps) = FUNCTION_RE.captures(text) {
                    let named = caps.get(1).or_else(|| caps.get(2));
                    // Pre-0.6 `function () external {}` is the fallback; without
                    // a body it is a function-typed variable
                    if named.is_none() && fragment.terminator != Terminator::Open {
                        continue;
                    }
                    let name = named.map_or("fallback", |m| m.as_str());
                    opens = Some(Opens::Body);
                    if !FILTER.accepts(name) {
                        continue;
                    }
                    let kind = if scopes.direct_container(fragment.depth).is_some() {
                        DeclarationKind::Method
                    } else {
                        DeclarationKind::Function
                    };
                    let open = head + caps.get(0).map_or(0, |m| m.end()) - 1;
                    let params = source.balanced_parens(open).and_then(normalize_parameters);
                    let decl = Declaration::new(scopes.qualify(name), kind, line)
                        .with_parameters(params);
                    record(&mut found, decl, &lines);
                    continue;
                }

                if BODY_ONLY_RE.is_match(text) {
                    opens = Some(Opens::Body);
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
    let comment = leading_comment(lines, decl.line, CommentStyle::CFamily, &[]);
    found.insert(decl.with_comment(comment));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(content: &str) -> Vec<Declaration> {
        SolidityExtractor.scan(content).unwrap()
    }

    #[test]
    fn test_contract_functions() {
        let content = r#"
// SPDX-License-Identifier: MIT
pragma solidity ^0.8.0;

/// @title A simple token
contract Token {
    mapping(address => uint256) balances;

    constructor(uint256 supply) {
        balances[msg.sender] = supply;
    }

    /// @notice Move tokens
    function transfer(address to, uint256 amount) public returns (bool) {
        return true;
    }

    function _move(address from) internal {}

    receive() external payable {}
}
"#;
        let decls = SolidityExtractor.scan(content).unwrap();
        let names: Vec<&str> = decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Token", "Token.transfer", "Token.receive"]);
        assert_eq!(decls[0].kind, DeclarationKind::Contract);
        assert_eq!(decls[0].leading_comment.as_deref(), Some("@title A simple token"));
        assert_eq!(decls[1].kind, DeclarationKind::Method);
        assert_eq!(decls[1].parameters.as_deref(), Some("address to, uint256 amount"));
        assert_eq!(decls[1].leading_comment.as_deref(), Some("@notice Move tokens"));
    }

    #[test]
    fn test_interfaces_libraries_and_free_functions() {
        let content = r#"
interface IERC20 {
    function totalSupply() external view returns (uint256);
}

abstract contract Base {}

library SafeMath {
    function add(uint a, uint b) internal pure returns (uint) { return a + b; }
}

function freeHelper(uint x) pure returns (uint) { return x; }
"#;
        let decls = extract(content);
        let summary: Vec<(&str, DeclarationKind)> =
            decls.iter().map(|d| (d.name.as_str(), d.kind)).collect();
        assert_eq!(
            summary,
            vec![
                ("IERC20", DeclarationKind::Interface),
                ("IERC20.totalSupply", DeclarationKind::Method),
                ("Base", DeclarationKind::Contract),
                ("SafeMath", DeclarationKind::Contract),
                ("SafeMath.add", DeclarationKind::Method),
                ("freeHelper", DeclarationKind::Function),
            ]
        );
    }

    #[test]
    fn test_unnamed_legacy_fallback() {
        let content = "contract Old {\n    function (uint) external returns (uint) hook;\n    function () external payable {}\n}\n";
        let decls = extract(content);
        let names: Vec<&str> = decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Old", "Old.fallback"]);
        assert_eq!(decls[1].kind, DeclarationKind::Method);
        assert_eq!(decls[1].line, 3);
        assert_eq!(decls[1].parameters, None);
    }
}
