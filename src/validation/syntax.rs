//! Syntax gate for generated source code
//!
//! Code actions are parsed with tree-sitter before they are written anywhere.
//! A parse containing an ERROR or MISSING node is rejected with the position of
//! the first such node.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Parser};

use crate::validation::Rejection;

/// Language a code session writes in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLanguage {
    #[default]
    Python,
    Rust,
}

impl SourceLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceLanguage::Python => "python",
            SourceLanguage::Rust => "rust",
        }
    }
}

impl std::fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

thread_local! {
    static PYTHON_PARSER: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        // A failure here surfaces as a None tree at parse time
        let _ = p.set_language(&tree_sitter_python::LANGUAGE.into());
        p
    });

    static RUST_PARSER: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        let _ = p.set_language(&tree_sitter_rust::LANGUAGE.into());
        p
    });
}

/// Check that `source` parses cleanly as `language`
pub fn check_syntax(source: &str, language: SourceLanguage) -> Result<(), Rejection> {
    let tree = match language {
        SourceLanguage::Python => PYTHON_PARSER.with(|p| p.borrow_mut().parse(source, None)),
        SourceLanguage::Rust => RUST_PARSER.with(|p| p.borrow_mut().parse(source, None)),
    };

    let Some(tree) = tree else {
        return Err(Rejection::SyntaxInvalid {
            language,
            line: 1,
            column: 1,
            message: "parser produced no tree".to_string(),
        });
    };

    let root = tree.root_node();
    if !root.has_error() {
        return Ok(());
    }

    let node = first_error(root).unwrap_or(root);
    let position = node.start_position();
    Err(Rejection::SyntaxInvalid {
        language,
        line: position.row + 1,
        column: position.column + 1,
        message: describe(node, source),
    })
}

/// Depth-first search for the first ERROR or MISSING node
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error(child) {
            return Some(found);
        }
    }
    None
}

fn describe(node: Node<'_>, source: &str) -> String {
    if node.is_missing() {
        return format!("missing `{}`", node.kind());
    }
    let snippet: String = source
        .get(node.byte_range())
        .unwrap_or_default()
        .lines()
        .next()
        .unwrap_or_default()
        .chars()
        .take(40)
        .collect();
    if snippet.trim().is_empty() {
        "unexpected end of input".to_string()
    } else {
        format!("unexpected `{}`", snippet.trim())
    }
}
