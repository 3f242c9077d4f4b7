//! Statement granularity
//!
//! Source files are parsed with tree-sitter and converted into the same
//! mixed-content [`Node`] trees the markup engine edits: every named CST
//! node becomes an element tagged with its grammar kind, and the source
//! text between named nodes becomes element text or tail. Rendering an
//! unmodified tree therefore reproduces the file byte for byte.
//!
//! Only statement-like nodes are modification points.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::{Engine, Placement, Sheet};
use crate::error::ProgramError;
use crate::path::NodePath;
use crate::tree::{self, Node};

/// Languages with a statement grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    /// Rust (`.rs`)
    Rust,
    /// TypeScript (`.ts`, `.tsx`)
    TypeScript,
    /// Python (`.py`)
    Python,
    /// Go (`.go`)
    Go,
}

impl Language {
    /// Detect language from file extension
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.') {
            "rs" => Some(Language::Rust),
            "ts" | "tsx" => Some(Language::TypeScript),
            "py" => Some(Language::Python),
            "go" => Some(Language::Go),
            _ => None,
        }
    }

    /// Detect language from a file path
    #[must_use]
    pub fn from_path(file: &str) -> Option<Self> {
        let (_, ext) = file.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    /// Get tree-sitter language
    #[must_use]
    pub fn tree_sitter_language(&self) -> tree_sitter::Language {
        match self {
            Language::Rust => tree_sitter_rust::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::Go => tree_sitter_go::LANGUAGE.into(),
        }
    }

    /// Whether nodes of grammar kind `kind` are statements
    #[must_use]
    pub fn is_statement(&self, kind: &str) -> bool {
        if kind.ends_with("_statement") {
            return true;
        }
        match self {
            Language::Rust => matches!(kind, "let_declaration"),
            Language::TypeScript => matches!(kind, "lexical_declaration" | "variable_declaration"),
            Language::Go => matches!(kind, "short_var_declaration" | "var_declaration"),
            Language::Python => false,
        }
    }
}

/// Engine over tree-sitter statement trees
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementEngine;

impl Engine for StatementEngine {
    type Content = Node;
    type Location = NodePath;
    type Fragment = Node;

    const NAME: &'static str = "statement";

    fn parse(&self, file: &str, source: &str) -> Result<Sheet<Self>, ProgramError> {
        let language =
            Language::from_path(file).ok_or_else(|| ProgramError::UnsupportedLanguage(file.to_string()))?;

        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&language.tree_sitter_language())
            .map_err(|e| ProgramError::ParserInit(e.to_string()))?;
        let parsed = parser.parse(source, None).ok_or_else(|| ProgramError::Syntax {
            file: file.to_string(),
        })?;
        let cst = parsed.root_node();
        if cst.has_error() {
            return Err(ProgramError::Syntax {
                file: file.to_string(),
            });
        }

        let mut root = convert(cst, source);
        // text outside the root node's span
        root.text.insert_str(0, source.get(..cst.start_byte()).unwrap_or_default());
        root.push_text(source.get(cst.end_byte()..).unwrap_or_default());

        let points = root.collect_paths(|node| language.is_statement(&node.tag));
        debug!(file, ?language, points = points.len(), "parsed statement tree");
        Ok(Sheet::new(root, points))
    }

    fn render(&self, content: &Node) -> String {
        content.itertext()
    }

    fn describe(&self, content: &Node, location: &NodePath) -> Option<String> {
        content.resolve(location).map(Node::itertext)
    }

    fn compatible(&self, target: (&Node, &NodePath), ingredient: (&Node, &NodePath)) -> bool {
        target.0.resolve(target.1).is_some() && ingredient.0.resolve(ingredient.1).is_some()
    }

    fn encloses(&self, outer: &NodePath, inner: &NodePath) -> bool {
        outer.is_ancestor_of(inner)
    }

    fn extract(&self, content: &Node, location: &NodePath) -> Option<Node> {
        content.resolve(location).cloned()
    }

    fn delete(&self, sheet: &mut Sheet<Self>, point: usize) -> Option<()> {
        tree::delete(&mut sheet.content, &mut sheet.points, point)
    }

    fn replace(&self, sheet: &mut Sheet<Self>, point: usize, fragment: Node) -> Option<()> {
        tree::replace(&mut sheet.content, &mut sheet.points, point, fragment)
    }

    fn insert(&self, sheet: &mut Sheet<Self>, point: usize, fragment: Node, placement: Placement) -> Option<usize> {
        let path = sheet.location(point)?;
        let gap = line_break(&sheet.content.text_before(path)?);
        tree::insert(&mut sheet.content, &mut sheet.points, point, fragment, placement, &gap)
    }
}

/// Newline plus the indentation of the line the next statement starts on
fn line_break(preceding: &str) -> String {
    let line = preceding.rsplit('\n').next().unwrap_or_default();
    let indent_len = line.len() - line.trim_start().len();
    format!("\n{}", &line[..indent_len])
}

fn convert(cst: tree_sitter::Node<'_>, source: &str) -> Node {
    let mut node = Node::new(cst.kind());
    let mut offset = cst.start_byte();
    let mut cursor = cst.walk();
    for child in cst.named_children(&mut cursor) {
        node.push_text(source.get(offset..child.start_byte()).unwrap_or_default());
        node.children.push(convert(child, source));
        offset = child.end_byte();
    }
    node.push_text(source.get(offset..cst.end_byte()).unwrap_or_default());
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RUST_SOURCE: &str = "fn main() {\n    let a = 1;\n    let b = a + 1;\n    println!(\"{}\", b);\n}\n";

    fn points(sheet: &Sheet<StatementEngine>) -> Vec<String> {
        sheet
            .points
            .iter()
            .flatten()
            .filter_map(|p| StatementEngine.describe(&sheet.content, p))
            .collect()
    }

    #[test]
    fn language_from_path() {
        assert_eq!(Language::from_path("src/lib.rs"), Some(Language::Rust));
        assert_eq!(Language::from_path("a/b.tsx"), Some(Language::TypeScript));
        assert_eq!(Language::from_path("x.py"), Some(Language::Python));
        assert_eq!(Language::from_path("Makefile"), None);
    }

    #[test]
    fn unmodified_tree_renders_source_verbatim() {
        let sheet = StatementEngine.parse("main.rs", RUST_SOURCE).unwrap();
        assert_eq!(StatementEngine.render(&sheet.content), RUST_SOURCE);
    }

    #[test]
    fn rust_statements_are_points() {
        let sheet = StatementEngine.parse("main.rs", RUST_SOURCE).unwrap();
        assert_eq!(
            points(&sheet),
            vec!["let a = 1;", "let b = a + 1;", "println!(\"{}\", b);"]
        );
    }

    #[test]
    fn python_statements_are_points() {
        let source = "def f(x):\n    y = x + 1\n    return y\n";
        let sheet = StatementEngine.parse("f.py", source).unwrap();
        assert_eq!(StatementEngine.render(&sheet.content), source);
        let described = points(&sheet);
        assert!(described.contains(&"return y".to_string()));
        assert!(described.contains(&"y = x + 1".to_string()));
    }

    #[test]
    fn delete_statement_removes_its_text() {
        let mut sheet = StatementEngine.parse("main.rs", RUST_SOURCE).unwrap();
        StatementEngine.delete(&mut sheet, 1).unwrap();
        assert_eq!(
            StatementEngine.render(&sheet.content),
            "fn main() {\n    let a = 1;\n    \n    println!(\"{}\", b);\n}\n"
        );
    }

    #[test]
    fn insert_before_uses_line_indentation() {
        let mut sheet = StatementEngine.parse("main.rs", RUST_SOURCE).unwrap();
        let copy = StatementEngine
            .extract(&sheet.content, sheet.location(2).unwrap())
            .unwrap();
        StatementEngine.insert(&mut sheet, 0, copy, Placement::Before).unwrap();
        assert_eq!(
            StatementEngine.render(&sheet.content),
            "fn main() {\n    println!(\"{}\", b);\n    let a = 1;\n    let b = a + 1;\n    println!(\"{}\", b);\n}\n"
        );
        // the shifted original statement still resolves to itself
        assert_eq!(
            StatementEngine.describe(&sheet.content, sheet.location(2).unwrap()).unwrap(),
            "println!(\"{}\", b);"
        );
    }

    const PY_FLAT: &str = "a = 1\nb = 2\nc = 3\nprint(a)\n";

    fn statement(index: usize) -> NodePath {
        NodePath::root().child("expression_statement", index)
    }

    #[test]
    fn insert_adds_one_point_and_renumbers_later_siblings() {
        let mut sheet = StatementEngine.parse("f.py", PY_FLAT).unwrap();
        assert_eq!(sheet.live_points(), 4);
        let copy = StatementEngine
            .extract(&sheet.content, sheet.location(3).unwrap())
            .unwrap();

        let new_point = StatementEngine.insert(&mut sheet, 1, copy, Placement::Before).unwrap();
        assert_eq!(new_point, 4);
        assert_eq!(sheet.live_points(), 5);
        assert_eq!(sheet.location(4), Some(&statement(2)));
        assert_eq!(sheet.location(0), Some(&statement(1)));
        assert_eq!(sheet.location(1), Some(&statement(3)));
        assert_eq!(sheet.location(3), Some(&statement(5)));
        assert_eq!(StatementEngine.describe(&sheet.content, &statement(3)).unwrap(), "b = 2");
        assert_eq!(
            StatementEngine.render(&sheet.content),
            "a = 1\nprint(a)\nb = 2\nc = 3\nprint(a)\n"
        );
    }

    #[test]
    fn delete_removes_one_point_and_renumbers_later_siblings() {
        let mut sheet = StatementEngine.parse("f.py", PY_FLAT).unwrap();
        StatementEngine.delete(&mut sheet, 1).unwrap();

        assert_eq!(sheet.live_points(), 3);
        assert_eq!(sheet.location(1), None);
        assert_eq!(sheet.location(0), Some(&statement(1)));
        assert_eq!(sheet.location(2), Some(&statement(2)));
        assert_eq!(sheet.location(3), Some(&statement(3)));
        assert_eq!(StatementEngine.describe(&sheet.content, &statement(2)).unwrap(), "c = 3");
        assert_eq!(StatementEngine.render(&sheet.content), "a = 1\n\nc = 3\nprint(a)\n");
        assert!(StatementEngine.delete(&mut sheet, 1).is_none());
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        assert!(matches!(
            StatementEngine.parse("notes.txt", "hello"),
            Err(ProgramError::UnsupportedLanguage(_))
        ));
    }

    #[test]
    fn syntax_errors_are_rejected() {
        assert!(matches!(
            StatementEngine.parse("bad.rs", "fn main( {"),
            Err(ProgramError::Syntax { .. })
        ));
    }
}
