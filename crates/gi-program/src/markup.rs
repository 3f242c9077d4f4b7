//! Generic-tree granularity over structural markup
//!
//! Sources are XML-like documents produced by a language-agnostic
//! converter (e.g. srcML). Every element below the root is a modification
//! point; scratch copies receive the text with all markup stripped.

use crate::engine::{Engine, Placement, Sheet};
use crate::error::ProgramError;
use crate::path::NodePath;
use crate::tree::{self, Node};

/// Engine over markup element trees
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupEngine;

impl Engine for MarkupEngine {
    type Content = Node;
    type Location = NodePath;
    type Fragment = Node;

    const NAME: &'static str = "markup";

    fn parse(&self, file: &str, source: &str) -> Result<Sheet<Self>, ProgramError> {
        let root = parse(source).map_err(|source| ProgramError::Markup {
            file: file.to_string(),
            source,
        })?;
        let points = root.collect_paths(|_| true);
        Ok(Sheet::new(root, points))
    }

    fn render(&self, content: &Node) -> String {
        content.itertext()
    }

    fn output_name(&self, file: &str) -> String {
        file.strip_suffix(".xml").unwrap_or(file).to_string()
    }

    fn describe(&self, content: &Node, location: &NodePath) -> Option<String> {
        content.resolve(location).map(Node::to_markup)
    }

    fn compatible(&self, target: (&Node, &NodePath), ingredient: (&Node, &NodePath)) -> bool {
        match (target.0.resolve(target.1), ingredient.0.resolve(ingredient.1)) {
            (Some(t), Some(i)) => t.tag == i.tag,
            _ => false,
        }
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
        tree::insert(&mut sheet.content, &mut sheet.points, point, fragment, placement, "")
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Parse a markup document into its root element
///
/// Comments and processing instructions are dropped, CDATA becomes text
/// and a default `xmlns` declaration is stripped so tags stay unqualified.
///
/// # Errors
/// Returns error on malformed markup
pub fn parse(source: &str) -> Result<Node, MarkupError> {
    let mut reader = Reader {
        src: source,
        pos: 0,
    };
    reader.skip_misc()?;
    let root = reader.element()?;
    reader.skip_misc()?;
    if reader.pos < reader.src.len() {
        return Err(reader.error("content after root element"));
    }
    Ok(root)
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn error(&self, message: &str) -> MarkupError {
        MarkupError::Malformed {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<(), MarkupError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{token}'")))
        }
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    /// Consume up to and including `end`, returning the skipped text
    fn until(&mut self, end: &str) -> Result<&'a str, MarkupError> {
        let rest = self.rest();
        let at = rest.find(end).ok_or(MarkupError::UnexpectedEof)?;
        self.pos += at + end.len();
        Ok(&rest[..at])
    }

    /// Skip whitespace, comments, processing instructions and doctype
    fn skip_misc(&mut self) -> Result<(), MarkupError> {
        loop {
            self.skip_whitespace();
            if self.eat("<!--") {
                self.until("-->")?;
            } else if self.eat("<?") {
                self.until("?>")?;
            } else if self.eat("<!DOCTYPE") {
                self.until(">")?;
            } else {
                return Ok(());
            }
        }
    }

    fn name(&mut self) -> Result<&'a str, MarkupError> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '/' | '>' | '=' | '<'))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.error("expected a name"));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn element(&mut self) -> Result<Node, MarkupError> {
        self.expect("<")?;
        let mut node = Node::new(self.name()?);

        loop {
            self.skip_whitespace();
            if self.eat("/>") {
                return Ok(node);
            }
            if self.eat(">") {
                break;
            }
            let name = self.name()?.to_string();
            self.skip_whitespace();
            self.expect("=")?;
            self.skip_whitespace();
            let quote = if self.eat("\"") {
                "\""
            } else if self.eat("'") {
                "'"
            } else {
                return Err(self.error("expected quoted attribute value"));
            };
            let offset = self.pos;
            let raw = self.until(quote)?;
            // default namespace; keeps tags unqualified
            if name == "xmlns" {
                continue;
            }
            node.attributes.push((name, unescape(raw, offset)?));
        }

        loop {
            let rest = self.rest();
            let text_len = rest.find('<').ok_or(MarkupError::UnexpectedEof)?;
            if text_len > 0 {
                let offset = self.pos;
                self.pos += text_len;
                node.push_text(&unescape(&rest[..text_len], offset)?);
            }

            if self.eat("</") {
                let offset = self.pos;
                let closing = self.name()?;
                if closing != node.tag {
                    return Err(MarkupError::MismatchedTag {
                        expected: node.tag,
                        found: closing.to_string(),
                        offset,
                    });
                }
                self.skip_whitespace();
                self.expect(">")?;
                return Ok(node);
            } else if self.eat("<!--") {
                self.until("-->")?;
            } else if self.eat("<![CDATA[") {
                let text = self.until("]]>")?;
                node.push_text(text);
            } else if self.eat("<?") {
                self.until("?>")?;
            } else {
                let child = self.element()?;
                node.children.push(child);
            }
        }
    }
}

fn unescape(raw: &str, offset: usize) -> Result<String, MarkupError> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after.find(';').ok_or(MarkupError::Malformed {
            offset: offset + raw.len() - rest.len() + amp,
            message: "unterminated entity".to_string(),
        })?;
        let entity = &after[..semi];
        let decoded = match entity {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .map(|hex| u32::from_str_radix(hex, 16))
                .or_else(|| entity.strip_prefix('#').map(str::parse::<u32>))
                .and_then(Result::ok)
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => out.push(c),
            None => return Err(MarkupError::UnknownEntity(entity.to_string())),
        }
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Errors raised while reading markup
#[derive(Debug, thiserror::Error)]
pub enum MarkupError {
    /// Structurally invalid input
    #[error("malformed markup at byte {offset}: {message}")]
    Malformed {
        /// Byte offset of the problem
        offset: usize,
        /// What was wrong
        message: String,
    },

    /// Closing tag does not match the open element
    #[error("mismatched closing tag at byte {offset}: expected </{expected}>, found </{found}>")]
    MismatchedTag {
        /// Open element
        expected: String,
        /// Closing tag seen
        found: String,
        /// Byte offset of the closing tag name
        offset: usize,
    },

    /// Entity reference that is neither predefined nor numeric
    #[error("unknown entity: &{0};")]
    UnknownEntity(String),

    /// Input ended inside a construct
    #[error("unexpected end of input")]
    UnexpectedEof,
}
