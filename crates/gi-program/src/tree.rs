//! Mixed-content trees and the surgery shared by tree engines
//!
//! A [`Node`] follows the element model of structural markup: leading
//! `text` sits before the first child and each child carries the `tail`
//! text that follows it inside its parent. Concatenating text in document
//! order ([`Node::itertext`]) reproduces the source.
//!
//! The free functions at the bottom edit a tree in place while keeping a
//! table of modification points (`Vec<Option<NodePath>>`) in sync.

use crate::engine::Placement;
use crate::path::{NodePath, PathStep};
use std::mem;

/// Element of a mixed-content tree
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Node {
    /// Element tag
    pub tag: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Text before the first child
    pub text: String,
    /// Child elements
    pub children: Vec<Node>,
    /// Text following this element inside its parent
    pub tail: String,
}

impl Node {
    /// Create an empty element
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Builder: set leading text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Builder: set trailing text
    #[must_use]
    pub fn with_tail(mut self, tail: impl Into<String>) -> Self {
        self.tail = tail.into();
        self
    }

    /// Builder: append a child
    #[must_use]
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Append text at the current end of this element's content
    ///
    /// Goes to `text` while there are no children, else to the last
    /// child's `tail`.
    pub fn push_text(&mut self, text: &str) {
        match self.children.last_mut() {
            Some(last) => last.tail.push_str(text),
            None => self.text.push_str(text),
        }
    }

    /// All text inside this element in document order (own tail excluded)
    #[must_use]
    pub fn itertext(&self) -> String {
        let mut out = String::new();
        self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) {
        out.push_str(&self.text);
        for child in &self.children {
            child.write_text(out);
            out.push_str(&child.tail);
        }
    }

    /// Serialize as markup (own tail excluded)
    #[must_use]
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out);
        out
    }

    fn write_markup(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            escape_into(value, true, out);
            out.push('"');
        }
        if self.text.is_empty() && self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        escape_into(&self.text, false, out);
        for child in &self.children {
            child.write_markup(out);
            escape_into(&child.tail, false, out);
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }

    /// Position within `children` of the child addressed by `step`
    #[must_use]
    pub fn position_of(&self, step: &PathStep) -> Option<usize> {
        self.children
            .iter()
            .enumerate()
            .filter(|(_, child)| child.tag == step.tag)
            .nth(step.index.checked_sub(1)?)
            .map(|(pos, _)| pos)
    }

    /// 1-based occurrence a child tagged `tag` would have at position `pos`
    #[must_use]
    pub fn occurrence_at(&self, pos: usize, tag: &str) -> usize {
        1 + self.children[..pos.min(self.children.len())]
            .iter()
            .filter(|child| child.tag == tag)
            .count()
    }

    /// Find the descendant addressed by `path`
    #[must_use]
    pub fn resolve(&self, path: &NodePath) -> Option<&Node> {
        path.steps().iter().try_fold(self, |node, step| {
            node.position_of(step).map(|pos| &node.children[pos])
        })
    }

    /// Find the descendant addressed by `path` (mutable)
    pub fn resolve_mut(&mut self, path: &NodePath) -> Option<&mut Node> {
        let mut node = self;
        for step in path.steps() {
            let pos = node.position_of(step)?;
            node = &mut node.children[pos];
        }
        Some(node)
    }

    /// Text preceding the addressed descendant in document order
    #[must_use]
    pub fn text_before(&self, path: &NodePath) -> Option<String> {
        let mut out = String::new();
        let mut node = self;
        for step in path.steps() {
            out.push_str(&node.text);
            let pos = node.position_of(step)?;
            for sibling in &node.children[..pos] {
                sibling.write_text(&mut out);
                out.push_str(&sibling.tail);
            }
            node = &node.children[pos];
        }
        Some(out)
    }

    /// Paths of all descendants in preorder, filtered by `keep`
    ///
    /// Filtered-out nodes still contribute to their siblings' occurrence
    /// numbering and their descendants are still visited.
    pub fn collect_paths(&self, keep: impl Fn(&Node) -> bool) -> Vec<NodePath> {
        let mut out = Vec::new();
        collect(self, &NodePath::root(), &keep, &mut out);
        out
    }
}

fn collect(node: &Node, prefix: &NodePath, keep: &impl Fn(&Node) -> bool, out: &mut Vec<NodePath>) {
    let mut seen: Vec<(&str, usize)> = Vec::new();
    for child in &node.children {
        let index = match seen.iter_mut().find(|(tag, _)| *tag == child.tag) {
            Some((_, count)) => {
                *count += 1;
                *count
            }
            None => {
                seen.push((child.tag.as_str(), 1));
                1
            }
        };
        let path = prefix.child(child.tag.clone(), index);
        if keep(child) {
            out.push(path.clone());
        }
        collect(child, &path, keep, out);
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

// ---------------------------------------------------------------------------
// Surgery
// ---------------------------------------------------------------------------

/// Renumber live points under `parent` whose step tagged `tag` has an
/// occurrence index of at least `from`.
fn shift_siblings(points: &mut [Option<NodePath>], parent: &NodePath, tag: &str, from: usize, delta: isize) {
    let depth = parent.len();
    for path in points.iter_mut().flatten() {
        if !parent.is_ancestor_of(path) {
            continue;
        }
        if let Some(step) = path.step_mut(depth) {
            if step.tag == tag && step.index >= from {
                step.index = step.index.saturating_add_signed(delta);
            }
        }
    }
}

/// Kill every live point at or below `path` (or strictly below, if `strict`)
fn invalidate(points: &mut [Option<NodePath>], path: &NodePath, strict: bool) {
    for slot in points.iter_mut() {
        let dead = slot.as_ref().is_some_and(|p| {
            if strict {
                path.is_ancestor_of(p)
            } else {
                path.is_prefix_of(p)
            }
        });
        if dead {
            *slot = None;
        }
    }
}

fn target_path(points: &[Option<NodePath>], point: usize) -> Option<NodePath> {
    points.get(point)?.clone().filter(|path| !path.is_empty())
}

/// Remove the node at `point`
///
/// Its tail merges into the previous sibling's tail, or into the parent's
/// text when it was the first child. The node's point and those of its
/// descendants die; later same-tag siblings shift down by one.
pub fn delete(root: &mut Node, points: &mut [Option<NodePath>], point: usize) -> Option<()> {
    let path = target_path(points, point)?;
    let (parent_path, step) = path.split_last()?;
    let parent = root.resolve_mut(&parent_path)?;
    let pos = parent.position_of(step)?;

    let removed = parent.children.remove(pos);
    if pos > 0 {
        parent.children[pos - 1].tail.push_str(&removed.tail);
    } else {
        parent.text.push_str(&removed.tail);
    }

    invalidate(points, &path, false);
    shift_siblings(points, &parent_path, &step.tag, step.index + 1, -1);
    Some(())
}

/// Replace the node at `point` with `fragment`, keeping the target's tail
///
/// Descendant points of the target die. If the tag changes, siblings of
/// both tags are renumbered and the target point follows the new tag.
pub fn replace(root: &mut Node, points: &mut [Option<NodePath>], point: usize, fragment: Node) -> Option<()> {
    let path = target_path(points, point)?;
    let (parent_path, step) = path.split_last()?;
    let parent = root.resolve_mut(&parent_path)?;
    let pos = parent.position_of(step)?;

    invalidate(points, &path, true);
    if fragment.tag != step.tag {
        let index = parent.occurrence_at(pos, &fragment.tag);
        shift_siblings(points, &parent_path, &step.tag, step.index + 1, -1);
        shift_siblings(points, &parent_path, &fragment.tag, index, 1);
        points[point] = Some(parent_path.child(fragment.tag.clone(), index));
    }

    let slot = &mut parent.children[pos];
    let tail = mem::take(&mut slot.tail);
    *slot = Node { tail, ..fragment };
    Some(())
}

/// Splice `fragment` next to the node at `point`, returning the new point
///
/// `gap` separates the two siblings: with [`Placement::Before`] it becomes
/// the new node's tail; with [`Placement::After`] the new node inherits the
/// target's tail and the target's tail becomes `gap`. Same-tag siblings at
/// or after the insertion index shift up by one.
pub fn insert(
    root: &mut Node,
    points: &mut Vec<Option<NodePath>>,
    point: usize,
    mut fragment: Node,
    placement: Placement,
    gap: &str,
) -> Option<usize> {
    let path = target_path(points, point)?;
    let (parent_path, step) = path.split_last()?;
    let parent = root.resolve_mut(&parent_path)?;
    let pos = parent.position_of(step)?;

    let at = match placement {
        Placement::Before => {
            fragment.tail = gap.to_string();
            pos
        }
        Placement::After => {
            let target = &mut parent.children[pos];
            fragment.tail = mem::replace(&mut target.tail, gap.to_string());
            pos + 1
        }
    };

    let index = parent.occurrence_at(at, &fragment.tag);
    let new_path = parent_path.child(fragment.tag.clone(), index);
    shift_siblings(points, &parent_path, &fragment.tag, index, 1);
    parent.children.insert(at, fragment);

    points.push(Some(new_path));
    Some(points.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// `./a[2]/b[1]` form
    fn p(s: &str) -> NodePath {
        s.trim_start_matches('.')
            .split('/')
            .filter(|step| !step.is_empty())
            .fold(NodePath::root(), |path, step| {
                let (tag, index) = step.trim_end_matches(']').split_once('[').unwrap();
                path.child(tag, index.parse().unwrap())
            })
    }

    /// `<root>c1<a>a1</a>c2<a>a2</a>c3</root>`
    fn sample() -> Node {
        Node::new("root")
            .with_text("c1")
            .with_child(Node::new("a").with_text("a1").with_tail("c2"))
            .with_child(Node::new("a").with_text("a2").with_tail("c3"))
    }

    fn all_points(root: &Node) -> Vec<Option<NodePath>> {
        root.collect_paths(|_| true).into_iter().map(Some).collect()
    }

    #[test]
    fn itertext_concatenates_in_document_order() {
        assert_eq!(sample().itertext(), "c1a1c2a2c3");
    }

    #[test]
    fn markup_serialization_escapes_and_self_closes() {
        let node = Node::new("r")
            .with_text("x < y & z")
            .with_child(Node::new("e").with_tail("!"));
        assert_eq!(node.to_markup(), "<r>x &lt; y &amp; z<e/>!</r>");
    }

    #[test]
    fn resolve_follows_per_tag_occurrence() {
        let root = Node::new("r")
            .with_child(Node::new("a").with_text("1"))
            .with_child(Node::new("b").with_text("2"))
            .with_child(Node::new("a").with_text("3"));
        assert_eq!(root.resolve(&p("./a[2]")).unwrap().text, "3");
        assert_eq!(root.resolve(&p("./b[1]")).unwrap().text, "2");
        assert!(root.resolve(&p("./b[2]")).is_none());
    }

    #[test]
    fn collect_paths_is_preorder() {
        let root = Node::new("r")
            .with_child(Node::new("a").with_child(Node::new("b")))
            .with_child(Node::new("a"));
        let paths: Vec<String> = root
            .collect_paths(|_| true)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(paths, vec!["./a[1]", "./a[1]/b[1]", "./a[2]"]);
    }

    #[test]
    fn delete_first_child_merges_tail_into_parent_text() {
        let mut root = sample();
        let mut points = all_points(&root);
        delete(&mut root, &mut points, 0).unwrap();

        assert_eq!(root.to_markup(), "<root>c1c2<a>a2</a>c3</root>");
        assert_eq!(points[0], None);
        assert_eq!(points[1], Some(p("./a[1]")));
        assert_eq!(root.resolve(points[1].as_ref().unwrap()).unwrap().text, "a2");
    }

    #[test]
    fn delete_later_child_merges_tail_into_previous_sibling() {
        let mut root = sample();
        let mut points = all_points(&root);
        delete(&mut root, &mut points, 1).unwrap();
        assert_eq!(root.to_markup(), "<root>c1<a>a1</a>c2c3</root>");
    }

    #[test]
    fn delete_twice_fails_on_dead_point() {
        let mut root = sample();
        let mut points = all_points(&root);
        assert!(delete(&mut root, &mut points, 0).is_some());
        assert!(delete(&mut root, &mut points, 0).is_none());
    }

    #[test]
    fn replace_keeps_target_tail_and_drops_subtree() {
        let mut root = Node::new("r")
            .with_child(Node::new("a").with_child(Node::new("x")).with_tail("T1"))
            .with_child(Node::new("a").with_text("donor").with_tail("T2"));
        let mut points = all_points(&root);
        let donor = root.resolve(&p("./a[2]")).unwrap().clone();
        replace(&mut root, &mut points, 0, donor).unwrap();

        assert_eq!(root.to_markup(), "<r><a>donor</a>T1<a>donor</a>T2</r>");
        // ./a[1]/x[1] died with the replaced subtree
        assert_eq!(points[1], None);
        assert_eq!(points[0], Some(p("./a[1]")));
    }

    #[test]
    fn replace_with_other_tag_renumbers_both_tags() {
        let mut root = Node::new("r")
            .with_child(Node::new("a").with_text("1"))
            .with_child(Node::new("a").with_text("2"))
            .with_child(Node::new("b").with_text("3"));
        let mut points = all_points(&root);
        replace(&mut root, &mut points, 0, Node::new("b").with_text("new")).unwrap();

        assert_eq!(points[0], Some(p("./b[1]")));
        assert_eq!(points[1], Some(p("./a[1]")));
        assert_eq!(points[2], Some(p("./b[2]")));
        for (point, text) in [(0, "new"), (1, "2"), (2, "3")] {
            let path = points[point].as_ref().unwrap();
            assert_eq!(root.resolve(path).unwrap().text, text);
        }
    }

    #[test]
    fn insert_before_shifts_same_tag_siblings() {
        let mut root = sample();
        let mut points = all_points(&root);
        let fresh = Node::new("a").with_text("new");
        let new_point = insert(&mut root, &mut points, 1, fresh, Placement::Before, "").unwrap();

        assert_eq!(new_point, 2);
        assert_eq!(root.to_markup(), "<root>c1<a>a1</a>c2<a>new</a><a>a2</a>c3</root>");
        assert_eq!(points[1], Some(p("./a[3]")));
        assert_eq!(points[2], Some(p("./a[2]")));
        assert_eq!(root.resolve(points[1].as_ref().unwrap()).unwrap().text, "a2");
    }

    #[test]
    fn insert_after_takes_over_target_tail() {
        let mut root = sample();
        let mut points = all_points(&root);
        let fresh = Node::new("a").with_text("new");
        insert(&mut root, &mut points, 0, fresh, Placement::After, "").unwrap();

        assert_eq!(root.to_markup(), "<root>c1<a>a1</a><a>new</a>c2<a>a2</a>c3</root>");
        assert_eq!(points[0], Some(p("./a[1]")));
        assert_eq!(points[1], Some(p("./a[3]")));
        assert_eq!(points[2], Some(p("./a[2]")));
    }

    #[test]
    fn insert_renumbers_descendants_of_shifted_siblings() {
        let mut root = Node::new("r")
            .with_child(Node::new("a"))
            .with_child(Node::new("a").with_child(Node::new("b").with_text("deep")));
        let mut points = all_points(&root);
        insert(&mut root, &mut points, 0, Node::new("a"), Placement::Before, "").unwrap();

        assert_eq!(points[2], Some(p("./a[3]/b[1]")));
        assert_eq!(root.resolve(points[2].as_ref().unwrap()).unwrap().text, "deep");
    }

    #[test]
    fn text_before_reports_preceding_document_text() {
        let root = sample();
        assert_eq!(root.text_before(&p("./a[2]")).unwrap(), "c1a1c2");
    }
}
