//! View positions and ranges.
//!
//! A view position is a path of child indices from the fragment root; the
//! last entry is an index among the parent's children, or a character offset
//! when the parent is a text node.

use crate::error::{ViewError, ViewResult};
use crate::node::{ViewElement, ViewNode, ViewText};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewPosition {
    pub path: Vec<usize>,
}

/// What a position points into
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewParent<'a> {
    Element(&'a ViewElement),
    Text(&'a ViewText),
}

impl ViewPosition {
    pub fn new(path: Vec<usize>) -> Self {
        debug_assert!(!path.is_empty(), "view position path cannot be empty");
        Self { path }
    }

    /// Position at `offset` inside the parent at `parent_path`
    pub fn at(parent_path: &[usize], offset: usize) -> Self {
        let mut path = parent_path.to_vec();
        path.push(offset);
        Self { path }
    }

    pub fn offset(&self) -> usize {
        self.path.last().copied().unwrap_or(0)
    }

    pub fn parent_path(&self) -> &[usize] {
        &self.path[..self.path.len().saturating_sub(1)]
    }

    pub fn with_offset(&self, offset: usize) -> Self {
        Self::at(self.parent_path(), offset)
    }

    pub fn has_same_parent_as(&self, other: &ViewPosition) -> bool {
        self.parent_path() == other.parent_path()
    }

    pub fn parent<'a>(&self, root: &'a ViewElement) -> ViewResult<ViewParent<'a>> {
        let invalid = || ViewError::InvalidPosition(self.path.clone());
        let parent = if self.parent_path().is_empty() {
            ViewParent::Element(root)
        } else {
            match root.node_at(self.parent_path()).ok_or_else(invalid)? {
                ViewNode::Element(element) => ViewParent::Element(element),
                ViewNode::Text(text) => ViewParent::Text(text),
            }
        };

        let max = match parent {
            ViewParent::Element(element) => element.child_count(),
            ViewParent::Text(text) => text.len(),
        };
        if self.offset() > max {
            return Err(invalid());
        }
        Ok(parent)
    }

    pub fn is_in_text(&self, root: &ViewElement) -> bool {
        matches!(self.parent(root), Ok(ViewParent::Text(_)))
    }

    pub fn node_after<'a>(&self, root: &'a ViewElement) -> Option<&'a ViewNode> {
        match self.parent(root).ok()? {
            ViewParent::Element(element) => element.children.get(self.offset()),
            ViewParent::Text(_) => None,
        }
    }

    pub fn node_before<'a>(&self, root: &'a ViewElement) -> Option<&'a ViewNode> {
        match self.parent(root).ok()? {
            ViewParent::Element(element) if self.offset() > 0 => element.children.get(self.offset() - 1),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRange {
    pub start: ViewPosition,
    pub end: ViewPosition,
}

impl ViewRange {
    pub fn new(start: ViewPosition, end: ViewPosition) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    pub fn collapsed(position: ViewPosition) -> Self {
        Self {
            start: position.clone(),
            end: position,
        }
    }

    /// Range spanning the child at `index` of `parent_path`
    pub fn on_child(parent_path: &[usize], index: usize) -> Self {
        Self {
            start: ViewPosition::at(parent_path, index),
            end: ViewPosition::at(parent_path, index + 1),
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn is_flat(&self) -> bool {
        self.start.has_same_parent_as(&self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> ViewElement {
        ViewElement::container("$root").with_child(
            ViewElement::container("p")
                .with_child(ViewNode::text("foo"))
                .with_child(ViewElement::attribute_element("b", 10).with_child(ViewNode::text("bar"))),
        )
    }

    #[test]
    fn test_resolve_parent() {
        let root = root();

        assert!(matches!(
            ViewPosition::new(vec![0, 1]).parent(&root),
            Ok(ViewParent::Element(p)) if p.name == "p"
        ));
        assert!(ViewPosition::new(vec![0, 0, 2]).is_in_text(&root));
        assert!(ViewPosition::new(vec![0, 3]).parent(&root).is_err());
        assert!(ViewPosition::new(vec![0, 0, 4]).parent(&root).is_err());
    }

    #[test]
    fn test_nodes_around() {
        let root = root();
        let position = ViewPosition::new(vec![0, 1]);

        assert_eq!(position.node_before(&root).map(ViewNode::name), Some("$text"));
        assert_eq!(position.node_after(&root).map(ViewNode::name), Some("b"));
    }

    #[test]
    fn test_range_is_ordered() {
        let range = ViewRange::new(ViewPosition::new(vec![1]), ViewPosition::new(vec![0, 2]));

        assert_eq!(range.start.path, vec![0, 2]);
        assert!(!range.is_flat());
        assert!(ViewRange::on_child(&[0], 1).is_flat());
    }
}
