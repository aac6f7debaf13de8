//! # Model positions
//!
//! A position is a path of offsets from a root element. Every entry but the
//! last addresses an element by its offset in its parent; the last entry is
//! the offset inside the parent and may fall inside a text node.
//!
//! Positions in the same root are ordered by comparing paths
//! lexicographically. Positions in different roots do not compare.

use crate::error::{ModelError, ModelResult};
use crate::node::{Element, Node, Text};
use crate::tree;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Root name used by positions inside a document fragment
pub const FRAGMENT_ROOT: &str = "$fragment";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub root: String,
    pub path: Vec<usize>,
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.root != other.root {
            return None;
        }
        Some(self.path.cmp(&other.path))
    }
}

impl Position {
    pub fn new(root: impl Into<String>, path: Vec<usize>) -> Self {
        debug_assert!(!path.is_empty(), "position path cannot be empty");
        Self {
            root: root.into(),
            path,
        }
    }

    /// Position at `offset` inside the root itself
    pub fn at_root(root: impl Into<String>, offset: usize) -> Self {
        Self::new(root, vec![offset])
    }

    pub fn in_fragment(path: Vec<usize>) -> Self {
        Self::new(FRAGMENT_ROOT, path)
    }

    pub fn offset(&self) -> usize {
        self.path.last().copied().unwrap_or(0)
    }

    /// Path of the parent element, relative to the root
    pub fn parent_path(&self) -> &[usize] {
        &self.path[..self.path.len().saturating_sub(1)]
    }

    /// Index of the last path entry
    pub fn depth(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub fn with_offset(&self, offset: usize) -> Self {
        let mut path = self.path.clone();
        if let Some(last) = path.last_mut() {
            *last = offset;
        }
        Self {
            root: self.root.clone(),
            path,
        }
    }

    pub fn shifted_by(&self, delta: isize) -> Self {
        let offset = (self.offset() as isize + delta).max(0) as usize;
        self.with_offset(offset)
    }

    /// Position inside the element that starts at this position
    pub fn child(&self, offset: usize) -> Self {
        let mut path = self.path.clone();
        path.push(offset);
        Self {
            root: self.root.clone(),
            path,
        }
    }

    /// Position before the parent element, `None` at root level
    pub fn parent_position(&self) -> Option<Self> {
        if self.path.len() < 2 {
            return None;
        }
        Some(Self {
            root: self.root.clone(),
            path: self.parent_path().to_vec(),
        })
    }

    pub fn has_same_parent_as(&self, other: &Position) -> bool {
        self.root == other.root && self.parent_path() == other.parent_path()
    }

    pub fn is_before(&self, other: &Position) -> bool {
        self.partial_cmp(other) == Some(Ordering::Less)
    }

    pub fn is_after(&self, other: &Position) -> bool {
        self.partial_cmp(other) == Some(Ordering::Greater)
    }

    pub fn parent<'a>(&self, root: &'a Element) -> ModelResult<&'a Element> {
        tree::descend(root, self.parent_path())
            .filter(|parent| self.offset() <= parent.max_offset())
            .ok_or_else(|| ModelError::invalid_position(self.root.clone(), &self.path))
    }

    /// Node that starts exactly at this position
    pub fn node_after<'a>(&self, root: &'a Element) -> Option<&'a Node> {
        let parent = self.parent(root).ok()?;
        match parent.child_at_offset(self.offset()) {
            Some((index, start)) if start == self.offset() => parent.children.get(index),
            _ => None,
        }
    }

    /// Node that ends exactly at this position
    pub fn node_before<'a>(&self, root: &'a Element) -> Option<&'a Node> {
        let parent = self.parent(root).ok()?;
        let offset = self.offset();
        if offset == 0 {
            return None;
        }
        match parent.child_at_offset(offset - 1) {
            Some((index, start)) if start + parent.children[index].offset_size() == offset => {
                parent.children.get(index)
            }
            _ => None,
        }
    }

    /// Text node the position falls strictly inside of
    pub fn text_node<'a>(&self, root: &'a Element) -> Option<&'a Text> {
        let parent = self.parent(root).ok()?;
        match parent.child_at_offset(self.offset()) {
            Some((index, start)) if start < self.offset() => parent.children[index].as_text(),
            _ => None,
        }
    }

    pub fn is_at_start(&self) -> bool {
        self.offset() == 0
    }

    pub fn is_at_end(&self, root: &Element) -> bool {
        self.parent(root)
            .map(|parent| parent.max_offset() == self.offset())
            .unwrap_or(false)
    }

    /// Whether `self` lies inside the span `[offset, offset + how_many)` of the
    /// parent `at` addresses, either strictly between its boundaries on the
    /// same level or anywhere within one of its nodes.
    pub fn is_inside_span(&self, at: &Position, how_many: usize) -> bool {
        if self.root != at.root || self.path.len() < at.path.len() {
            return false;
        }
        let depth = at.depth();
        if self.path[..depth] != at.path[..depth] {
            return false;
        }
        let start = at.offset();
        let end = start + how_many;
        if self.path.len() == at.path.len() {
            self.offset() > start && self.offset() < end
        } else {
            self.path[depth] >= start && self.path[depth] < end
        }
    }

    /// Position after `how_many` offsets were inserted at `at`.
    ///
    /// With `shift_if_equal` a position equal to `at` moves past the inserted
    /// content, otherwise it stays in front of it.
    pub fn transformed_by_insertion(&self, at: &Position, how_many: usize, shift_if_equal: bool) -> Position {
        if self.root != at.root || how_many == 0 || self.path.len() < at.path.len() {
            return self.clone();
        }
        let depth = at.depth();
        if self.path[..depth] != at.path[..depth] {
            return self.clone();
        }

        let offset = self.path[depth];
        let shift = if self.path.len() == at.path.len() {
            offset > at.offset() || (offset == at.offset() && shift_if_equal)
        } else {
            offset >= at.offset()
        };

        let mut transformed = self.clone();
        if shift {
            transformed.path[depth] += how_many;
        }
        transformed
    }

    /// Position after `how_many` offsets were removed at `at`, or `None` when
    /// the position was inside the removed content.
    pub fn transformed_by_deletion(&self, at: &Position, how_many: usize) -> Option<Position> {
        if self.root != at.root || how_many == 0 || self.path.len() < at.path.len() {
            return Some(self.clone());
        }
        let depth = at.depth();
        if self.path[..depth] != at.path[..depth] {
            return Some(self.clone());
        }
        if self.is_inside_span(at, how_many) {
            return None;
        }

        let mut transformed = self.clone();
        if self.path[depth] >= at.offset() + how_many {
            transformed.path[depth] -= how_many;
        }
        Some(transformed)
    }

    /// Path relative to the removed span at `at`, as a position inside a
    /// fragment holding the removed nodes.
    pub fn relative_to_span(&self, at: &Position) -> Position {
        let depth = at.depth();
        let mut path = self.path[depth..].to_vec();
        path[0] -= at.offset();
        Position::in_fragment(path)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{:?}", self.root, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(path: &[usize]) -> Position {
        Position::new("main", path.to_vec())
    }

    #[test]
    fn test_ordering() {
        assert!(pos(&[0]) < pos(&[0, 0]));
        assert!(pos(&[0, 5]) < pos(&[1]));
        assert!(pos(&[2]) > pos(&[1, 9]));
        assert_eq!(pos(&[0]).partial_cmp(&Position::at_root("other", 0)), None);
    }

    #[test]
    fn test_insertion_shifts_following_positions() {
        let at = pos(&[1, 2]);

        assert_eq!(pos(&[1, 4]).transformed_by_insertion(&at, 3, false), pos(&[1, 7]));
        assert_eq!(pos(&[1, 2]).transformed_by_insertion(&at, 3, false), pos(&[1, 2]));
        assert_eq!(pos(&[1, 2]).transformed_by_insertion(&at, 3, true), pos(&[1, 5]));
        assert_eq!(pos(&[1, 2, 0]).transformed_by_insertion(&at, 3, false), pos(&[1, 5, 0]));
        assert_eq!(pos(&[2]).transformed_by_insertion(&at, 3, true), pos(&[2]));
    }

    #[test]
    fn test_deletion() {
        let at = pos(&[1]);

        assert_eq!(pos(&[0, 3]).transformed_by_deletion(&at, 2), Some(pos(&[0, 3])));
        assert_eq!(pos(&[1]).transformed_by_deletion(&at, 2), Some(pos(&[1])));
        assert_eq!(pos(&[2]).transformed_by_deletion(&at, 2), None);
        assert_eq!(pos(&[3]).transformed_by_deletion(&at, 2), Some(pos(&[1])));
        assert_eq!(pos(&[2, 0]).transformed_by_deletion(&at, 2), None);
        assert_eq!(pos(&[4, 1]).transformed_by_deletion(&at, 2), Some(pos(&[2, 1])));
    }

    #[test]
    fn test_resolving_against_root() {
        let root = Element::new("$root").with_child(
            Element::new("paragraph")
                .with_child(Text::new("foo"))
                .with_child(Element::new("softBreak")),
        );

        assert_eq!(pos(&[0, 0]).node_after(&root).map(Node::name), Some("$text"));
        assert_eq!(pos(&[0, 3]).node_after(&root).map(Node::name), Some("softBreak"));
        assert_eq!(pos(&[0, 3]).node_before(&root).map(Node::name), Some("$text"));
        assert_eq!(pos(&[0, 1]).text_node(&root).map(|t| t.data.as_str()), Some("foo"));
        assert!(pos(&[0, 4]).is_at_end(&root));
        assert!(pos(&[0, 9]).parent(&root).is_err());
    }
}
