//! # Model ranges
//!
//! A range is an ordered pair of positions in the same root. Content of a
//! range is read through a [`TreeWalker`], which is created fresh on every
//! call so a range can be iterated any number of times.

use crate::error::{ModelError, ModelResult};
use crate::node::{Element, Node, Text};
use crate::position::Position;
use crate::tree;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// Range between two positions; swapped when given in reverse order
    pub fn new(start: Position, end: Position) -> Self {
        if end.is_before(&start) {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    pub fn collapsed(position: Position) -> Self {
        Self {
            start: position.clone(),
            end: position,
        }
    }

    /// Range spanning `how_many` offsets from `start`
    pub fn with_length(start: Position, how_many: usize) -> Self {
        let end = start.with_offset(start.offset() + how_many);
        Self { start, end }
    }

    /// Range over the whole content of the element at `element_position`
    pub fn inside(element_position: &Position, element: &Element) -> Self {
        Self {
            start: element_position.child(0),
            end: element_position.child(element.max_offset()),
        }
    }

    pub fn root(&self) -> &str {
        &self.start.root
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Both ends share the same parent
    pub fn is_flat(&self) -> bool {
        self.start.has_same_parent_as(&self.end)
    }

    /// Offset size of a flat range
    pub fn flat_len(&self) -> usize {
        self.end.offset().saturating_sub(self.start.offset())
    }

    pub fn contains_position(&self, position: &Position) -> bool {
        position.is_after(&self.start) && position.is_before(&self.end)
    }

    /// With `loose`, ranges sharing a boundary with `self` still count as
    /// contained.
    pub fn contains_range(&self, other: &Range, loose: bool) -> bool {
        if other.root() != self.root() {
            return false;
        }
        let start_ok = if loose {
            self.start <= other.start
        } else {
            self.start < other.start || self.start == other.start && other.end < self.end
        };
        let end_ok = if loose {
            other.end <= self.end
        } else {
            other.end < self.end || other.end == self.end && self.start < other.start
        };
        start_ok && end_ok
    }

    /// Common part of two ranges, `None` when they do not overlap
    pub fn intersection(&self, other: &Range) -> Option<Range> {
        if self.root() != other.root() {
            return None;
        }
        let start = match self.start.partial_cmp(&other.start)? {
            Ordering::Less => other.start.clone(),
            _ => self.start.clone(),
        };
        let end = match self.end.partial_cmp(&other.end)? {
            Ordering::Greater => other.end.clone(),
            _ => self.end.clone(),
        };
        start.is_before(&end).then(|| Range { start, end })
    }

    /// Element the range spans exactly, if any
    pub fn contained_element<'a>(&self, root: &'a Element) -> Option<&'a Element> {
        if !self.is_flat() || self.end.offset() != self.start.offset() + 1 {
            return None;
        }
        self.start.node_after(root)?.as_element()
    }

    pub fn walker<'a>(&self, root: &'a Element, shallow: bool) -> TreeWalker<'a> {
        TreeWalker::new(root, self.clone(), shallow)
    }

    /// Items in the range, in document order, without element ends
    pub fn items<'a>(&self, root: &'a Element) -> impl Iterator<Item = WalkerItem<'a>> + 'a {
        self.walker(root, false)
            .filter(|item| !matches!(item, WalkerItem::ElementEnd { .. }))
    }

    /// Split the range into flat ranges that together cover the same content.
    ///
    /// Ranges come back in document order; empty pieces are skipped.
    pub fn minimal_flat_ranges(&self, root: &Element) -> ModelResult<Vec<Range>> {
        if self.is_flat() {
            return Ok(if self.is_collapsed() { vec![] } else { vec![self.clone()] });
        }

        let start = &self.start.path;
        let end = &self.end.path;
        let max_common = start.len().min(end.len()) - 1;
        let diff = (0..max_common)
            .find(|&i| start[i] != end[i])
            .unwrap_or(max_common);

        let max_offset_of = |path: &[usize]| -> ModelResult<usize> {
            tree::descend(root, path)
                .map(Element::max_offset)
                .ok_or_else(|| ModelError::invalid_position(self.root(), path))
        };

        let mut ranges = Vec::new();
        let mut push = |parent: &[usize], from: usize, to: usize| {
            if from < to {
                let mut start_path = parent.to_vec();
                start_path.push(from);
                let mut end_path = parent.to_vec();
                end_path.push(to);
                ranges.push(Range {
                    start: Position::new(self.root(), start_path),
                    end: Position::new(self.root(), end_path),
                });
            }
        };

        for depth in (diff + 1..start.len()).rev() {
            let from = if depth == start.len() - 1 { start[depth] } else { start[depth] + 1 };
            push(&start[..depth], from, max_offset_of(&start[..depth])?);
        }

        let from = if start.len() - 1 > diff { start[diff] + 1 } else { start[diff] };
        push(&start[..diff], from, end[diff]);

        for depth in diff + 1..end.len() {
            push(&end[..depth], 0, end[depth]);
        }

        Ok(ranges)
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} - {}]", self.start, self.end)
    }
}

/// Item produced by a [`TreeWalker`]
#[derive(Debug, Clone, PartialEq)]
pub enum WalkerItem<'a> {
    ElementStart { element: &'a Element, position: Position },
    ElementEnd { element: &'a Element, position: Position },
    /// Part of a text node that falls into the range
    Text { text: Text, position: Position },
}

impl<'a> WalkerItem<'a> {
    pub fn position(&self) -> &Position {
        match self {
            WalkerItem::ElementStart { position, .. }
            | WalkerItem::ElementEnd { position, .. }
            | WalkerItem::Text { position, .. } => position,
        }
    }

    pub fn element(&self) -> Option<&'a Element> {
        match self {
            WalkerItem::ElementStart { element, .. } | WalkerItem::ElementEnd { element, .. } => Some(element),
            WalkerItem::Text { .. } => None,
        }
    }

    /// Range spanned by the item in its parent
    pub fn range(&self) -> Range {
        let size = match self {
            WalkerItem::Text { text, .. } => text.len(),
            _ => 1,
        };
        Range::with_length(self.position().clone(), size)
    }

    pub fn name(&self) -> &str {
        match self {
            WalkerItem::ElementStart { element, .. } | WalkerItem::ElementEnd { element, .. } => &element.name,
            WalkerItem::Text { .. } => "$text",
        }
    }
}

/// Lazy walk over the content of a range.
///
/// Deep walks enter elements and report their end; shallow walks stay on the
/// level of the range start.
pub struct TreeWalker<'a> {
    root: &'a Element,
    range: Range,
    position: Position,
    shallow: bool,
    done: bool,
}

impl<'a> TreeWalker<'a> {
    pub fn new(root: &'a Element, range: Range, shallow: bool) -> Self {
        let position = range.start.clone();
        Self {
            root,
            range,
            position,
            shallow,
            done: false,
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }
}

impl<'a> Iterator for TreeWalker<'a> {
    type Item = WalkerItem<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || !self.position.is_before(&self.range.end) {
            self.done = true;
            return None;
        }

        let root = self.root;
        let parent_path = self.position.parent_path().to_vec();
        let offset = self.position.offset();
        let Some(parent) = tree::descend(root, &parent_path) else {
            self.done = true;
            return None;
        };

        let Some((index, start)) = parent.child_at_offset(offset) else {
            if self.shallow || parent_path.is_empty() {
                self.done = true;
                return None;
            }
            let position = self.position.clone();
            let mut after_parent = parent_path;
            if let Some(last) = after_parent.last_mut() {
                *last += 1;
            }
            self.position = Position::new(self.position.root.clone(), after_parent);
            return Some(WalkerItem::ElementEnd { element: parent, position });
        };

        let position = self.position.clone();
        match &parent.children[index] {
            Node::Text(text) => {
                let mut end = start + text.len();
                if self.range.end.has_same_parent_as(&self.position) {
                    end = end.min(self.range.end.offset());
                }
                let piece = text.slice(offset - start, end - start);
                self.position = self.position.with_offset(end);
                Some(WalkerItem::Text { text: piece, position })
            }
            Node::Element(element) => {
                self.position = if self.shallow {
                    self.position.with_offset(offset + 1)
                } else {
                    self.position.child(0)
                };
                Some(WalkerItem::ElementStart { element, position })
            }
        }
    }
}
