//! # Document fragments
//!
//! A fragment is a detached `$root` element plus the markers found while
//! building it. Upcast conversion writes into a fragment through
//! [`FragmentWriter`]; the fragment is then inserted into a document by the
//! model writer.
//!
//! Positions inside a fragment use the root name [`FRAGMENT_ROOT`].

use crate::error::{ModelError, ModelResult};
use crate::node::{Attributes, Element, ElementId, Node, Text};
use crate::position::{Position, FRAGMENT_ROOT};
use crate::range::Range;
use crate::tree;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentFragment {
    pub root: Element,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub markers: BTreeMap<String, Range>,
}

impl Default for DocumentFragment {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentFragment {
    pub fn new() -> Self {
        Self {
            root: Element::new("$root"),
            markers: BTreeMap::new(),
        }
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut root = Element::new("$root").with_children(nodes);
        tree::normalize_deep(&mut root);
        Self {
            root,
            markers: BTreeMap::new(),
        }
    }

    pub fn children(&self) -> &[Node] {
        &self.root.children
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    pub fn start(&self) -> Position {
        Position::in_fragment(vec![0])
    }

    pub fn end(&self) -> Position {
        Position::in_fragment(vec![self.root.max_offset()])
    }

    /// Range over the whole fragment
    pub fn full_range(&self) -> Range {
        Range::new(self.start(), self.end())
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.root.find(id)
    }

    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.root.find_mut(id)
    }

    /// Position right before the element with `id`
    pub fn position_before(&self, id: ElementId) -> Option<Position> {
        self.root.offset_path_to(id).map(Position::in_fragment)
    }

    pub fn position_after(&self, id: ElementId) -> Option<Position> {
        let before = self.position_before(id)?;
        Some(before.with_offset(before.offset() + 1))
    }

    /// Position at `offset` inside the element with `id`
    pub fn position_in(&self, id: ElementId, offset: usize) -> Option<Position> {
        if id == self.root.id {
            return Some(Position::in_fragment(vec![offset]));
        }
        Some(self.position_before(id)?.child(offset))
    }

    pub fn position_at_end_of(&self, id: ElementId) -> Option<Position> {
        let element = self.element(id)?;
        self.position_in(id, element.max_offset())
    }

    /// Range over the content of the element with `id`
    pub fn range_in(&self, id: ElementId) -> Option<Range> {
        Some(Range::new(self.position_in(id, 0)?, self.position_at_end_of(id)?))
    }

    /// Range spanning the element with `id` itself
    pub fn range_on(&self, id: ElementId) -> Option<Range> {
        Some(Range::with_length(self.position_before(id)?, 1))
    }

    pub fn parent_of(&self, position: &Position) -> ModelResult<&Element> {
        position.parent(&self.root)
    }

    /// Walk the fragment and collect `(position, element)` pairs for every
    /// element named `name`.
    pub fn elements_named(&self, name: &str) -> Vec<(Position, ElementId)> {
        self.full_range()
            .items(&self.root)
            .filter_map(|item| match item.element() {
                Some(element) if element.name == name => Some((item.position().clone(), element.id)),
                _ => None,
            })
            .collect()
    }
}

/// Writer used while building a fragment.
///
/// Unlike the document writer it does not produce operations: the fragment
/// is not part of any document yet, so there is no history to record into.
#[derive(Debug, Default)]
pub struct FragmentWriter {
    fragment: DocumentFragment,
}

impl FragmentWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fragment(&self) -> &DocumentFragment {
        &self.fragment
    }

    pub fn fragment_mut(&mut self) -> &mut DocumentFragment {
        &mut self.fragment
    }

    pub fn into_fragment(self) -> DocumentFragment {
        self.fragment
    }

    pub fn root_id(&self) -> ElementId {
        self.fragment.root.id
    }

    pub fn create_element(&self, name: impl Into<String>, attributes: Attributes) -> Element {
        let mut element = Element::new(name);
        element.attributes = attributes;
        element
    }

    pub fn create_text(&self, data: impl Into<String>, attributes: Attributes) -> Text {
        Text {
            data: data.into(),
            attributes,
        }
    }

    fn check_position(&self, position: &Position) -> ModelResult<()> {
        if position.root != FRAGMENT_ROOT {
            return Err(ModelError::RootNotFound(position.root.clone()));
        }
        self.fragment.parent_of(position).map(|_| ())
    }

    /// Insert a node and return the range it occupies
    pub fn insert(&mut self, node: impl Into<Node>, position: &Position) -> ModelResult<Range> {
        self.check_position(position)?;
        let node = node.into();
        let size = node.offset_size();
        tree::insert_nodes(&mut self.fragment.root, &position.path, vec![node])?;
        Ok(Range::with_length(position.clone(), size))
    }

    /// Append a node at the end of the element with `parent`
    pub fn append(&mut self, node: impl Into<Node>, parent: ElementId) -> ModelResult<Range> {
        let position = self
            .fragment
            .position_at_end_of(parent)
            .ok_or(ModelError::ElementNotFound(parent))?;
        self.insert(node, &position)
    }

    /// Remove the content of a flat range and hand it back
    pub fn remove(&mut self, range: &Range) -> ModelResult<Vec<Node>> {
        if !range.is_flat() {
            return Err(ModelError::NotFlat);
        }
        self.check_position(&range.start)?;
        tree::remove_nodes(&mut self.fragment.root, &range.start.path, range.flat_len())
    }

    /// Move the content of a flat range into `element` and insert that
    /// element where the content was.
    pub fn wrap(&mut self, range: &Range, mut element: Element) -> ModelResult<ElementId> {
        let content = self.remove(range)?;
        let id = element.id;
        element.children.extend(content);
        self.insert(element, &range.start)?;
        Ok(id)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value, element: ElementId) -> ModelResult<()> {
        let target = self
            .fragment
            .element_mut(element)
            .ok_or(ModelError::ElementNotFound(element))?;
        target.attributes.insert(key.into(), value);
        Ok(())
    }

    pub fn remove_attribute(&mut self, key: &str, element: ElementId) -> ModelResult<()> {
        let target = self
            .fragment
            .element_mut(element)
            .ok_or(ModelError::ElementNotFound(element))?;
        target.attributes.remove(key);
        Ok(())
    }

    /// Set `key` on every node the range covers, at every level
    pub fn set_attribute_on_range(&mut self, key: &str, value: Option<&Value>, range: &Range) -> ModelResult<()> {
        self.check_position(&range.start)?;
        for flat in range.minimal_flat_ranges(&self.fragment.root)? {
            tree::set_attribute_range(
                &mut self.fragment.root,
                flat.start.parent_path(),
                flat.start.offset(),
                flat.end.offset(),
                key,
                value,
            )?;
        }
        Ok(())
    }

    pub fn set_marker(&mut self, name: impl Into<String>, range: Range) {
        self.fragment.markers.insert(name.into(), range);
    }
}
