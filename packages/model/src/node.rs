//! Model nodes.
//!
//! The model tree is an owned tree: every element owns its children and a
//! node has exactly one parent at a time. Offsets inside a parent count one
//! per element and one per character of text.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Attribute map shared by elements and text nodes
pub type Attributes = BTreeMap<String, Value>;

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a model element.
///
/// Allocated once when the element is created and kept by clones, so an
/// element removed by an operation and reinserted by its reversal is still
/// the same element for the mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl ElementId {
    pub fn next() -> Self {
        ElementId(NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Model element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

/// Model text node; attributes apply to the whole run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub data: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Node {
    Element(Element),
    Text(Text),
}

/// Structural equality; element identity is not compared.
impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.attributes == other.attributes
            && self.children == other.children
    }
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ElementId::next(),
            name: name.into(),
            attributes: Attributes::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Offset just past the last child
    pub fn max_offset(&self) -> usize {
        self.children.iter().map(Node::offset_size).sum()
    }

    /// Index of the child that contains `offset`, with the offset at which
    /// that child starts. `None` when the offset is at or past the end.
    pub fn child_at_offset(&self, offset: usize) -> Option<(usize, usize)> {
        let mut start = 0;
        for (index, child) in self.children.iter().enumerate() {
            let size = child.offset_size();
            if offset < start + size {
                return Some((index, start));
            }
            start += size;
        }
        None
    }

    /// Offset at which child `index` starts
    pub fn offset_of_child(&self, index: usize) -> usize {
        self.children[..index.min(self.children.len())]
            .iter()
            .map(Node::offset_size)
            .sum()
    }

    /// Concatenated text of all descendants
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(&text.data),
                Node::Element(element) => out.push_str(&element.text_content()),
            }
        }
        out
    }

    /// Depth-first search for an element by identity; returns the child
    /// index path from `self`.
    pub fn path_to(&self, id: ElementId) -> Option<Vec<usize>> {
        for (index, child) in self.children.iter().enumerate() {
            if let Node::Element(element) = child {
                if element.id == id {
                    return Some(vec![index]);
                }
                if let Some(mut rest) = element.path_to(id) {
                    rest.insert(0, index);
                    return Some(rest);
                }
            }
        }
        None
    }

    /// Like [`Element::path_to`] but in offsets, ready to build a position
    pub fn offset_path_to(&self, id: ElementId) -> Option<Vec<usize>> {
        let indices = self.path_to(id)?;
        let mut path = Vec::with_capacity(indices.len());
        let mut current = self;
        for index in indices {
            path.push(current.offset_of_child(index));
            if let Some(Node::Element(next)) = current.children.get(index) {
                current = next;
            }
        }
        Some(path)
    }

    pub fn find(&self, id: ElementId) -> Option<&Element> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| match child {
            Node::Element(element) => element.find(id),
            Node::Text(_) => None,
        })
    }

    pub fn find_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| match child {
            Node::Element(element) => element.find_mut(id),
            Node::Text(_) => None,
        })
    }

    /// Fresh identities for this element and all its descendants
    pub fn with_fresh_ids(mut self) -> Self {
        self.id = ElementId::next();
        self.children = self
            .children
            .into_iter()
            .map(|child| match child {
                Node::Element(element) => Node::Element(element.with_fresh_ids()),
                text => text,
            })
            .collect();
        self
    }
}

impl Text {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.data.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Characters `[start, end)` as a new text node with the same attributes
    pub fn slice(&self, start: usize, end: usize) -> Text {
        Text {
            data: self.data.chars().skip(start).take(end.saturating_sub(start)).collect(),
            attributes: self.attributes.clone(),
        }
    }
}

impl Node {
    pub fn text(data: impl Into<String>) -> Self {
        Node::Text(Text::new(data))
    }

    pub fn element(name: impl Into<String>) -> Self {
        Node::Element(Element::new(name))
    }

    pub fn offset_size(&self) -> usize {
        match self {
            Node::Element(_) => 1,
            Node::Text(text) => text.len(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Element(element) => &element.name,
            Node::Text(_) => "$text",
        }
    }

    pub fn attributes(&self) -> &Attributes {
        match self {
            Node::Element(element) => &element.attributes,
            Node::Text(text) => &text.attributes,
        }
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        match self {
            Node::Element(element) => &mut element.attributes,
            Node::Text(text) => &mut text.attributes,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(text) => Some(text),
            Node::Element(_) => None,
        }
    }

    pub fn is_element(&self, name: &str) -> bool {
        matches!(self, Node::Element(element) if element.name == name)
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<Text> for Node {
    fn from(text: Text) -> Self {
        Node::Text(text)
    }
}

/// Total offset size of a node list
pub fn offset_size_of(nodes: &[Node]) -> usize {
    nodes.iter().map(Node::offset_size).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_count_characters() {
        let paragraph = Element::new("paragraph")
            .with_child(Text::new("foo"))
            .with_child(Element::new("softBreak"))
            .with_child(Text::new("ba"));

        assert_eq!(paragraph.max_offset(), 6);
        assert_eq!(paragraph.child_at_offset(2), Some((0, 0)));
        assert_eq!(paragraph.child_at_offset(3), Some((1, 3)));
        assert_eq!(paragraph.child_at_offset(5), Some((2, 4)));
        assert_eq!(paragraph.child_at_offset(6), None);
    }

    #[test]
    fn test_equality_ignores_identity() {
        let a = Element::new("paragraph").with_child(Text::new("x"));
        let b = Element::new("paragraph").with_child(Text::new("x"));

        assert_ne!(a.id, b.id);
        assert_eq!(a, b);
    }

    #[test]
    fn test_path_to_nested_element() {
        let cell = Element::new("tableCell");
        let cell_id = cell.id;
        let table = Element::new("table").with_child(Element::new("tableRow").with_child(cell));
        let root = Element::new("$root").with_child(Text::new("ab")).with_child(table);

        assert_eq!(root.path_to(cell_id), Some(vec![1, 0, 0]));
    }

    #[test]
    fn test_text_slice_keeps_attributes() {
        let text = Text::new("hello").with_attr("bold", true);
        let slice = text.slice(1, 3);

        assert_eq!(slice.data, "el");
        assert_eq!(slice.attributes.get("bold"), Some(&Value::Bool(true)));
    }
}
