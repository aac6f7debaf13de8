//! View nodes.
//!
//! The view mirrors what ends up rendered: `<p>`, `<strong>`, `<td>`. Classes
//! and inline styles are kept apart from the other attributes because
//! converters consume them one by one.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_VIEW_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a view node, kept by clones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewNodeId(pub u64);

impl ViewNodeId {
    pub fn next() -> Self {
        ViewNodeId(NEXT_VIEW_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ViewNodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// What role an element plays in the rendered tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ViewElementKind {
    /// Block or structural element bound to a model element
    #[default]
    Container,
    /// Inline formatting (`<strong>`) wrapping text
    Attribute { priority: i32 },
    /// Element that never has children (`<br>`, `<img>`)
    Empty,
    /// Rendering helper with no model counterpart (marker boundaries)
    Ui,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewElement {
    pub id: ViewNodeId,
    pub name: String,
    #[serde(default)]
    pub kind: ViewElementKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub classes: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub styles: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ViewNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewText {
    pub id: ViewNodeId,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ViewNode {
    Element(ViewElement),
    Text(ViewText),
}

/// Structural equality; identity is not compared.
impl PartialEq for ViewElement {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && self.attributes == other.attributes
            && self.classes == other.classes
            && self.styles == other.styles
            && self.children == other.children
    }
}

impl PartialEq for ViewText {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl ViewElement {
    pub fn new(name: impl Into<String>, kind: ViewElementKind) -> Self {
        Self {
            id: ViewNodeId::next(),
            name: name.into(),
            kind,
            attributes: BTreeMap::new(),
            classes: BTreeSet::new(),
            styles: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn container(name: impl Into<String>) -> Self {
        Self::new(name, ViewElementKind::Container)
    }

    pub fn attribute_element(name: impl Into<String>, priority: i32) -> Self {
        Self::new(name, ViewElementKind::Attribute { priority })
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, ViewElementKind::Empty)
    }

    pub fn ui(name: impl Into<String>) -> Self {
        Self::new(name, ViewElementKind::Ui)
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.insert(class.into());
        self
    }

    pub fn with_style(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.styles.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: impl Into<ViewNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = ViewNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Set an attribute; `class` and `style` are split into their parts
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match key.as_str() {
            "class" => {
                self.classes = value.split_whitespace().map(str::to_string).collect();
            }
            "style" => {
                self.styles = parse_styles(&value);
            }
            _ => {
                self.attributes.insert(key, value);
            }
        }
    }

    pub fn remove_attribute(&mut self, key: &str) {
        match key {
            "class" => self.classes.clear(),
            "style" => self.styles.clear(),
            _ => {
                self.attributes.remove(key);
            }
        }
    }

    /// Attribute value as it would be rendered
    pub fn attribute(&self, key: &str) -> Option<String> {
        match key {
            "class" if !self.classes.is_empty() => Some(self.class_value()),
            "style" if !self.styles.is_empty() => Some(self.style_value()),
            "class" | "style" => None,
            _ => self.attributes.get(key).cloned(),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn style(&self, key: &str) -> Option<&str> {
        self.styles.get(key).map(String::as_str)
    }

    pub fn class_value(&self) -> String {
        self.classes.iter().cloned().collect::<Vec<_>>().join(" ")
    }

    pub fn style_value(&self) -> String {
        self.styles
            .iter()
            .map(|(key, value)| format!("{}:{}", key, value))
            .collect::<Vec<_>>()
            .join(";")
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn is_ui(&self) -> bool {
        self.kind == ViewElementKind::Ui
    }

    pub fn is_attribute_element(&self) -> bool {
        matches!(self.kind, ViewElementKind::Attribute { .. })
    }

    /// Child elements, skipping text
    pub fn child_elements(&self) -> impl Iterator<Item = &ViewElement> {
        self.children.iter().filter_map(ViewNode::as_element)
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                ViewNode::Text(text) => out.push_str(&text.data),
                ViewNode::Element(element) => out.push_str(&element.text_content()),
            }
        }
        out
    }

    /// Child index path from `self` to the node with `id`
    pub fn path_to(&self, id: ViewNodeId) -> Option<Vec<usize>> {
        for (index, child) in self.children.iter().enumerate() {
            if child.id() == id {
                return Some(vec![index]);
            }
            if let ViewNode::Element(element) = child {
                if let Some(mut rest) = element.path_to(id) {
                    rest.insert(0, index);
                    return Some(rest);
                }
            }
        }
        None
    }

    pub fn find(&self, id: ViewNodeId) -> Option<&ViewElement> {
        if self.id == id {
            return Some(self);
        }
        self.child_elements().find_map(|element| element.find(id))
    }

    pub fn find_mut(&mut self, id: ViewNodeId) -> Option<&mut ViewElement> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| match child {
            ViewNode::Element(element) => element.find_mut(id),
            ViewNode::Text(_) => None,
        })
    }

    /// Node at a child index path
    pub fn node_at(&self, path: &[usize]) -> Option<&ViewNode> {
        let (first, rest) = path.split_first()?;
        let child = self.children.get(*first)?;
        if rest.is_empty() {
            return Some(child);
        }
        child.as_element()?.node_at(rest)
    }
}

impl ViewText {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            id: ViewNodeId::next(),
            data: data.into(),
        }
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.data.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ViewNode {
    pub fn text(data: impl Into<String>) -> Self {
        ViewNode::Text(ViewText::new(data))
    }

    pub fn id(&self) -> ViewNodeId {
        match self {
            ViewNode::Element(element) => element.id,
            ViewNode::Text(text) => text.id,
        }
    }

    /// Element name, or `$text`
    pub fn name(&self) -> &str {
        match self {
            ViewNode::Element(element) => &element.name,
            ViewNode::Text(_) => "$text",
        }
    }

    pub fn as_element(&self) -> Option<&ViewElement> {
        match self {
            ViewNode::Element(element) => Some(element),
            ViewNode::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut ViewElement> {
        match self {
            ViewNode::Element(element) => Some(element),
            ViewNode::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&ViewText> {
        match self {
            ViewNode::Text(text) => Some(text),
            ViewNode::Element(_) => None,
        }
    }

    pub fn is_element(&self, name: &str) -> bool {
        matches!(self, ViewNode::Element(element) if element.name == name)
    }
}

impl From<ViewElement> for ViewNode {
    fn from(element: ViewElement) -> Self {
        ViewNode::Element(element)
    }
}

impl From<ViewText> for ViewNode {
    fn from(text: ViewText) -> Self {
        ViewNode::Text(text)
    }
}

/// `color: red; font-weight:bold` → `{color: red, font-weight: bold}`
pub fn parse_styles(value: &str) -> BTreeMap<String, String> {
    value
        .split(';')
        .filter_map(|declaration| {
            let (key, value) = declaration.split_once(':')?;
            let (key, value) = (key.trim(), value.trim());
            (!key.is_empty() && !value.is_empty()).then(|| (key.to_string(), value.to_string()))
        })
        .collect()
}

/// Detached view content with a `$root` holder element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDocumentFragment {
    pub root: ViewElement,
}

impl Default for ViewDocumentFragment {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewDocumentFragment {
    pub fn new() -> Self {
        Self {
            root: ViewElement::container("$root"),
        }
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = ViewNode>) -> Self {
        Self {
            root: ViewElement::container("$root").with_children(nodes),
        }
    }

    pub fn children(&self) -> &[ViewNode] {
        &self.root.children
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn element(&self, id: ViewNodeId) -> Option<&ViewElement> {
        self.root.find(id)
    }

    pub fn element_mut(&mut self, id: ViewNodeId) -> Option<&mut ViewElement> {
        self.root.find_mut(id)
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&ViewNode> {
        self.root.node_at(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_and_style_are_split() {
        let element = ViewElement::container("p")
            .with_attr("class", "b  a")
            .with_attr("style", "text-align: center; color:red;")
            .with_attr("id", "x");

        assert!(element.has_class("a") && element.has_class("b"));
        assert_eq!(element.style("text-align"), Some("center"));
        assert_eq!(element.attribute("class"), Some("a b".to_string()));
        assert_eq!(element.attribute("style"), Some("color:red;text-align:center".to_string()));
        assert_eq!(element.attribute("id"), Some("x".to_string()));
    }

    #[test]
    fn test_equality_ignores_identity() {
        let a = ViewElement::container("p").with_child(ViewNode::text("foo"));
        let b = ViewElement::container("p").with_child(ViewNode::text("foo"));

        assert_ne!(a.id, b.id);
        assert_eq!(a, b);
    }

    #[test]
    fn test_path_and_lookup() {
        let strong = ViewElement::attribute_element("strong", 10).with_child(ViewNode::text("bar"));
        let strong_id = strong.id;
        let fragment = ViewDocumentFragment::from_nodes(vec![ViewElement::container("p")
            .with_child(ViewNode::text("foo"))
            .with_child(strong)
            .into()]);

        assert_eq!(fragment.root.path_to(strong_id), Some(vec![0, 1]));
        assert_eq!(fragment.element(strong_id).map(|e| e.text_content()), Some("bar".to_string()));
        assert_eq!(fragment.node_at(&[0, 1, 0]).map(ViewNode::name), Some("$text"));
    }
}
