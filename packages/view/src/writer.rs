//! # Downcast writer
//!
//! The only way downcast converters touch the view they are building. It
//! owns the target fragment and keeps text splitting in one place: inserting
//! into, wrapping or removing part of a text node first breaks the text so
//! that every change happens between whole nodes.

use crate::error::{ViewError, ViewResult};
use crate::node::{ViewDocumentFragment, ViewElement, ViewElementKind, ViewNode, ViewNodeId, ViewText};
use crate::position::{ViewParent, ViewPosition, ViewRange};
use tracing::trace;

#[derive(Debug, Default)]
pub struct DowncastWriter {
    fragment: ViewDocumentFragment,
}

impl DowncastWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer appending into an existing fragment
    pub fn with_fragment(fragment: ViewDocumentFragment) -> Self {
        Self { fragment }
    }

    pub fn fragment(&self) -> &ViewDocumentFragment {
        &self.fragment
    }

    pub fn into_fragment(self) -> ViewDocumentFragment {
        self.fragment
    }

    pub fn root_id(&self) -> ViewNodeId {
        self.fragment.root.id
    }

    pub fn create_container_element<K, V>(&self, name: &str, attributes: impl IntoIterator<Item = (K, V)>) -> ViewElement
    where
        K: Into<String>,
        V: Into<String>,
    {
        with_attributes(ViewElement::container(name), attributes)
    }

    pub fn create_attribute_element<K, V>(
        &self,
        name: &str,
        attributes: impl IntoIterator<Item = (K, V)>,
        priority: i32,
    ) -> ViewElement
    where
        K: Into<String>,
        V: Into<String>,
    {
        with_attributes(ViewElement::attribute_element(name, priority), attributes)
    }

    pub fn create_empty_element<K, V>(&self, name: &str, attributes: impl IntoIterator<Item = (K, V)>) -> ViewElement
    where
        K: Into<String>,
        V: Into<String>,
    {
        with_attributes(ViewElement::empty(name), attributes)
    }

    pub fn create_ui_element<K, V>(&self, name: &str, attributes: impl IntoIterator<Item = (K, V)>) -> ViewElement
    where
        K: Into<String>,
        V: Into<String>,
    {
        with_attributes(ViewElement::ui(name), attributes)
    }

    pub fn create_text(&self, data: impl Into<String>) -> ViewText {
        ViewText::new(data)
    }

    /// Break the text a position points into and return the same place as a
    /// position between nodes.
    pub fn break_text(&mut self, position: &ViewPosition) -> ViewResult<ViewPosition> {
        let (left, right) = match position.parent(&self.fragment.root)? {
            ViewParent::Element(_) => return Ok(position.clone()),
            ViewParent::Text(text) => {
                let split = char_to_byte(&text.data, position.offset());
                (text.data[..split].to_string(), text.data[split..].to_string())
            }
        };

        let text_path = position.parent_path();
        let container_path = &text_path[..text_path.len() - 1];
        let index = text_path[text_path.len() - 1];

        if left.is_empty() {
            return Ok(ViewPosition::at(container_path, index));
        }
        if right.is_empty() {
            return Ok(ViewPosition::at(container_path, index + 1));
        }

        let container = self.element_at_mut(container_path)?;
        if let Some(ViewNode::Text(text)) = container.children.get_mut(index) {
            text.data = left;
        }
        container.children.insert(index + 1, ViewNode::Text(ViewText::new(right)));
        Ok(ViewPosition::at(container_path, index + 1))
    }

    /// Insert a node and return the range it occupies
    pub fn insert(&mut self, position: &ViewPosition, node: impl Into<ViewNode>) -> ViewResult<ViewRange> {
        let position = self.break_text(position)?;
        let node = node.into();
        trace!(node = node.name(), path = ?position.path, "view insert");

        let container = self.element_at_mut(position.parent_path())?;
        if position.offset() > container.child_count() {
            return Err(ViewError::InvalidPosition(position.path.clone()));
        }
        container.children.insert(position.offset(), node);
        Ok(ViewRange::on_child(position.parent_path(), position.offset()))
    }

    /// Move the content of a flat range into `wrapper`, put the wrapper in
    /// its place and return the range spanning the wrapper.
    pub fn wrap(&mut self, range: &ViewRange, mut wrapper: ViewElement) -> ViewResult<ViewRange> {
        if range.is_collapsed() {
            return self.insert(&range.start, wrapper);
        }

        let start_splits_text = self.splits_text(&range.start);
        let mut end = self.break_text(&range.end)?;
        let start = self.break_text(&range.start)?;

        if !start.has_same_parent_as(&end) {
            return Err(ViewError::NotFlat {
                start: start.path,
                end: end.path,
            });
        }
        // Breaking the start text added a node in front of the end
        if start_splits_text && end.offset() >= start.offset() {
            end = end.with_offset(end.offset() + 1);
        }

        let container = self.element_at_mut(start.parent_path())?;
        let content: Vec<ViewNode> = container.children.drain(start.offset()..end.offset()).collect();
        wrapper.children.extend(content);
        container.children.insert(start.offset(), ViewNode::Element(wrapper));
        Ok(ViewRange::on_child(start.parent_path(), start.offset()))
    }

    /// Remove the content of a flat range and hand it back
    pub fn remove(&mut self, range: &ViewRange) -> ViewResult<Vec<ViewNode>> {
        let start_splits_text = self.splits_text(&range.start);
        let mut end = self.break_text(&range.end)?;
        let start = self.break_text(&range.start)?;

        if !start.has_same_parent_as(&end) {
            return Err(ViewError::NotFlat {
                start: start.path,
                end: end.path,
            });
        }
        if start_splits_text && end.offset() >= start.offset() {
            end = end.with_offset(end.offset() + 1);
        }

        let container = self.element_at_mut(start.parent_path())?;
        Ok(container.children.drain(start.offset()..end.offset()).collect())
    }

    pub fn set_attribute(&mut self, key: &str, value: impl Into<String>, element: ViewNodeId) -> ViewResult<()> {
        self.element_mut(element)?.set_attribute(key, value);
        Ok(())
    }

    pub fn remove_attribute(&mut self, key: &str, element: ViewNodeId) -> ViewResult<()> {
        self.element_mut(element)?.remove_attribute(key);
        Ok(())
    }

    pub fn add_class(&mut self, class: impl Into<String>, element: ViewNodeId) -> ViewResult<()> {
        self.element_mut(element)?.classes.insert(class.into());
        Ok(())
    }

    pub fn remove_class(&mut self, class: &str, element: ViewNodeId) -> ViewResult<()> {
        self.element_mut(element)?.classes.remove(class);
        Ok(())
    }

    pub fn set_style(&mut self, key: impl Into<String>, value: impl Into<String>, element: ViewNodeId) -> ViewResult<()> {
        self.element_mut(element)?.styles.insert(key.into(), value.into());
        Ok(())
    }

    pub fn remove_style(&mut self, key: &str, element: ViewNodeId) -> ViewResult<()> {
        self.element_mut(element)?.styles.remove(key);
        Ok(())
    }

    fn element_mut(&mut self, id: ViewNodeId) -> ViewResult<&mut ViewElement> {
        self.fragment.element_mut(id).ok_or(ViewError::NodeNotFound(id))
    }

    fn splits_text(&self, position: &ViewPosition) -> bool {
        match position.parent(&self.fragment.root) {
            Ok(ViewParent::Text(text)) => position.offset() > 0 && position.offset() < text.len(),
            _ => false,
        }
    }

    fn element_at_mut(&mut self, path: &[usize]) -> ViewResult<&mut ViewElement> {
        let mut current = &mut self.fragment.root;
        for &index in path {
            current = match current.children.get_mut(index) {
                Some(ViewNode::Element(element)) if element.kind != ViewElementKind::Empty => element,
                _ => return Err(ViewError::InvalidPosition(path.to_vec())),
            };
        }
        Ok(current)
    }
}

fn with_attributes<K, V>(mut element: ViewElement, attributes: impl IntoIterator<Item = (K, V)>) -> ViewElement
where
    K: Into<String>,
    V: Into<String>,
{
    for (key, value) in attributes {
        element.set_attribute(key, value);
    }
    element
}

fn char_to_byte(data: &str, offset: usize) -> usize {
    data.char_indices()
        .nth(offset)
        .map(|(index, _)| index)
        .unwrap_or(data.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::stringify_fragment;

    fn writer_with_paragraph(text: &str) -> DowncastWriter {
        let mut writer = DowncastWriter::new();
        let p = writer.create_container_element("p", Vec::<(String, String)>::new());
        writer.insert(&ViewPosition::new(vec![0]), p).unwrap();
        writer.insert(&ViewPosition::new(vec![0, 0]), writer.create_text(text)).unwrap();
        writer
    }

    #[test]
    fn test_insert_inside_text_splits_it() {
        let mut writer = writer_with_paragraph("foobar");
        let br = writer.create_empty_element("br", Vec::<(String, String)>::new());

        let range = writer.insert(&ViewPosition::new(vec![0, 0, 3]), br).unwrap();

        assert_eq!(range, ViewRange::on_child(&[0], 1));
        assert_eq!(stringify_fragment(writer.fragment()), "<p>foo<br>bar</p>");
    }

    #[test]
    fn test_wrap_middle_of_text() {
        let mut writer = writer_with_paragraph("foobarbaz");
        let strong = writer.create_attribute_element("strong", Vec::<(String, String)>::new(), 10);

        let range = ViewRange::new(ViewPosition::new(vec![0, 0, 3]), ViewPosition::new(vec![0, 0, 6]));
        let wrapped = writer.wrap(&range, strong).unwrap();

        assert_eq!(wrapped, ViewRange::on_child(&[0], 1));
        assert_eq!(stringify_fragment(writer.fragment()), "<p>foo<strong>bar</strong>baz</p>");
    }

    #[test]
    fn test_wrap_whole_text_then_wrap_again() {
        let mut writer = writer_with_paragraph("foo");
        let range = ViewRange::new(ViewPosition::new(vec![0, 0]), ViewPosition::new(vec![0, 1]));

        let strong = writer.create_attribute_element("strong", Vec::<(String, String)>::new(), 10);
        let wrapped = writer.wrap(&range, strong).unwrap();
        let em = writer.create_attribute_element("em", Vec::<(String, String)>::new(), 10);
        writer.wrap(&wrapped, em).unwrap();

        assert_eq!(stringify_fragment(writer.fragment()), "<p><em><strong>foo</strong></em></p>");
    }

    #[test]
    fn test_remove_part_of_text() {
        let mut writer = writer_with_paragraph("abcdef");
        let range = ViewRange::new(ViewPosition::new(vec![0, 0, 1]), ViewPosition::new(vec![0, 0, 3]));

        let removed = writer.remove(&range).unwrap();

        assert_eq!(removed, vec![ViewNode::text("bc")]);
        assert_eq!(stringify_fragment(writer.fragment()), "<p>adef</p>");
    }

    #[test]
    fn test_attributes_by_identity() {
        let mut writer = writer_with_paragraph("x");
        let p = writer.fragment().children()[0].id();

        writer.set_style("text-align", "right", p).unwrap();
        writer.add_class("lead", p).unwrap();

        assert_eq!(
            stringify_fragment(writer.fragment()),
            r#"<p class="lead" style="text-align:right">x</p>"#
        );
        assert_eq!(
            writer.set_attribute("id", "a", ViewNodeId(u64::MAX)),
            Err(ViewError::NodeNotFound(ViewNodeId(u64::MAX)))
        );
    }
}
