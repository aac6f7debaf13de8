//! # Mapper
//!
//! Bidirectional bindings between model elements and view elements for one
//! conversion pass, plus translation of positions between the two trees.
//!
//! Positions are mapped through the nearest bound parent. Inside it, model
//! offsets are recovered from the view by counting each view child's model
//! length:
//!
//! - text: one per character
//! - bound element: one
//! - UI element: zero
//! - any other element: the sum of its children

use crate::error::{ConversionError, ConversionResult};
use quire_model::{Element, ElementId, ModelError, Position, Range};
use quire_view::{ViewElement, ViewError, ViewNode, ViewNodeId, ViewPosition, ViewRange};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Default)]
pub struct Mapper {
    model_to_view: HashMap<ElementId, ViewNodeId>,
    view_to_model: HashMap<ViewNodeId, ElementId>,
    marker_to_elements: BTreeMap<String, BTreeSet<ViewNodeId>>,
    element_to_marker: HashMap<ViewNodeId, BTreeSet<String>>,
}

impl Mapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a model element to a view element, dropping any earlier binding
    /// of either side.
    pub fn bind_elements(&mut self, model: ElementId, view: ViewNodeId) {
        self.unbind_model_element(model);
        self.unbind_view_element(view);
        self.model_to_view.insert(model, view);
        self.view_to_model.insert(view, model);
    }

    pub fn unbind_model_element(&mut self, model: ElementId) {
        if let Some(view) = self.model_to_view.remove(&model) {
            self.view_to_model.remove(&view);
        }
    }

    pub fn unbind_view_element(&mut self, view: ViewNodeId) {
        if let Some(model) = self.view_to_model.remove(&view) {
            self.model_to_view.remove(&model);
        }
        if let Some(markers) = self.element_to_marker.remove(&view) {
            for name in markers {
                self.unbind_element_from_marker_name(view, &name);
            }
        }
    }

    pub fn to_view_element(&self, model: ElementId) -> Option<ViewNodeId> {
        self.model_to_view.get(&model).copied()
    }

    pub fn to_model_element(&self, view: ViewNodeId) -> Option<ElementId> {
        self.view_to_model.get(&view).copied()
    }

    /// Remember a view element as a boundary of the marker `name`
    pub fn bind_element_to_marker(&mut self, view: ViewNodeId, name: impl Into<String>) {
        let name = name.into();
        self.element_to_marker.entry(view).or_default().insert(name.clone());
        self.marker_to_elements.entry(name).or_default().insert(view);
    }

    pub fn marker_name_to_elements(&self, name: &str) -> Option<&BTreeSet<ViewNodeId>> {
        self.marker_to_elements.get(name).filter(|elements| !elements.is_empty())
    }

    pub fn unbind_element_from_marker_name(&mut self, view: ViewNodeId, name: &str) {
        if let Some(elements) = self.marker_to_elements.get_mut(name) {
            elements.remove(&view);
            if elements.is_empty() {
                self.marker_to_elements.remove(name);
            }
        }
        if let Some(names) = self.element_to_marker.get_mut(&view) {
            names.remove(name);
            if names.is_empty() {
                self.element_to_marker.remove(&view);
            }
        }
    }

    pub fn clear(&mut self) {
        self.model_to_view.clear();
        self.view_to_model.clear();
        self.marker_to_elements.clear();
        self.element_to_marker.clear();
    }

    /// How many model offsets a view node stands for
    pub fn model_length(&self, node: &ViewNode) -> usize {
        match node {
            ViewNode::Text(text) => text.len(),
            ViewNode::Element(element) if self.view_to_model.contains_key(&element.id) => 1,
            ViewNode::Element(element) if element.is_ui() => 0,
            ViewNode::Element(element) => element.children.iter().map(|child| self.model_length(child)).sum(),
        }
    }

    pub fn to_view_position(
        &self,
        model_root: &Element,
        view_root: &ViewElement,
        position: &Position,
    ) -> ConversionResult<ViewPosition> {
        let model_parent = position.parent(model_root)?;
        let view_id = self
            .to_view_element(model_parent.id)
            .ok_or_else(|| ConversionError::unmapped(format!("{} ({})", model_parent.name, model_parent.id)))?;
        let view_path = view_path_to(view_root, view_id)?;
        let view_parent = element_at(view_root, &view_path)?;

        Ok(self.find_position_in(view_parent, view_path, position.offset()))
    }

    /// Walk the children of `parent` until `expected` model offsets are
    /// behind, entering text and unbound elements the offset falls inside.
    fn find_position_in(&self, parent: &ViewElement, path: Vec<usize>, expected: usize) -> ViewPosition {
        let mut model_offset = 0;
        for (index, child) in parent.children.iter().enumerate() {
            if model_offset >= expected {
                return ViewPosition::at(&path, index);
            }
            let length = self.model_length(child);
            if model_offset + length > expected {
                let mut child_path = path.clone();
                child_path.push(index);
                match child {
                    ViewNode::Text(_) => return ViewPosition::at(&child_path, expected - model_offset),
                    ViewNode::Element(element) => {
                        return self.find_position_in(element, child_path, expected - model_offset)
                    }
                }
            }
            model_offset += length;
        }
        ViewPosition::at(&path, parent.child_count())
    }

    pub fn to_model_position(
        &self,
        model_root: &Element,
        root_name: &str,
        view_root: &ViewElement,
        position: &ViewPosition,
    ) -> ConversionResult<Position> {
        let parent_path = position.parent_path();

        // Deepest bound ancestor along the path, the root included
        let mut anchor = None;
        for depth in (0..=parent_path.len()).rev() {
            let prefix = &parent_path[..depth];
            let candidate = if prefix.is_empty() {
                Some(view_root)
            } else {
                view_root.node_at(prefix).and_then(ViewNode::as_element)
            };
            if let Some(element) = candidate {
                if let Some(model) = self.to_model_element(element.id) {
                    anchor = Some((depth, element, model));
                    break;
                }
            }
        }
        let (depth, view_anchor, model_id) =
            anchor.ok_or_else(|| ConversionError::unmapped(format!("view position {:?}", position.path)))?;

        let offset = self.model_offset_in(view_anchor, &position.path[depth..])?;
        let mut path = if model_id == model_root.id {
            Vec::new()
        } else {
            model_root
                .offset_path_to(model_id)
                .ok_or(ModelError::ElementNotFound(model_id))?
        };
        path.push(offset);
        Ok(Position::new(root_name, path))
    }

    fn model_offset_in(&self, element: &ViewElement, rest: &[usize]) -> ConversionResult<usize> {
        let invalid = || ConversionError::from(ViewError::InvalidPosition(rest.to_vec()));
        let (&index, deeper) = rest.split_first().ok_or_else(invalid)?;
        let before: usize = element
            .children
            .iter()
            .take(index)
            .map(|child| self.model_length(child))
            .sum();
        if deeper.is_empty() {
            return Ok(before);
        }
        match element.children.get(index).ok_or_else(invalid)? {
            ViewNode::Text(_) => Ok(before + deeper[0]),
            ViewNode::Element(child) => Ok(before + self.model_offset_in(child, deeper)?),
        }
    }

    pub fn to_view_range(&self, model_root: &Element, view_root: &ViewElement, range: &Range) -> ConversionResult<ViewRange> {
        Ok(ViewRange::new(
            self.to_view_position(model_root, view_root, &range.start)?,
            self.to_view_position(model_root, view_root, &range.end)?,
        ))
    }

    pub fn to_model_range(
        &self,
        model_root: &Element,
        root_name: &str,
        view_root: &ViewElement,
        range: &ViewRange,
    ) -> ConversionResult<Range> {
        Ok(Range::new(
            self.to_model_position(model_root, root_name, view_root, &range.start)?,
            self.to_model_position(model_root, root_name, view_root, &range.end)?,
        ))
    }
}

fn view_path_to(view_root: &ViewElement, id: ViewNodeId) -> ConversionResult<Vec<usize>> {
    if view_root.id == id {
        return Ok(Vec::new());
    }
    view_root.path_to(id).ok_or_else(|| ViewError::NodeNotFound(id).into())
}

fn element_at<'a>(view_root: &'a ViewElement, path: &[usize]) -> ConversionResult<&'a ViewElement> {
    if path.is_empty() {
        return Ok(view_root);
    }
    view_root
        .node_at(path)
        .and_then(ViewNode::as_element)
        .ok_or_else(|| ViewError::InvalidPosition(path.to_vec()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_model::Node;

    /// `<paragraph>foo<$text bold>bar</$text></paragraph>` against
    /// `<p>foo<strong>bar</strong><span ui></span></p>`
    fn fixture() -> (Mapper, Element, ViewElement) {
        let paragraph = Element::new("paragraph")
            .with_child(Node::text("foo"))
            .with_child(quire_model::Text::new("bar").with_attr("bold", true));
        let model_root = Element::new("$root").with_child(paragraph);

        let p = ViewElement::container("p")
            .with_child(ViewNode::text("foo"))
            .with_child(ViewElement::attribute_element("strong", 10).with_child(ViewNode::text("bar")))
            .with_child(ViewElement::ui("span"));
        let view_root = ViewElement::container("$root").with_child(p);

        let mut mapper = Mapper::new();
        mapper.bind_elements(model_root.id, view_root.id);
        let paragraph_id = model_root.children[0].as_element().map(|e| e.id).unwrap();
        let p_id = view_root.children[0].id();
        mapper.bind_elements(paragraph_id, p_id);
        (mapper, model_root, view_root)
    }

    #[test]
    fn test_model_to_view_positions() {
        let (mapper, model_root, view_root) = fixture();
        let view = |path: Vec<usize>| {
            mapper
                .to_view_position(&model_root, &view_root, &Position::new("main", path))
                .unwrap()
                .path
        };

        assert_eq!(view(vec![0]), vec![0]);
        assert_eq!(view(vec![1]), vec![1]);
        assert_eq!(view(vec![0, 0]), vec![0, 0]);
        assert_eq!(view(vec![0, 2]), vec![0, 0, 2]);
        assert_eq!(view(vec![0, 3]), vec![0, 1]);
        assert_eq!(view(vec![0, 4]), vec![0, 1, 0, 1]);
        assert_eq!(view(vec![0, 6]), vec![0, 2]);
    }

    #[test]
    fn test_view_to_model_positions() {
        let (mapper, model_root, view_root) = fixture();
        let model = |path: Vec<usize>| {
            mapper
                .to_model_position(&model_root, "main", &view_root, &ViewPosition::new(path))
                .unwrap()
                .path
        };

        assert_eq!(model(vec![1]), vec![1]);
        assert_eq!(model(vec![0, 0, 2]), vec![0, 2]);
        assert_eq!(model(vec![0, 1]), vec![0, 3]);
        assert_eq!(model(vec![0, 1, 0, 2]), vec![0, 5]);
        assert_eq!(model(vec![0, 2]), vec![0, 6]);
        assert_eq!(model(vec![0, 3]), vec![0, 6]);
    }

    #[test]
    fn test_model_lengths() {
        let (mapper, _, view_root) = fixture();
        let p = view_root.children[0].as_element().unwrap();

        assert_eq!(mapper.model_length(&view_root.children[0]), 1);
        assert_eq!(mapper.model_length(&p.children[1]), 3);
        assert_eq!(mapper.model_length(&p.children[2]), 0);
    }

    #[test]
    fn test_unbound_parent_is_an_error() {
        let (mut mapper, model_root, view_root) = fixture();
        let paragraph_id = model_root.children[0].as_element().map(|e| e.id).unwrap();
        mapper.unbind_model_element(paragraph_id);

        let result = mapper.to_view_position(&model_root, &view_root, &Position::new("main", vec![0, 1]));

        assert!(matches!(result, Err(ConversionError::UnmappedElement(_))));
    }

    #[test]
    fn test_rebinding_replaces_both_sides() {
        let mut mapper = Mapper::new();
        let (model_a, model_b) = (ElementId::next(), ElementId::next());
        let (view_a, view_b) = (ViewNodeId::next(), ViewNodeId::next());

        mapper.bind_elements(model_a, view_a);
        mapper.bind_elements(model_b, view_a);
        mapper.bind_elements(model_b, view_b);

        assert_eq!(mapper.to_view_element(model_a), None);
        assert_eq!(mapper.to_view_element(model_b), Some(view_b));
        assert_eq!(mapper.to_model_element(view_a), None);
    }

    #[test]
    fn test_marker_bindings() {
        let mut mapper = Mapper::new();
        let (start, end) = (ViewNodeId::next(), ViewNodeId::next());
        mapper.bind_element_to_marker(start, "comment:1");
        mapper.bind_element_to_marker(end, "comment:1");

        assert_eq!(mapper.marker_name_to_elements("comment:1").map(|set| set.len()), Some(2));

        mapper.unbind_element_from_marker_name(start, "comment:1");
        mapper.unbind_view_element(end);
        assert!(mapper.marker_name_to_elements("comment:1").is_none());
    }
}
