//! # Upcast
//!
//! View → model conversion. The dispatcher walks the view fragment and fires
//! one event per item: `element:<name>` for elements, `text` for text.
//! Listeners claim view aspects through the consumable, then write the model
//! fragment through the conversion API. Every write takes the [`Claim`] of
//! the view item it converts, and the claim must still be held in this pass.
//! A claim passed to `update_conversion_result` stays with the API, and
//! later listeners on the same item take it back with `take_claim`.
//!
//! Two listeners are always registered at [`Priority::Lowest`]:
//!
//! - `element`: unknown elements disappear but their children are converted
//!   in their place
//! - `text`: text goes where `$text` is allowed, or into a paragraph where
//!   only a paragraph is allowed; consecutive text shares that paragraph
//!
//! Inserting an element where the schema does not allow it splits the
//! ancestors between the cursor and the nearest parent that allows it. Parts
//! left empty by a split are dropped when the pass ends, and `$marker`
//! elements are turned into fragment markers.

pub mod helpers;

use crate::consumable::{Claim, Match, ViewConsumable};
use crate::error::{ConversionError, ConversionResult};
use crate::mapper::Mapper;
use crate::options::ConversionOptions;
use crate::registry::{EventInfo, ListenerRegistry, Priority};
use quire_model::{
    tree, Attributes, DocumentFragment, Element, ElementId, FragmentWriter, ModelError, Node, Position, Range, Schema,
    WalkerItem,
};
use quire_view::{ViewDocumentFragment, ViewElement, ViewNode, ViewNodeId};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, trace, warn};

/// Model attribute carrying the marker name on `$marker` elements
pub const MARKER_NAME_ATTRIBUTE: &str = "data-name";

pub type UpcastListener =
    dyn Fn(&mut EventInfo, &mut UpcastData<'_>, &mut UpcastConversionApi<'_>) -> ConversionResult<()>;

/// What a listener receives for one view item
#[derive(Debug, Clone)]
pub struct UpcastData<'v> {
    pub view_item: &'v ViewNode,
    /// Where converted content goes
    pub model_cursor: Position,
    /// Set by the listener that converted the item
    pub model_range: Option<Range>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpcastResult {
    pub model_range: Option<Range>,
    pub model_cursor: Position,
}

pub struct UpcastConversionApi<'a> {
    registry: &'a ListenerRegistry<UpcastListener>,
    pub consumable: ViewConsumable,
    writer: FragmentWriter,
    /// View items bound to the model elements they became
    pub mapper: Mapper,
    pub schema: &'a Schema,
    pub options: &'a ConversionOptions,
    /// Scratch space shared by the converters of one pass
    pub store: Map<String, Value>,
    auto_paragraph: Option<ElementId>,
    split_parts: Vec<Vec<ElementId>>,
    cursor_parents: HashMap<ElementId, ElementId>,
    claims: HashMap<ViewNodeId, Claim>,
}

impl<'a> UpcastConversionApi<'a> {
    fn new(
        registry: &'a ListenerRegistry<UpcastListener>,
        consumable: ViewConsumable,
        schema: &'a Schema,
        options: &'a ConversionOptions,
    ) -> Self {
        Self {
            registry,
            consumable,
            writer: FragmentWriter::new(),
            mapper: Mapper::new(),
            schema,
            options,
            store: Map::new(),
            auto_paragraph: None,
            split_parts: Vec::new(),
            cursor_parents: HashMap::new(),
            claims: HashMap::new(),
        }
    }

    /// The model fragment written so far
    pub fn writer(&self) -> &FragmentWriter {
        &self.writer
    }

    fn check_claim(&self, claim: &Claim) -> ConversionResult<()> {
        if self.consumable.holds(claim) {
            Ok(())
        } else {
            Err(ConversionError::ClaimNotHeld(claim.item().to_string()))
        }
    }

    /// Insert a node at `position`, with no schema check
    pub fn insert(&mut self, claim: &Claim, node: impl Into<Node>, position: &Position) -> ConversionResult<Range> {
        self.check_claim(claim)?;
        Ok(self.writer.insert(node, position)?)
    }

    /// Append a node to the element `parent`
    pub fn append(&mut self, claim: &Claim, node: impl Into<Node>, parent: ElementId) -> ConversionResult<Range> {
        self.check_claim(claim)?;
        Ok(self.writer.append(node, parent)?)
    }

    /// Move the content of a flat range into `element`
    pub fn wrap(&mut self, claim: &Claim, range: &Range, element: Element) -> ConversionResult<ElementId> {
        self.check_claim(claim)?;
        Ok(self.writer.wrap(range, element)?)
    }

    /// The claim an earlier listener converted `item` with. Hand it back
    /// with [`keep_claim`](Self::keep_claim) when done.
    pub fn take_claim(&mut self, item: &ViewNode) -> Option<Claim> {
        self.claims.remove(&item.id())
    }

    pub fn keep_claim(&mut self, claim: Claim) {
        self.claims.insert(claim.item(), claim);
    }

    fn fire(&mut self, event: &str, data: &mut UpcastData<'_>) -> ConversionResult<()> {
        let registry = self.registry;
        let mut info = EventInfo::new(event);
        for listener in registry.listeners_for(event) {
            listener(&mut info, data, self)?;
            if info.is_stopped() {
                trace!(event, "stopped");
                break;
            }
        }
        Ok(())
    }

    /// Fire the event for one view item at `cursor`
    pub fn convert_item(&mut self, item: &ViewNode, cursor: &Position) -> ConversionResult<UpcastResult> {
        let event = match item {
            ViewNode::Element(element) => format!("element:{}", element.name),
            ViewNode::Text(_) => "text".to_string(),
        };
        let mut data = UpcastData {
            view_item: item,
            model_cursor: cursor.clone(),
            model_range: None,
        };
        self.fire(&event, &mut data)?;

        match data.model_range {
            Some(range) => Ok(UpcastResult {
                model_range: Some(range),
                model_cursor: data.model_cursor,
            }),
            None => Ok(UpcastResult {
                model_range: None,
                model_cursor: cursor.clone(),
            }),
        }
    }

    /// Convert the children of `element` one after another starting at
    /// `cursor`. The range always comes back set, collapsed at `cursor` when
    /// nothing was converted.
    pub fn convert_children(&mut self, element: &ViewElement, cursor: &Position) -> ConversionResult<UpcastResult> {
        self.convert_nodes(&element.children, cursor)
    }

    fn convert_nodes(&mut self, nodes: &[ViewNode], cursor: &Position) -> ConversionResult<UpcastResult> {
        let mut next_cursor = cursor.clone();
        let mut range = Range::collapsed(cursor.clone());

        for node in nodes {
            let result = self.convert_item(node, &next_cursor)?;
            if let Some(converted) = result.model_range {
                range = Range::new(range.start.clone(), converted.end);
                next_cursor = result.model_cursor;
            }
        }

        Ok(UpcastResult {
            model_range: Some(range),
            model_cursor: next_cursor,
        })
    }

    /// Insert `element` at `cursor`, splitting ancestors up to the nearest one
    /// that allows it. `None` when no ancestor below a limit allows it.
    pub fn safe_insert(&mut self, claim: &Claim, element: Element, cursor: &Position) -> ConversionResult<Option<Range>> {
        self.check_claim(claim)?;
        let Some(depth) = self.allowed_depth(&element.name, cursor) else {
            debug!(element = %element.name, path = ?cursor.path, "no allowed parent");
            return Ok(None);
        };

        let mut position = cursor.clone();
        let mut cursor_parent = None;
        while position.parent_path().len() > depth {
            let (original, clone, after) = self.split(&position)?;
            cursor_parent.get_or_insert(clone);
            self.register_split(original, clone);
            position = after;
        }

        let id = element.id;
        let range = self.writer.insert(element, &position)?;
        if let Some(parent) = cursor_parent {
            self.cursor_parents.insert(id, parent);
        }
        Ok(Some(range))
    }

    /// Depth of the nearest ancestor of `cursor` that accepts `name`
    fn allowed_depth(&self, name: &str, cursor: &Position) -> Option<usize> {
        let root = &self.writer.fragment().root;
        let parent_path = cursor.parent_path();

        for depth in (0..=parent_path.len()).rev() {
            let ancestor = tree::descend(root, &parent_path[..depth])?;
            if self.schema.check_child(&ancestor.name, name) {
                return Some(depth);
            }
            if self.schema.is_limit(&ancestor.name) {
                return None;
            }
        }
        None
    }

    /// Split the parent of `position` there. Returns the original, the new
    /// right part and the position between them.
    fn split(&mut self, position: &Position) -> ConversionResult<(ElementId, ElementId, Position)> {
        let invalid = || ModelError::invalid_position(position.root.clone(), &position.path);

        let root = &mut self.writer.fragment_mut().root;
        let parent = tree::descend_mut(root, position.parent_path()).ok_or_else(invalid)?;
        let index = tree::split_at(parent, position.offset()).ok_or_else(invalid)?;

        let mut clone = Element::new(parent.name.clone());
        clone.attributes = parent.attributes.clone();
        clone.children = parent.children.drain(index..).collect();
        let (original, clone_id) = (parent.id, clone.id);

        let before_parent = position.parent_position().ok_or_else(invalid)?;
        let after = before_parent.with_offset(before_parent.offset() + 1);
        self.writer.insert(clone, &after)?;

        trace!(element = %original, clone = %clone_id, "split for insertion");
        Ok((original, clone_id, after))
    }

    fn register_split(&mut self, original: ElementId, clone: ElementId) {
        match self.split_parts.iter_mut().find(|parts| parts.contains(&original)) {
            Some(parts) => parts.push(clone),
            None => self.split_parts.push(vec![original, clone]),
        }
    }

    /// All parts an element was split into, in document order
    pub fn split_parts_of(&self, id: ElementId) -> Vec<ElementId> {
        self.split_parts
            .iter()
            .find(|parts| parts.contains(&id))
            .cloned()
            .unwrap_or_else(|| vec![id])
    }

    /// Record that the view item became the element `id`: the range spans
    /// the element with all its split parts, and the cursor moves past them,
    /// or into the part the insertion split off.
    ///
    /// The element is bound to the claimed view item unless it is already
    /// bound, and the API keeps the claim.
    pub fn update_conversion_result(&mut self, claim: Claim, id: ElementId, data: &mut UpcastData<'_>) -> ConversionResult<()> {
        self.check_claim(&claim)?;
        let parts = self.split_parts_of(id);
        let (first, last) = (parts[0], parts[parts.len() - 1]);
        let fragment = self.writer.fragment();

        let bindable = fragment.element(id).is_some_and(|element| element.name != "$marker");
        if bindable && self.mapper.to_view_element(id).is_none() {
            self.mapper.bind_elements(id, claim.item());
        }

        let start = fragment.position_before(first).ok_or(ModelError::ElementNotFound(first))?;
        let end = fragment.position_after(last).ok_or(ModelError::ElementNotFound(last))?;
        data.model_cursor = match self.cursor_parents.get(&id) {
            Some(&parent) => fragment
                .position_in(parent, 0)
                .ok_or(ModelError::ElementNotFound(parent))?,
            None => end.clone(),
        };
        data.model_range = Some(Range::new(start, end));
        self.keep_claim(claim);
        Ok(())
    }

    /// Set an attribute on one element if the schema allows it there
    pub fn set_element_attribute(&mut self, claim: &Claim, id: ElementId, key: &str, value: Value) -> ConversionResult<bool> {
        self.check_claim(claim)?;
        let name = self
            .writer
            .fragment()
            .element(id)
            .map(|element| element.name.clone())
            .ok_or(ModelError::ElementNotFound(id))?;
        if !self.schema.check_attribute(&name, key) {
            return Ok(false);
        }
        self.writer.set_attribute(key, value, id)?;
        Ok(true)
    }

    /// Set an attribute on every item of `range` that allows it and does not
    /// have it yet. Returns whether any item allows it.
    pub fn set_attributes_on(
        &mut self,
        claim: &Claim,
        range: &Range,
        key: &str,
        value: &Value,
        shallow: bool,
    ) -> ConversionResult<bool> {
        self.check_claim(claim)?;
        enum Target {
            Text(Range),
            Element(ElementId),
        }

        let root = &self.writer.fragment().root;
        let mut allowed = false;
        let mut targets = Vec::new();
        for item in range.walker(root, shallow) {
            match &item {
                WalkerItem::ElementStart { element, .. } => {
                    if self.schema.check_attribute(&element.name, key) {
                        allowed = true;
                        if !element.attributes.contains_key(key) {
                            targets.push(Target::Element(element.id));
                        }
                    }
                }
                WalkerItem::Text { text, .. } => {
                    if self.schema.check_attribute("$text", key) {
                        allowed = true;
                        if !text.attributes.contains_key(key) {
                            targets.push(Target::Text(item.range()));
                        }
                    }
                }
                WalkerItem::ElementEnd { .. } => {}
            }
        }

        for target in targets {
            match target {
                Target::Text(range) => self.writer.set_attribute_on_range(key, Some(value), &range)?,
                Target::Element(id) => self.writer.set_attribute(key, value.clone(), id)?,
            }
        }
        Ok(allowed)
    }

    fn remove_empty_split_parts(&mut self) -> ConversionResult<()> {
        let parts: Vec<ElementId> = self.split_parts.iter().flatten().copied().collect();
        for id in parts {
            let fragment = self.writer.fragment();
            if !fragment.element(id).is_some_and(Element::is_empty) {
                continue;
            }
            if let Some(range) = fragment.range_on(id) {
                self.writer.remove(&range)?;
                self.mapper.unbind_model_element(id);
            }
        }
        Ok(())
    }
}

/// Convert the children of elements nobody else converted
fn convert_element_children(
    _info: &mut EventInfo,
    data: &mut UpcastData<'_>,
    api: &mut UpcastConversionApi<'_>,
) -> ConversionResult<()> {
    if data.model_range.is_some() {
        return Ok(());
    }
    let item = data.view_item;
    let ViewNode::Element(element) = item else {
        return Ok(());
    };
    if api.consumable.consume(item, &Match::name()).is_none() {
        return Ok(());
    }

    let result = api.convert_children(element, &data.model_cursor)?;
    data.model_range = result.model_range;
    data.model_cursor = result.model_cursor;
    Ok(())
}

fn convert_text(_info: &mut EventInfo, data: &mut UpcastData<'_>, api: &mut UpcastConversionApi<'_>) -> ConversionResult<()> {
    let item = data.view_item;
    let ViewNode::Text(text) = item else {
        return Ok(());
    };
    if api.consumable.test(item, &Match::name()) != Some(true) {
        return Ok(());
    }
    let parent_name = api.writer.fragment().parent_of(&data.model_cursor)?.name.clone();

    if api.schema.check_child(&parent_name, "$text") {
        let Some(claim) = api.consumable.consume(item, &Match::name()) else {
            return Ok(());
        };
        let node = api.writer.create_text(text.data.clone(), Attributes::new());
        let range = api.insert(&claim, node, &data.model_cursor)?;
        data.model_cursor = range.end.clone();
        data.model_range = Some(range);
        return Ok(());
    }

    // Whitespace alone never opens a paragraph
    if !api.schema.is_paragraphable(&parent_name, "$text") || text.data.trim().is_empty() {
        return Ok(());
    }
    let Some(claim) = api.consumable.consume(item, &Match::name()) else {
        return Ok(());
    };

    let previous = data.model_cursor.node_before(&api.writer.fragment().root);
    let reused = match (api.auto_paragraph, previous) {
        (Some(id), Some(Node::Element(element))) if element.id == id => Some(id),
        _ => None,
    };
    let paragraph = match reused {
        Some(id) => id,
        None => {
            let paragraph = api.writer.create_element("paragraph", Attributes::new());
            let id = paragraph.id;
            api.insert(&claim, paragraph, &data.model_cursor)?;
            api.auto_paragraph = Some(id);
            id
        }
    };

    let at = api
        .writer
        .fragment()
        .position_at_end_of(paragraph)
        .ok_or(ModelError::ElementNotFound(paragraph))?;
    let node = api.writer.create_text(text.data.clone(), Attributes::new());
    let text_range = api.insert(&claim, node, &at)?;

    let fragment = api.writer.fragment();
    data.model_cursor = fragment
        .position_after(paragraph)
        .ok_or(ModelError::ElementNotFound(paragraph))?;
    data.model_range = Some(match reused {
        Some(_) => text_range,
        None => fragment.range_on(paragraph).ok_or(ModelError::ElementNotFound(paragraph))?,
    });
    Ok(())
}

/// Turn `$marker` elements into fragment markers. The first element with a
/// name marks the start, the last one the end.
fn extract_markers(writer: &mut FragmentWriter) -> ConversionResult<()> {
    let mut boundaries: BTreeMap<String, Vec<Position>> = BTreeMap::new();

    while let Some((position, id)) = writer.fragment().elements_named("$marker").into_iter().next() {
        let name = writer
            .fragment()
            .element(id)
            .and_then(|element| element.attribute(MARKER_NAME_ATTRIBUTE))
            .and_then(Value::as_str)
            .map(str::to_string);
        writer.remove(&Range::with_length(position.clone(), 1))?;

        match name {
            Some(name) => boundaries.entry(name).or_default().push(position),
            None => warn!(path = ?position.path, "marker element without a name"),
        }
    }

    for (name, positions) in boundaries {
        let start = positions[0].clone();
        let end = positions[positions.len() - 1].clone();
        trace!(marker = %name, "extracted marker");
        writer.set_marker(name, Range::new(start, end));
    }
    Ok(())
}

fn report_unconverted(consumable: &ViewConsumable, nodes: &[ViewNode]) {
    for node in nodes {
        match node {
            ViewNode::Text(text) => {
                if !text.data.trim().is_empty() && consumable.test(node, &Match::name()) == Some(true) {
                    warn!(text = %text.data, "view text dropped");
                }
            }
            ViewNode::Element(element) => {
                if consumable.test(node, &Match::name()) == Some(true) {
                    warn!(element = %element.name, "view element not converted");
                }
                report_unconverted(consumable, &element.children);
            }
        }
    }
}

/// View → model dispatcher
#[derive(Debug)]
pub struct UpcastDispatcher {
    registry: ListenerRegistry<UpcastListener>,
}

impl Default for UpcastDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl UpcastDispatcher {
    /// Dispatcher with the generic element and text converters
    pub fn new() -> Self {
        let mut dispatcher = Self {
            registry: ListenerRegistry::new(),
        };
        dispatcher.on("element", Priority::Lowest, convert_element_children);
        dispatcher.on("text", Priority::Lowest, convert_text);
        dispatcher
    }

    pub fn on<F>(&mut self, event: impl Into<String>, priority: Priority, callback: F)
    where
        F: Fn(&mut EventInfo, &mut UpcastData<'_>, &mut UpcastConversionApi<'_>) -> ConversionResult<()> + 'static,
    {
        self.registry.on(event, priority, Box::new(callback));
    }

    /// Convert a view fragment into a model fragment
    pub fn convert(
        &self,
        view: &ViewDocumentFragment,
        schema: &Schema,
        options: &ConversionOptions,
    ) -> ConversionResult<DocumentFragment> {
        self.convert_with_mapper(view, schema, options).map(|(fragment, _)| fragment)
    }

    /// Convert a view fragment and keep the bindings between the view
    /// elements and the model elements they became
    pub fn convert_with_mapper(
        &self,
        view: &ViewDocumentFragment,
        schema: &Schema,
        options: &ConversionOptions,
    ) -> ConversionResult<(DocumentFragment, Mapper)> {
        info!(nodes = view.children().len(), "upcast");
        let consumable = ViewConsumable::create_from(view);
        let mut api = UpcastConversionApi::new(&self.registry, consumable, schema, options);

        api.convert_nodes(view.children(), &Position::in_fragment(vec![0]))?;
        api.remove_empty_split_parts()?;
        report_unconverted(&api.consumable, view.children());

        let UpcastConversionApi { mut writer, mapper, .. } = api;
        extract_markers(&mut writer)?;
        Ok((writer.into_fragment(), mapper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upcast::helpers;
    use quire_model::notation;
    use quire_model::SchemaItem;
    use quire_view::notation::parse;

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema.register("blockQuote", SchemaItem::default().allow_where("$block").allow_content_of("$root"));
        schema.register("image", SchemaItem::default().allow_where("$block").object());
        schema
    }

    fn upcast(dispatcher: &UpcastDispatcher, view: &str) -> DocumentFragment {
        dispatcher
            .convert(&parse(view).unwrap(), &schema(), &ConversionOptions::new())
            .unwrap()
    }

    #[test]
    fn test_text_is_auto_paragraphed() {
        let dispatcher = UpcastDispatcher::new();
        let fragment = upcast(&dispatcher, "foo<div>bar</div>");

        assert_eq!(notation::stringify(fragment.children()), "<paragraph>foobar</paragraph>");
    }

    #[test]
    fn test_whitespace_alone_is_not_paragraphed() {
        let dispatcher = UpcastDispatcher::new();
        let fragment = upcast(&dispatcher, "  ");

        assert!(fragment.is_empty());
    }

    #[test]
    fn test_insertion_splits_disallowing_parents() {
        let mut dispatcher = UpcastDispatcher::new();
        helpers::element_to_element(&mut dispatcher, "p", "paragraph");
        helpers::element_to_element(&mut dispatcher, "img", "image");

        let fragment = upcast(&dispatcher, "<p>foo<img></img>bar</p>");

        assert_eq!(
            notation::stringify(fragment.children()),
            "<paragraph>foo</paragraph><image></image><paragraph>bar</paragraph>"
        );
    }

    #[test]
    fn test_empty_split_parts_are_dropped() {
        let mut dispatcher = UpcastDispatcher::new();
        helpers::element_to_element(&mut dispatcher, "p", "paragraph");
        helpers::element_to_element(&mut dispatcher, "img", "image");

        let fragment = upcast(&dispatcher, "<p><img></img></p>");

        assert_eq!(notation::stringify(fragment.children()), "<image></image>");
    }

    #[test]
    fn test_refused_insertion_keeps_view_item_available() {
        let mut dispatcher = UpcastDispatcher::new();
        helpers::element_to_element(&mut dispatcher, "p", "paragraph");
        // Nothing allows `unknownBlock`, so the generic converter unwraps it
        helpers::element_to_element(&mut dispatcher, "section", "unknownBlock");

        let fragment = upcast(&dispatcher, "<section><p>foo</p></section>");

        assert_eq!(notation::stringify(fragment.children()), "<paragraph>foo</paragraph>");
    }

    #[test]
    fn test_stop_keeps_lower_listeners_out() {
        let mut dispatcher = UpcastDispatcher::new();
        helpers::element_to_element(&mut dispatcher, "p", "paragraph");
        dispatcher.on("element:p", Priority::High, |info, _data, _api| {
            info.stop();
            Ok(())
        });

        let fragment = upcast(&dispatcher, "<p>foo</p>");

        assert!(fragment.is_empty());
    }

    #[test]
    fn test_listener_error_aborts_the_pass() {
        let mut dispatcher = UpcastDispatcher::new();
        dispatcher.on("element:p", Priority::Normal, |info, _data, _api| {
            Err(crate::error::ConversionError::listener(info.name(), "refused"))
        });

        let result = dispatcher.convert(&parse("<p>foo</p>").unwrap(), &schema(), &ConversionOptions::new());

        assert!(matches!(result, Err(crate::error::ConversionError::Listener { .. })));
    }

    #[test]
    fn test_converted_elements_are_bound() {
        let mut dispatcher = UpcastDispatcher::new();
        helpers::element_to_element(&mut dispatcher, "p", "paragraph");
        let view = parse("<div><p>foo</p><p>bar</p></div>").unwrap();

        let (fragment, mapper) = dispatcher
            .convert_with_mapper(&view, &schema(), &ConversionOptions::new())
            .unwrap();

        let div = view.children()[0].as_element().unwrap();
        let model_ids: Vec<ElementId> = fragment
            .children()
            .iter()
            .filter_map(|node| node.as_element().map(|element| element.id))
            .collect();
        assert_eq!(model_ids.len(), 2);
        for (model_id, view_p) in model_ids.iter().zip(&div.children) {
            assert_eq!(mapper.to_view_element(*model_id), Some(view_p.id()));
        }
        assert_eq!(mapper.to_model_element(div.id), None);
    }

    #[test]
    fn test_later_listener_writes_with_the_conversion_claim() {
        let mut dispatcher = UpcastDispatcher::new();
        helpers::element_to_element(&mut dispatcher, "p", "paragraph");
        dispatcher.on("element:p", Priority::Low, |_info, data, api| {
            let Some(claim) = api.take_claim(data.view_item) else {
                return Ok(());
            };
            if let Some(id) = api.mapper.to_model_element(data.view_item.id()) {
                let text = api.writer().create_text("!", Attributes::new());
                api.append(&claim, text, id)?;
            }
            api.keep_claim(claim);
            Ok(())
        });

        let fragment = upcast(&dispatcher, "<p>foo</p>");

        assert_eq!(notation::stringify(fragment.children()), "<paragraph>foo!</paragraph>");
    }

    #[test]
    fn test_writing_needs_a_claim_of_this_pass() {
        let mut dispatcher = UpcastDispatcher::new();
        dispatcher.on("element:p", Priority::Normal, |_info, data, api| {
            let elsewhere = parse("<p></p>").unwrap();
            let mut foreign = ViewConsumable::create_from(&elsewhere);
            let Some(claim) = foreign.consume(&elsewhere.children()[0], &Match::name()) else {
                return Ok(());
            };
            let paragraph = api.writer().create_element("paragraph", Attributes::new());
            api.insert(&claim, paragraph, &data.model_cursor)?;
            Ok(())
        });

        let result = dispatcher.convert(&parse("<p>foo</p>").unwrap(), &schema(), &ConversionOptions::new());

        assert!(matches!(result, Err(ConversionError::ClaimNotHeld(_))));
    }

    #[test]
    fn test_marker_elements_become_markers() {
        let mut dispatcher = UpcastDispatcher::new();
        helpers::element_to_element(&mut dispatcher, "p", "paragraph");
        helpers::element_to_marker(&mut dispatcher, "comment-start", "comment");
        helpers::element_to_marker(&mut dispatcher, "comment-end", "comment");

        let fragment = upcast(
            &dispatcher,
            r#"<p>a<comment-start name="1"></comment-start>bc<comment-end name="1"></comment-end>d</p>"#,
        );

        assert_eq!(notation::stringify(fragment.children()), "<paragraph>abcd</paragraph>");
        assert_eq!(
            fragment.markers.get("comment:1"),
            Some(&Range::new(Position::in_fragment(vec![0, 1]), Position::in_fragment(vec![0, 3])))
        );
    }
}
