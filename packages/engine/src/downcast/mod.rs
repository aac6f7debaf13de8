//! # Downcast
//!
//! Model → view conversion. Converting a model range walks it deep and, for
//! every item, fires `insert:<name>` (`insert:$text` for text) followed by one
//! `attribute:<key>:<name>` event per attribute the item has. Markers are
//! converted afterwards: `addMarker:<name>` fires once for the whole marker
//! range with no item, then, unless that whole-range event was consumed, once
//! per item. A collapsed marker has no items, so it fires exactly once.
//!
//! An event only fires while its `(item, event)` pair is still available in
//! the model consumable.

pub mod helpers;

use crate::consumable::{ModelConsumable, ModelItem};
use crate::error::ConversionResult;
use crate::mapper::Mapper;
use crate::options::ConversionOptions;
use crate::registry::{EventInfo, ListenerRegistry, Priority};
use quire_model::{Attributes, Element, ElementId, Position, Range, WalkerItem};
use quire_view::{DowncastWriter, ViewDocumentFragment, ViewPosition, ViewRange};
use serde_json::Value;
use tracing::{debug, info, trace};

pub type DowncastListener =
    dyn Fn(&mut EventInfo, &DowncastData, &mut DowncastConversionApi<'_>) -> ConversionResult<()>;

/// Model item an event is about
#[derive(Debug, Clone, PartialEq)]
pub enum DowncastItem {
    Element {
        id: ElementId,
        name: String,
        attributes: Attributes,
    },
    Text {
        data: String,
        attributes: Attributes,
    },
}

impl DowncastItem {
    fn from_walker(item: &WalkerItem<'_>) -> Option<Self> {
        match item {
            WalkerItem::ElementStart { element, .. } => Some(DowncastItem::Element {
                id: element.id,
                name: element.name.clone(),
                attributes: element.attributes.clone(),
            }),
            WalkerItem::Text { text, .. } => Some(DowncastItem::Text {
                data: text.data.clone(),
                attributes: text.attributes.clone(),
            }),
            WalkerItem::ElementEnd { .. } => None,
        }
    }

    /// `$text` for text
    pub fn name(&self) -> &str {
        match self {
            DowncastItem::Element { name, .. } => name,
            DowncastItem::Text { .. } => "$text",
        }
    }

    pub fn attributes(&self) -> &Attributes {
        match self {
            DowncastItem::Element { attributes, .. } | DowncastItem::Text { attributes, .. } => attributes,
        }
    }

    /// Consumable key of the item spanning `range`
    pub fn consumable_key(&self, range: &Range) -> ModelItem {
        match self {
            DowncastItem::Element { id, .. } => ModelItem::Element(*id),
            DowncastItem::Text { .. } => ModelItem::Range(range.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeChange {
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

/// What a listener receives for one event
#[derive(Debug, Clone, PartialEq)]
pub struct DowncastData {
    /// `None` for the whole-range marker event
    pub item: Option<DowncastItem>,
    /// Range spanning the item, or the marker range
    pub range: Range,
    pub attribute: Option<AttributeChange>,
    pub marker_name: Option<String>,
    pub marker_range: Option<Range>,
}

impl DowncastData {
    /// Consumable key for this event's subject
    pub fn consumable_key(&self) -> ModelItem {
        match &self.item {
            Some(item) => item.consumable_key(&self.range),
            None => ModelItem::Range(self.range.clone()),
        }
    }
}

pub struct DowncastConversionApi<'a> {
    registry: &'a ListenerRegistry<DowncastListener>,
    pub consumable: ModelConsumable,
    pub writer: DowncastWriter,
    pub mapper: Mapper,
    pub options: &'a ConversionOptions,
    pub model_root: &'a Element,
    pub root_name: &'a str,
}

impl<'a> DowncastConversionApi<'a> {
    fn new(
        registry: &'a ListenerRegistry<DowncastListener>,
        model_root: &'a Element,
        root_name: &'a str,
        options: &'a ConversionOptions,
    ) -> Self {
        let writer = DowncastWriter::new();
        let mut mapper = Mapper::new();
        mapper.bind_elements(model_root.id, writer.root_id());
        Self {
            registry,
            consumable: ModelConsumable::new(),
            writer,
            mapper,
            options,
            model_root,
            root_name,
        }
    }

    pub fn view_position(&self, position: &Position) -> ConversionResult<ViewPosition> {
        self.mapper
            .to_view_position(self.model_root, &self.writer.fragment().root, position)
    }

    pub fn view_range(&self, range: &Range) -> ConversionResult<ViewRange> {
        self.mapper
            .to_view_range(self.model_root, &self.writer.fragment().root, range)
    }

    /// Consume the event's subject for the event being fired
    pub fn consume(&mut self, info: &EventInfo, data: &DowncastData) -> bool {
        self.consumable.consume(&data.consumable_key(), info.name())
    }

    fn fire(&mut self, event: &str, data: &DowncastData) -> ConversionResult<()> {
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

    fn test_and_fire(&mut self, event: &str, data: &DowncastData) -> ConversionResult<()> {
        if self.consumable.test(&data.consumable_key(), event) != Some(true) {
            return Ok(());
        }
        self.fire(event, data)
    }

    fn items_of(&self, range: &Range) -> Vec<(DowncastItem, Range)> {
        range
            .items(self.model_root)
            .filter_map(|item| DowncastItem::from_walker(&item).map(|converted| (converted, item.range())))
            .collect()
    }

    /// Convert the insertion of everything in `range`
    pub fn convert_insert(&mut self, range: &Range) -> ConversionResult<()> {
        let items = self.items_of(range);

        for (item, item_range) in &items {
            let key = item.consumable_key(item_range);
            self.consumable.add(key.clone(), format!("insert:{}", item.name()));
            for attribute in item.attributes().keys() {
                self.consumable.add(key.clone(), format!("attribute:{}:{}", attribute, item.name()));
            }
        }

        for (item, item_range) in items {
            let name = item.name().to_string();
            let attributes = item.attributes().clone();
            let mut data = DowncastData {
                item: Some(item),
                range: item_range,
                attribute: None,
                marker_name: None,
                marker_range: None,
            };
            self.test_and_fire(&format!("insert:{name}"), &data)?;

            for (key, value) in attributes {
                let event = format!("attribute:{key}:{name}");
                data.attribute = Some(AttributeChange {
                    key,
                    old_value: None,
                    new_value: Some(value),
                });
                self.test_and_fire(&event, &data)?;
            }
        }
        Ok(())
    }

    /// Convert a marker over `range`
    pub fn convert_marker_add(&mut self, name: &str, range: &Range) -> ConversionResult<()> {
        let event = format!("addMarker:{name}");
        if !self.registry.has_listeners(&event) {
            return Ok(());
        }
        debug!(marker = name, range = %range, "converting marker");

        let whole = DowncastData {
            item: None,
            range: range.clone(),
            attribute: None,
            marker_name: Some(name.to_string()),
            marker_range: Some(range.clone()),
        };
        self.consumable = ModelConsumable::new();
        self.consumable.add(whole.consumable_key(), event.clone());
        self.fire(&event, &whole)?;

        if range.is_collapsed() || self.consumable.test(&whole.consumable_key(), &event) != Some(true) {
            return Ok(());
        }

        let items = self.items_of(range);
        for (item, item_range) in &items {
            self.consumable.add(item.consumable_key(item_range), event.clone());
        }
        for (item, item_range) in items {
            let data = DowncastData {
                item: Some(item),
                range: item_range,
                attribute: None,
                marker_name: Some(name.to_string()),
                marker_range: Some(range.clone()),
            };
            self.test_and_fire(&event, &data)?;
        }
        Ok(())
    }
}

/// Model → view dispatcher
#[derive(Debug)]
pub struct DowncastDispatcher {
    registry: ListenerRegistry<DowncastListener>,
}

impl Default for DowncastDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Output of a downcast pass
#[derive(Debug)]
pub struct DowncastResult {
    pub fragment: ViewDocumentFragment,
    pub mapper: Mapper,
}

fn insert_text(info: &mut EventInfo, data: &DowncastData, api: &mut DowncastConversionApi<'_>) -> ConversionResult<()> {
    let Some(DowncastItem::Text { data: text, .. }) = &data.item else {
        return Ok(());
    };
    if !api.consume(info, data) {
        return Ok(());
    }
    let position = api.view_position(&data.range.start)?;
    let node = api.writer.create_text(text.clone());
    api.writer.insert(&position, node)?;
    Ok(())
}

impl DowncastDispatcher {
    /// Dispatcher with the text converter
    pub fn new() -> Self {
        let mut dispatcher = Self {
            registry: ListenerRegistry::new(),
        };
        dispatcher.on("insert:$text", Priority::Lowest, insert_text);
        dispatcher
    }

    pub fn on<F>(&mut self, event: impl Into<String>, priority: Priority, callback: F)
    where
        F: Fn(&mut EventInfo, &DowncastData, &mut DowncastConversionApi<'_>) -> ConversionResult<()> + 'static,
    {
        self.registry.on(event, priority, Box::new(callback));
    }

    /// Convert the content of a root and the given markers into a new view
    /// fragment. The model root is bound to the fragment root.
    pub fn convert(
        &self,
        model_root: &Element,
        root_name: &str,
        markers: &[(String, Range)],
        options: &ConversionOptions,
    ) -> ConversionResult<DowncastResult> {
        info!(root = root_name, markers = markers.len(), "downcast");
        let mut api = DowncastConversionApi::new(&self.registry, model_root, root_name, options);

        let range = Range::new(
            Position::new(root_name, vec![0]),
            Position::new(root_name, vec![model_root.max_offset()]),
        );
        api.convert_insert(&range)?;
        for (name, marker_range) in markers {
            api.convert_marker_add(name, marker_range)?;
        }

        Ok(DowncastResult {
            fragment: api.writer.into_fragment(),
            mapper: api.mapper,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downcast::helpers;
    use quire_model::{notation, Element, Node};
    use quire_view::notation::stringify_fragment;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn root(model: &str) -> Element {
        Element::new("$root").with_children(notation::parse(model).unwrap())
    }

    fn dispatcher() -> DowncastDispatcher {
        let mut dispatcher = DowncastDispatcher::new();
        helpers::element_to_element(&mut dispatcher, "paragraph", "p");
        helpers::attribute_to_element(&mut dispatcher, "bold", "strong");
        dispatcher
    }

    #[test]
    fn test_text_and_attributes() {
        let root = root(r#"<paragraph>foo<$text bold="true">bar</$text></paragraph>"#);
        let result = dispatcher()
            .convert(&root, "main", &[], &ConversionOptions::new())
            .unwrap();

        assert_eq!(stringify_fragment(&result.fragment), "<p>foo<strong>bar</strong></p>");
    }

    #[test]
    fn test_paragraph_is_bound() {
        let root = root("<paragraph>foo</paragraph>");
        let result = dispatcher()
            .convert(&root, "main", &[], &ConversionOptions::new())
            .unwrap();
        let paragraph = root.children[0].as_element().map(|p| p.id).unwrap();

        assert_eq!(result.mapper.to_view_element(paragraph), Some(result.fragment.children()[0].id()));
    }

    #[test]
    fn test_consumed_insert_is_not_converted_twice() {
        let mut dispatcher = dispatcher();
        dispatcher.on("insert:paragraph", Priority::High, |info, data, api| {
            let DowncastItem::Element { id, .. } = data.item.as_ref().unwrap() else {
                return Ok(());
            };
            if !api.consume(info, data) {
                return Ok(());
            }
            let position = api.view_position(&data.range.start)?;
            let div = api.writer.create_container_element("div", [("class", "lead")]);
            let view_id = div.id;
            api.writer.insert(&position, div)?;
            api.mapper.bind_elements(*id, view_id);
            Ok(())
        });

        let root = root("<paragraph>foo</paragraph>");
        let result = dispatcher.convert(&root, "main", &[], &ConversionOptions::new()).unwrap();

        assert_eq!(stringify_fragment(&result.fragment), r#"<div class="lead">foo</div>"#);
    }

    #[test]
    fn test_collapsed_marker_fires_once() {
        let fired: Rc<RefCell<Vec<(bool, String)>>> = Rc::default();
        let mut dispatcher = dispatcher();
        let log = fired.clone();
        dispatcher.on("addMarker", Priority::Normal, move |info, data, _api| {
            log.borrow_mut().push((data.item.is_some(), info.name().to_string()));
            Ok(())
        });

        let root = root("<paragraph>foo</paragraph>");
        let at = Position::new("main", vec![0, 1]);
        dispatcher
            .convert(&root, "main", &[("search:1".to_string(), Range::collapsed(at))], &ConversionOptions::new())
            .unwrap();

        assert_eq!(*fired.borrow(), vec![(false, "addMarker:search:1".to_string())]);
    }

    #[test]
    fn test_unconsumed_marker_fires_per_item() {
        let fired: Rc<RefCell<Vec<Option<String>>>> = Rc::default();
        let mut dispatcher = dispatcher();
        let log = fired.clone();
        dispatcher.on("addMarker:highlight", Priority::Normal, move |_info, data, _api| {
            log.borrow_mut().push(data.item.as_ref().map(|item| item.name().to_string()));
            Ok(())
        });

        let root = Element::new("$root").with_child(
            Element::new("paragraph")
                .with_child(Node::text("ab"))
                .with_child(Element::new("softBreak")),
        );
        let range = Range::new(Position::new("main", vec![0, 1]), Position::new("main", vec![0, 3]));
        dispatcher
            .convert(&root, "main", &[("highlight".to_string(), range)], &ConversionOptions::new())
            .unwrap();

        assert_eq!(
            *fired.borrow(),
            vec![None, Some("$text".to_string()), Some("softBreak".to_string())]
        );
    }

    #[test]
    fn test_options_reach_listeners() {
        let seen: Rc<RefCell<Option<Value>>> = Rc::default();
        let mut dispatcher = dispatcher();
        let log = seen.clone();
        dispatcher.on("insert:paragraph", Priority::Highest, move |_info, _data, api| {
            *log.borrow_mut() = api.options.get("flag").cloned();
            Ok(())
        });

        let root = root("<paragraph>foo</paragraph>");
        let options = ConversionOptions::new().with("flag", "yes");
        dispatcher.convert(&root, "main", &[], &options).unwrap();

        assert_eq!(*seen.borrow(), Some(Value::String("yes".to_string())));
    }
}
