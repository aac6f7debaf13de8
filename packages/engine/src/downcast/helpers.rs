//! Ready-made downcast converters for the common shapes.

use super::{DowncastDispatcher, DowncastItem};
use crate::consumable::ModelItem;
use crate::registry::Priority;
use quire_view::ViewElement;
use serde_json::Value;

/// Attribute element priority used for text attributes
pub const DEFAULT_ATTRIBUTE_PRIORITY: i32 = 10;

fn is_set(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

fn view_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// `<model_name>` becomes a `<view_name>` container bound to it
pub fn element_to_element(dispatcher: &mut DowncastDispatcher, model_name: &str, view_name: &str) {
    let view_name = view_name.to_string();
    dispatcher.on(format!("insert:{model_name}"), Priority::Normal, move |info, data, api| {
        let Some(DowncastItem::Element { id, .. }) = &data.item else {
            return Ok(());
        };
        if !api.consume(info, data) {
            return Ok(());
        }

        let position = api.view_position(&data.range.start)?;
        let element = api.writer.create_container_element(&view_name, Vec::<(String, String)>::new());
        let view_id = element.id;
        api.writer.insert(&position, element)?;
        api.mapper.bind_elements(*id, view_id);
        Ok(())
    });
}

/// `<model_name>` becomes a `<view_name>` element without content, such as `<br>`
pub fn element_to_empty_element(dispatcher: &mut DowncastDispatcher, model_name: &str, view_name: &str) {
    let view_name = view_name.to_string();
    dispatcher.on(format!("insert:{model_name}"), Priority::Normal, move |info, data, api| {
        let Some(DowncastItem::Element { id, .. }) = &data.item else {
            return Ok(());
        };
        if !api.consume(info, data) {
            return Ok(());
        }

        let position = api.view_position(&data.range.start)?;
        let element = api.writer.create_empty_element(&view_name, Vec::<(String, String)>::new());
        let view_id = element.id;
        api.writer.insert(&position, element)?;
        api.mapper.bind_elements(*id, view_id);
        Ok(())
    });
}

/// Text with `key` set is wrapped in a `<view_name>` attribute element
pub fn attribute_to_element(dispatcher: &mut DowncastDispatcher, key: &str, view_name: &str) {
    let view_name = view_name.to_string();
    dispatcher.on(format!("attribute:{key}:$text"), Priority::Normal, move |info, data, api| {
        let Some(value) = data.attribute.as_ref().and_then(|change| change.new_value.as_ref()) else {
            return Ok(());
        };
        if !is_set(value) || !api.consume(info, data) {
            return Ok(());
        }

        let range = api.view_range(&data.range)?;
        let wrapper =
            api.writer
                .create_attribute_element(&view_name, Vec::<(String, String)>::new(), DEFAULT_ATTRIBUTE_PRIORITY);
        api.writer.wrap(&range, wrapper)?;
        Ok(())
    });
}

/// `key` on an element becomes the `view_key` attribute of its view element
pub fn attribute_to_attribute(dispatcher: &mut DowncastDispatcher, key: &str, view_key: &str) {
    let view_key = view_key.to_string();
    dispatcher.on(format!("attribute:{key}"), Priority::Normal, move |info, data, api| {
        let Some(DowncastItem::Element { id, .. }) = &data.item else {
            return Ok(());
        };
        let Some(value) = data.attribute.as_ref().and_then(|change| change.new_value.as_ref()) else {
            return Ok(());
        };
        let Some(view_id) = api.mapper.to_view_element(*id) else {
            return Ok(());
        };
        if !api.consume(info, data) {
            return Ok(());
        }
        api.writer.set_attribute(&view_key, view_value(value), view_id)?;
        Ok(())
    });
}

/// `key` on an element becomes the `style_key` style of its view element
pub fn attribute_to_style(dispatcher: &mut DowncastDispatcher, key: &str, style_key: &str) {
    let style_key = style_key.to_string();
    dispatcher.on(format!("attribute:{key}"), Priority::Normal, move |info, data, api| {
        let Some(DowncastItem::Element { id, .. }) = &data.item else {
            return Ok(());
        };
        let Some(value) = data.attribute.as_ref().and_then(|change| change.new_value.as_ref()) else {
            return Ok(());
        };
        let Some(view_id) = api.mapper.to_view_element(*id) else {
            return Ok(());
        };
        if !api.consume(info, data) {
            return Ok(());
        }
        api.writer.set_style(style_key.clone(), view_value(value), view_id)?;
        Ok(())
    });
}

/// Markers of `group` become `<view_name>` UI elements at both boundaries,
/// or a single one for a collapsed marker. The part of the marker name after
/// `group:` goes into the `name` attribute.
pub fn marker_to_element(dispatcher: &mut DowncastDispatcher, group: &str, view_name: &str) {
    let group = group.to_string();
    let view_name = view_name.to_string();
    dispatcher.on(format!("addMarker:{group}"), Priority::Normal, move |info, data, api| {
        if data.item.is_some() {
            return Ok(());
        }
        let (Some(name), Some(range)) = (&data.marker_name, &data.marker_range) else {
            return Ok(());
        };
        if !api.consumable.consume(&ModelItem::Range(range.clone()), info.name()) {
            return Ok(());
        }

        let suffix = name
            .strip_prefix(group.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
            .map(str::to_string);
        let boundary = || {
            let element = ViewElement::ui(view_name.as_str());
            match &suffix {
                Some(suffix) => element.with_attr("name", suffix.clone()),
                None => element,
            }
        };

        // End first, so the start position is still valid
        let end = api.view_position(&range.end)?;
        let element = boundary();
        let end_id = element.id;
        api.writer.insert(&end, element)?;
        api.mapper.bind_element_to_marker(end_id, name.clone());

        if !range.is_collapsed() {
            let start = api.view_position(&range.start)?;
            let element = boundary();
            let start_id = element.id;
            api.writer.insert(&start, element)?;
            api.mapper.bind_element_to_marker(start_id, name.clone());
        }
        Ok(())
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ConversionOptions;
    use quire_model::{notation, Element, Position, Range};
    use quire_view::notation::stringify_fragment;

    fn dispatcher() -> DowncastDispatcher {
        let mut dispatcher = DowncastDispatcher::new();
        element_to_element(&mut dispatcher, "paragraph", "p");
        attribute_to_element(&mut dispatcher, "bold", "strong");
        attribute_to_element(&mut dispatcher, "italic", "em");
        attribute_to_style(&mut dispatcher, "alignment", "text-align");
        attribute_to_attribute(&mut dispatcher, "lang", "lang");
        marker_to_element(&mut dispatcher, "comment", "comment");
        dispatcher
    }

    fn downcast(model: &str, markers: &[(String, Range)]) -> String {
        let root = Element::new("$root").with_children(notation::parse(model).unwrap());
        let result = dispatcher()
            .convert(&root, "main", markers, &ConversionOptions::new())
            .unwrap();
        stringify_fragment(&result.fragment)
    }

    #[test]
    fn test_nested_text_attributes() {
        assert_eq!(
            downcast(r#"<paragraph>a<$text bold="true" italic="true">b</$text></paragraph>"#, &[]),
            "<p>a<em><strong>b</strong></em></p>"
        );
    }

    #[test]
    fn test_false_attribute_is_not_rendered() {
        assert_eq!(downcast(r#"<paragraph><$text bold="false">b</$text></paragraph>"#, &[]), "<p>b</p>");
    }

    #[test]
    fn test_element_attributes() {
        assert_eq!(
            downcast(r#"<paragraph alignment="center" lang="pl">b</paragraph>"#, &[]),
            r#"<p style="text-align:center" lang="pl">b</p>"#
        );
    }

    #[test]
    fn test_marker_boundaries() {
        let range = Range::new(Position::new("main", vec![0, 1]), Position::new("main", vec![0, 3]));
        assert_eq!(
            downcast("<paragraph>abcd</paragraph>", &[("comment:7".to_string(), range)]),
            r#"<p>a<comment name="7"></comment>bc<comment name="7"></comment>d</p>"#
        );
    }

    #[test]
    fn test_collapsed_marker_has_one_boundary() {
        let at = Position::new("main", vec![0, 2]);
        assert_eq!(
            downcast("<paragraph>abcd</paragraph>", &[("comment".to_string(), Range::collapsed(at))]),
            "<p>ab<comment></comment>cd</p>"
        );
    }
}
