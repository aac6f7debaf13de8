//! Ready-made upcast converters for the common shapes.

use super::{UpcastDispatcher, MARKER_NAME_ATTRIBUTE};
use crate::consumable::Match;
use crate::registry::Priority;
use quire_model::{Attributes, Range};
use quire_view::ViewNode;
use serde_json::Value;

/// `<view_name>` becomes `<model_name>` with the children converted inside
pub fn element_to_element(dispatcher: &mut UpcastDispatcher, view_name: &str, model_name: &str) {
    let model_name = model_name.to_string();
    dispatcher.on(format!("element:{view_name}"), Priority::Normal, move |_info, data, api| {
        let item = data.view_item;
        let ViewNode::Element(view_element) = item else {
            return Ok(());
        };
        let Some(claim) = api.consumable.consume(item, &Match::name()) else {
            return Ok(());
        };

        let element = api.writer().create_element(model_name.clone(), Attributes::new());
        let id = element.id;
        if api.safe_insert(&claim, element, &data.model_cursor)?.is_none() {
            api.consumable.revert(claim);
            return Ok(());
        }

        let inside = api
            .writer()
            .fragment()
            .position_in(id, 0)
            .ok_or(quire_model::ModelError::ElementNotFound(id))?;
        api.convert_children(view_element, &inside)?;
        api.update_conversion_result(claim, id, data)
    });
}

/// `<view_name>` becomes the attribute `key=value` on the content it wraps.
///
/// Runs at low priority so that elements converting into model elements win.
pub fn element_to_attribute(dispatcher: &mut UpcastDispatcher, view_name: &str, key: &str, value: Value) {
    let key = key.to_string();
    dispatcher.on(format!("element:{view_name}"), Priority::Low, move |_info, data, api| {
        if data.model_range.is_some() {
            return Ok(());
        }
        let item = data.view_item;
        let ViewNode::Element(view_element) = item else {
            return Ok(());
        };
        let Some(claim) = api.consumable.consume(item, &Match::name()) else {
            return Ok(());
        };

        let result = api.convert_children(view_element, &data.model_cursor)?;
        let range = result.model_range.unwrap_or_else(|| Range::collapsed(data.model_cursor.clone()));
        api.set_attributes_on(&claim, &range, &key, &value, false)?;
        data.model_range = Some(range);
        data.model_cursor = result.model_cursor;
        Ok(())
    });
}

/// The `style_key` style of an already converted element becomes `key` on
/// the model element, with the style value as attribute value.
pub fn style_to_attribute(dispatcher: &mut UpcastDispatcher, style_key: &str, key: &str) {
    let style_key = style_key.to_string();
    let key = key.to_string();
    dispatcher.on("element", Priority::Low, move |_info, data, api| {
        let Some(range) = data.model_range.clone() else {
            return Ok(());
        };
        let item = data.view_item;
        let Some(value) = item.as_element().and_then(|element| element.style(&style_key)) else {
            return Ok(());
        };
        let value = Value::String(value.to_string());
        let Some(claim) = api.consumable.consume(item, &Match::new().with_style(style_key.clone())) else {
            return Ok(());
        };
        if !api.set_attributes_on(&claim, &range, &key, &value, true)? {
            api.consumable.revert(claim);
        }
        Ok(())
    });
}

/// `<view_name name="x">` becomes a boundary of the marker `group:x` (or
/// `group` without a name). The boundaries are collected into fragment
/// markers after the pass.
pub fn element_to_marker(dispatcher: &mut UpcastDispatcher, view_name: &str, group: &str) {
    let group = group.to_string();
    dispatcher.on(format!("element:{view_name}"), Priority::Normal, move |_info, data, api| {
        let item = data.view_item;
        let Some(view_element) = item.as_element() else {
            return Ok(());
        };
        let name = match view_element.attribute("name") {
            Some(suffix) => format!("{group}:{suffix}"),
            None => group.clone(),
        };
        let descriptor = if view_element.attributes.contains_key("name") {
            Match::name().with_attribute("name")
        } else {
            Match::name()
        };
        let Some(claim) = api.consumable.consume(item, &descriptor) else {
            return Ok(());
        };

        let mut attributes = Attributes::new();
        attributes.insert(MARKER_NAME_ATTRIBUTE.to_string(), Value::String(name));
        let marker = api.writer().create_element("$marker", attributes);
        let id = marker.id;
        if api.safe_insert(&claim, marker, &data.model_cursor)?.is_none() {
            api.consumable.revert(claim);
            return Ok(());
        }
        api.update_conversion_result(claim, id, data)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ConversionOptions;
    use quire_model::{notation, Schema};
    use quire_view::notation::parse;
    use serde_json::json;

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema.extend("$text", |item| item.allow_attributes.push("bold".to_string()));
        schema.extend("$block", |item| item.allow_attributes.push("alignment".to_string()));
        schema
    }

    fn dispatcher() -> UpcastDispatcher {
        let mut dispatcher = UpcastDispatcher::new();
        element_to_element(&mut dispatcher, "p", "paragraph");
        element_to_attribute(&mut dispatcher, "strong", "bold", json!(true));
        style_to_attribute(&mut dispatcher, "text-align", "alignment");
        dispatcher
    }

    fn upcast(view: &str) -> String {
        let fragment = dispatcher()
            .convert(&parse(view).unwrap(), &schema(), &ConversionOptions::new())
            .unwrap();
        notation::stringify(fragment.children())
    }

    #[test]
    fn test_element_to_attribute() {
        assert_eq!(
            upcast("<p>foo<strong>bar</strong></p>"),
            r#"<paragraph>foo<$text bold="true">bar</$text></paragraph>"#
        );
    }

    #[test]
    fn test_attribute_outside_allowed_parent() {
        assert_eq!(
            upcast("<strong>foo</strong>bar"),
            r#"<paragraph><$text bold="true">foo</$text>bar</paragraph>"#
        );
    }

    #[test]
    fn test_style_to_attribute() {
        assert_eq!(
            upcast(r#"<p style="text-align:center">foo</p>"#),
            r#"<paragraph alignment="center">foo</paragraph>"#
        );
    }

    #[test]
    fn test_style_on_unconverted_element_is_ignored() {
        assert_eq!(upcast(r#"<span style="text-align:center">foo</span>"#), "<paragraph>foo</paragraph>");
    }
}
