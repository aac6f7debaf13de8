//! Conversions every editor needs: paragraphs, headings, soft breaks, basic
//! text styles and block alignment.

use crate::controller::DataController;
use crate::{downcast, upcast};
use quire_model::SchemaItem;
use serde_json::json;

/// Model heading name and its view element
const HEADINGS: &[(&str, &str)] = &[("heading1", "h2"), ("heading2", "h3"), ("heading3", "h4")];

/// Model text attribute, the view element it renders as, and view elements
/// read as that attribute
const TEXT_STYLES: &[(&str, &str, &[&str])] = &[
    ("bold", "strong", &["strong", "b"]),
    ("italic", "em", &["em", "i"]),
    ("underline", "u", &["u"]),
];

pub fn register_basics(controller: &mut DataController) {
    let schema = &mut controller.schema;
    for (model, _) in HEADINGS {
        schema.register(*model, SchemaItem::default().allow_where("$block").allow_content_of("$block").block());
    }
    schema.register("softBreak", SchemaItem::default().allow_where("$text"));
    for (key, _, _) in TEXT_STYLES {
        schema.extend("$text", |item| item.allow_attributes.push(key.to_string()));
    }
    schema.extend("$block", |item| item.allow_attributes.push("alignment".to_string()));

    let up = &mut controller.upcast;
    upcast::helpers::element_to_element(up, "p", "paragraph");
    upcast::helpers::element_to_element(up, "br", "softBreak");
    for (model, view) in HEADINGS {
        upcast::helpers::element_to_element(up, view, model);
    }
    for (key, _, views) in TEXT_STYLES {
        for view in *views {
            upcast::helpers::element_to_attribute(up, view, key, json!(true));
        }
    }
    upcast::helpers::style_to_attribute(up, "text-align", "alignment");

    let down = &mut controller.downcast;
    downcast::helpers::element_to_element(down, "paragraph", "p");
    downcast::helpers::element_to_empty_element(down, "softBreak", "br");
    for (model, view) in HEADINGS {
        downcast::helpers::element_to_element(down, model, view);
    }
    for (key, view, _) in TEXT_STYLES {
        downcast::helpers::attribute_to_element(down, key, view);
    }
    downcast::helpers::attribute_to_style(down, "alignment", "text-align");
}
