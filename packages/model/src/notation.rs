//! String notation for model trees.
//!
//! ```text
//! <paragraph>foo<$text bold="true">bar</$text></paragraph>
//! ```
//!
//! Attribute values are read as JSON when they parse as a non-string JSON
//! value (`true`, `2`, `{"a":1}`) and as plain strings otherwise.

use crate::error::ModelResult;
use crate::node::{Attributes, Element, Node, Text};
use crate::tree;
use quire_markup::{escape_text, parse_strict, write_start_tag, MarkupNode};
use serde_json::Value;

/// Render nodes in model notation
pub fn stringify(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

/// Render the children of an element (typically a root)
pub fn stringify_children(element: &Element) -> String {
    stringify(&element.children)
}

fn attribute_pairs(attributes: &Attributes) -> Vec<(String, String)> {
    attributes
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            (key.clone(), rendered)
        })
        .collect()
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Text(text) if text.attributes.is_empty() => out.push_str(&escape_text(&text.data)),
        Node::Text(text) => {
            let pairs = attribute_pairs(&text.attributes);
            write_start_tag(out, "$text", pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())), false);
            out.push_str(&escape_text(&text.data));
            out.push_str("</$text>");
        }
        Node::Element(element) => {
            let pairs = attribute_pairs(&element.attributes);
            write_start_tag(out, &element.name, pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())), false);
            for child in &element.children {
                write_node(out, child);
            }
            out.push_str("</");
            out.push_str(&element.name);
            out.push('>');
        }
    }
}

/// Read an attribute value written in notation
pub fn parse_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(_)) | Err(_) => Value::String(raw.to_string()),
        Ok(value) => value,
    }
}

/// Build model nodes from notation
pub fn parse(notation: &str) -> ModelResult<Vec<Node>> {
    let markup = parse_strict(notation)?;
    let mut holder = Element::new("$root").with_children(markup.iter().map(to_node));
    tree::normalize_deep(&mut holder);
    Ok(holder.children)
}

fn to_attributes(pairs: &[(String, String)]) -> Attributes {
    pairs
        .iter()
        .map(|(key, raw)| (key.clone(), parse_value(raw)))
        .collect()
}

fn to_node(markup: &MarkupNode) -> Node {
    match markup {
        MarkupNode::Text(data) => Node::Text(Text::new(data.clone())),
        MarkupNode::Element {
            name,
            attributes,
            children,
        } if name == "$text" => {
            let data: String = children
                .iter()
                .filter_map(|child| match child {
                    MarkupNode::Text(data) => Some(data.as_str()),
                    MarkupNode::Element { .. } => None,
                })
                .collect();
            Node::Text(Text {
                data,
                attributes: to_attributes(attributes),
            })
        }
        MarkupNode::Element {
            name,
            attributes,
            children,
        } => {
            let mut element = Element::new(name.clone()).with_children(children.iter().map(to_node));
            element.attributes = to_attributes(attributes);
            Node::Element(element)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let notation = r#"<paragraph>foo<$text bold="true">bar</$text></paragraph><table headingRows="1"><tableRow></tableRow></table>"#;
        let nodes = parse(notation).unwrap();

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].attributes().get("headingRows"), Some(&Value::from(1)));
        assert_eq!(stringify(&nodes), notation);
    }

    #[test]
    fn test_adjacent_texts_merge() {
        let nodes = parse("<paragraph>a<$text>b</$text></paragraph>").unwrap();
        let paragraph = nodes[0].as_element().unwrap();

        assert_eq!(paragraph.children, vec![Node::text("ab")]);
    }

    #[test]
    fn test_values() {
        assert_eq!(parse_value("true"), Value::Bool(true));
        assert_eq!(parse_value("center"), Value::String("center".to_string()));
        assert_eq!(parse_value("\"2\""), Value::String("\"2\"".to_string()));
    }
}
