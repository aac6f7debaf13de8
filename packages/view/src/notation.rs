//! String form of view trees, shared by the HTML data processor and tests.
//!
//! Attributes are written `class` first, then `style`, then the rest in key
//! order, so equal trees always print the same.

use crate::error::ViewResult;
use crate::node::{ViewDocumentFragment, ViewElement, ViewElementKind, ViewNode};
use quire_markup::{escape_text, parse_strict, write_start_tag, MarkupNode, VOID_ELEMENTS};

/// Parse view notation; mismatched tags are an error
pub fn parse(notation: &str) -> ViewResult<ViewDocumentFragment> {
    let markup = parse_strict(notation)?;
    Ok(ViewDocumentFragment::from_nodes(from_markup(&markup, true)))
}

/// Build view nodes from parsed markup.
///
/// With `keep_whitespace` off, whitespace-only text containing a line break
/// is dropped: it is source formatting, not content.
pub fn from_markup(markup: &[MarkupNode], keep_whitespace: bool) -> Vec<ViewNode> {
    markup
        .iter()
        .filter_map(|node| match node {
            MarkupNode::Text(data) => {
                if !keep_whitespace && data.contains('\n') && data.trim().is_empty() {
                    None
                } else {
                    Some(ViewNode::text(data.clone()))
                }
            }
            MarkupNode::Element {
                name,
                attributes,
                children,
            } => {
                let kind = if VOID_ELEMENTS.contains(&name.as_str()) {
                    ViewElementKind::Empty
                } else {
                    ViewElementKind::Container
                };
                let mut element = ViewElement::new(name.clone(), kind);
                for (key, value) in attributes {
                    element.set_attribute(key.clone(), value.clone());
                }
                element.children = from_markup(children, keep_whitespace);
                Some(ViewNode::Element(element))
            }
        })
        .collect()
}

pub fn stringify(nodes: &[ViewNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

pub fn stringify_fragment(fragment: &ViewDocumentFragment) -> String {
    stringify(fragment.children())
}

fn write_node(out: &mut String, node: &ViewNode) {
    match node {
        ViewNode::Text(text) => out.push_str(&escape_text(&text.data)),
        ViewNode::Element(element) => {
            let mut pairs: Vec<(String, String)> = Vec::with_capacity(element.attributes.len() + 2);
            if !element.classes.is_empty() {
                pairs.push(("class".to_string(), element.class_value()));
            }
            if !element.styles.is_empty() {
                pairs.push(("style".to_string(), element.style_value()));
            }
            pairs.extend(element.attributes.iter().map(|(k, v)| (k.clone(), v.clone())));

            write_start_tag(out, &element.name, pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())), false);
            if element.kind == ViewElementKind::Empty {
                return;
            }
            for child in &element.children {
                write_node(out, child);
            }
            out.push_str("</");
            out.push_str(&element.name);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let notation = r#"<p class="a b" style="color:red" data-x="1">foo<strong>bar</strong><br>baz</p>"#;
        let fragment = parse(notation).unwrap();

        assert_eq!(stringify_fragment(&fragment), notation);
    }

    #[test]
    fn test_attribute_order_is_normalized() {
        let fragment = parse(r#"<p id="x" style="b:1; a:2" class="z y">t</p>"#).unwrap();

        assert_eq!(
            stringify_fragment(&fragment),
            r#"<p class="y z" style="a:2;b:1" id="x">t</p>"#
        );
    }

    #[test]
    fn test_formatting_whitespace() {
        let markup = quire_markup::parse("<table>\n  <tr><td> </td></tr>\n</table>").unwrap();

        let kept = from_markup(&markup, true);
        let dropped = from_markup(&markup, false);

        assert_eq!(kept[0].as_element().map(ViewElement::child_count), Some(3));
        assert_eq!(stringify(&dropped), "<table><tr><td> </td></tr></table>");
    }

    #[test]
    fn test_mismatched_tags_fail() {
        assert!(parse("<p><b>x</p>").is_err());
    }
}
