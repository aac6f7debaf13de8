//! Data processors turn raw data into view fragments and back.

use crate::error::ViewResult;
use crate::node::ViewDocumentFragment;
use crate::notation::{from_markup, stringify_fragment};
use tracing::debug;

/// Conversion between a data format and the view
pub trait DataProcessor {
    fn to_view(&self, data: &str) -> ViewResult<ViewDocumentFragment>;

    fn to_data(&self, fragment: &ViewDocumentFragment) -> String;
}

/// HTML in, HTML out.
///
/// Reading forgives what browsers forgive (stray closing tags, unclosed
/// elements) and drops formatting whitespace between tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlDataProcessor;

impl HtmlDataProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl DataProcessor for HtmlDataProcessor {
    fn to_view(&self, data: &str) -> ViewResult<ViewDocumentFragment> {
        let markup = quire_markup::parse(data)?;
        let fragment = ViewDocumentFragment::from_nodes(from_markup(&markup, false));
        debug!(bytes = data.len(), nodes = fragment.children().len(), "html to view");
        Ok(fragment)
    }

    fn to_data(&self, fragment: &ViewDocumentFragment) -> String {
        stringify_fragment(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forgiving_input() {
        let processor = HtmlDataProcessor::new();
        let fragment = processor.to_view("<p>foo<b>bar</p></i><p>baz").unwrap();

        assert_eq!(processor.to_data(&fragment), "<p>foo<b>bar</b></p><p>baz</p>");
    }

    #[test]
    fn test_entities_round_trip() {
        let processor = HtmlDataProcessor::new();
        let fragment = processor.to_view("<p>a &amp; b &lt;c&gt;</p>").unwrap();

        assert_eq!(fragment.children()[0].as_element().map(|p| p.text_content()), Some("a & b <c>".to_string()));
        assert_eq!(processor.to_data(&fragment), "<p>a &amp; b &lt;c&gt;</p>");
    }
}
