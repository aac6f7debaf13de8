//! # Data controller
//!
//! The data pipeline of an editor:
//!
//! ```text
//! data ──processor──► view ──upcast──► model fragment ──insert──► document
//! document root ──downcast──► view ──processor──► data
//! ```

use crate::config::{DataConfig, TrimMode};
use crate::downcast::DowncastDispatcher;
use crate::error::{EngineError, EngineResult};
use crate::options::ConversionOptions;
use crate::upcast::UpcastDispatcher;
use quire_model::{Batch, Document, DocumentFragment, Element, Marker, Position, Range, Schema, WalkerItem};
use quire_view::{DataProcessor, HtmlDataProcessor, ViewDocumentFragment};
use tracing::{debug, info};

pub struct DataController {
    pub schema: Schema,
    pub upcast: UpcastDispatcher,
    pub downcast: DowncastDispatcher,
    processor: Box<dyn DataProcessor>,
    config: DataConfig,
}

impl std::fmt::Debug for DataController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataController")
            .field("upcast", &self.upcast)
            .field("downcast", &self.downcast)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for DataController {
    fn default() -> Self {
        Self::new(Schema::new())
    }
}

impl DataController {
    /// Controller reading and writing HTML
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            upcast: UpcastDispatcher::new(),
            downcast: DowncastDispatcher::new(),
            processor: Box::new(HtmlDataProcessor::new()),
            config: DataConfig::default(),
        }
    }

    pub fn with_processor(mut self, processor: impl DataProcessor + 'static) -> Self {
        self.processor = Box::new(processor);
        self
    }

    pub fn with_config(mut self, config: DataConfig) -> Self {
        self.config = config;
        self
    }

    pub fn processor(&self) -> &dyn DataProcessor {
        self.processor.as_ref()
    }

    /// Data to a model fragment
    pub fn parse(&self, data: &str, options: &ConversionOptions) -> EngineResult<DocumentFragment> {
        let view = self.processor.to_view(data)?;
        self.to_model(&view, options)
    }

    pub fn to_model(&self, view: &ViewDocumentFragment, options: &ConversionOptions) -> EngineResult<DocumentFragment> {
        Ok(self.upcast.convert(view, &self.schema, options)?)
    }

    /// Downcast a root element with the markers that fall into it
    pub fn to_view(
        &self,
        root: &Element,
        root_name: &str,
        markers: &[(String, Range)],
        options: &ConversionOptions,
    ) -> EngineResult<ViewDocumentFragment> {
        Ok(self.downcast.convert(root, root_name, markers, options)?.fragment)
    }

    /// Model fragment to data, its markers included
    pub fn stringify(&self, fragment: &DocumentFragment, options: &ConversionOptions) -> EngineResult<String> {
        let markers: Vec<(String, Range)> = fragment
            .markers
            .iter()
            .map(|(name, range)| (name.clone(), range.clone()))
            .collect();
        let view = self.to_view(&fragment.root, quire_model::FRAGMENT_ROOT, &markers, options)?;
        Ok(self.processor.to_data(&view))
    }

    /// Data of one root
    pub fn get(&self, document: &Document, root_name: &str, options: &ConversionOptions) -> EngineResult<String> {
        let root = document.root_for(root_name)?;
        if self.config.trim == TrimMode::Empty && !has_content(root, &self.schema) {
            debug!(root = root_name, "root has no content");
            return Ok(String::new());
        }

        let range = root_range(root, root_name);
        let markers = markers_relative_to(&range, document.markers().iter().filter(|marker| marker.affects_data));
        let view = self.to_view(root, root_name, &markers, options)?;
        Ok(self.processor.to_data(&view))
    }

    /// Replace the content of a root and its data markers with `data`
    pub fn set(
        &self,
        document: &mut Document,
        root_name: &str,
        data: &str,
        options: &ConversionOptions,
    ) -> EngineResult<Batch> {
        let fragment = self.parse(data, options)?;
        info!(root = root_name, nodes = fragment.children().len(), "setting data");

        let batch = document.change(|writer| {
            let root = writer.document().root_for(root_name)?;
            let range = root_range(root, root_name);
            let stale: Vec<String> = writer
                .document()
                .markers()
                .iter()
                .filter(|marker| marker.range.root() == root_name)
                .map(|marker| marker.name.clone())
                .collect();

            for name in stale {
                writer.remove_marker(&name)?;
            }
            if !range.is_collapsed() {
                writer.remove(&range)?;
            }
            writer.insert_fragment(fragment, &Position::at_root(root_name, 0))
        })?;
        Ok(batch.with_description("set data"))
    }

    /// Load initial data into an empty root
    pub fn init(
        &self,
        document: &mut Document,
        root_name: &str,
        data: &str,
        options: &ConversionOptions,
    ) -> EngineResult<Batch> {
        if !document.root_for(root_name)?.is_empty() {
            return Err(EngineError::RootNotEmpty(root_name.to_string()));
        }
        self.set(document, root_name, data, options)
    }
}

fn root_range(root: &Element, root_name: &str) -> Range {
    Range::new(
        Position::at_root(root_name, 0),
        Position::at_root(root_name, root.max_offset()),
    )
}

/// Whether a root holds non-whitespace text or an object
pub fn has_content(root: &Element, schema: &Schema) -> bool {
    let range = Range::new(
        Position::at_root("$content", 0),
        Position::at_root("$content", root.max_offset()),
    );
    range.items(root).any(|item| match item {
        WalkerItem::Text { text, .. } => !text.data.trim().is_empty(),
        WalkerItem::ElementStart { element, .. } => schema.is_object(&element.name),
        WalkerItem::ElementEnd { .. } => false,
    })
}

/// Markers as seen from inside `range`: collapsed markers on or between its
/// boundaries are kept, others are cut to the part inside.
pub fn markers_relative_to<'a>(range: &Range, markers: impl Iterator<Item = &'a Marker>) -> Vec<(String, Range)> {
    markers
        .filter(|marker| marker.range.root() == range.root())
        .filter_map(|marker| {
            if marker.range.is_collapsed() {
                let at = &marker.range.start;
                let inside = !at.is_before(&range.start) && !at.is_after(&range.end);
                return inside.then(|| (marker.name.clone(), marker.range.clone()));
            }
            marker
                .range
                .intersection(range)
                .map(|intersection| (marker.name.clone(), intersection))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(name: &str, start: &[usize], end: &[usize]) -> Marker {
        Marker {
            name: name.to_string(),
            range: Range::new(
                Position::new("main", start.to_vec()),
                Position::new("main", end.to_vec()),
            ),
            managed_using_operation: true,
            affects_data: true,
        }
    }

    #[test]
    fn test_markers_relative_to_element() {
        let inside = Range::new(Position::new("main", vec![1, 0]), Position::new("main", vec![1, 4]));
        let markers = [
            marker("start", &[1, 0], &[1, 0]),
            marker("end", &[1, 4], &[1, 4]),
            marker("before", &[0, 2], &[0, 2]),
            marker("across", &[0, 1], &[1, 2]),
            marker("outside", &[2, 0], &[2, 1]),
        ];

        let relative = markers_relative_to(&inside, markers.iter());
        let names: Vec<&str> = relative.iter().map(|(name, _)| name.as_str()).collect();

        assert_eq!(names, vec!["start", "end", "across"]);
        assert_eq!(relative[2].1, Range::new(Position::new("main", vec![1, 0]), Position::new("main", vec![1, 2])));
    }

    #[test]
    fn test_has_content() {
        let schema = {
            let mut schema = Schema::new();
            schema.register("image", quire_model::SchemaItem::default().allow_where("$block").object());
            schema
        };
        let blank = Element::new("$root").with_child(Element::new("paragraph").with_child(quire_model::Node::text("  ")));
        let image = Element::new("$root").with_child(Element::new("image"));

        assert!(!has_content(&blank, &schema));
        assert!(has_content(&image, &schema));
    }
}
