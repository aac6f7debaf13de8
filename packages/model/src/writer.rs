//! # Model writer
//!
//! The only public way to change a [`Document`]. Each call builds operations
//! at the current document version, applies them and records them in the
//! [`Batch`] the writer hands back when the change block ends.
//!
//! ```rust,ignore
//! let batch = document.change(|writer| {
//!     let paragraph = writer.insert_element(Element::new("paragraph"), &Position::at_root("main", 0))?;
//!     writer.insert_text("foo", Attributes::new(), &Position::new("main", vec![0, 0]))?;
//!     Ok(())
//! })?;
//! ```

use crate::document::Document;
use crate::error::{ModelError, ModelResult};
use crate::fragment::DocumentFragment;
use crate::markers::Marker;
use crate::node::{Attributes, Element, ElementId, Node, Text};
use crate::operation::{AttributePart, Operation, OperationKind};
use crate::position::Position;
use crate::range::Range;
use crate::tree;
use serde_json::Value;

/// Operations produced by one change block, undone and redone together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub operations: Vec<Operation>,
    pub description: Option<String>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Version the batch started at, if it holds anything
    pub fn base_version(&self) -> Option<u64> {
        self.operations.first().map(|op| op.base_version)
    }
}

pub struct Writer<'a> {
    document: &'a mut Document,
    batch: Batch,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(document: &'a mut Document) -> Self {
        Self {
            document,
            batch: Batch::new(),
        }
    }

    pub fn document(&self) -> &Document {
        self.document
    }

    pub fn into_batch(self) -> Batch {
        self.batch
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.batch.description = Some(description.into());
    }

    /// Apply `kind` at the current version and record it
    pub fn apply(&mut self, kind: OperationKind) -> ModelResult<()> {
        let operation = Operation::new(self.document.version(), kind);
        self.document.apply_operation(operation.clone())?;
        self.batch.operations.push(operation);
        Ok(())
    }

    pub fn insert(&mut self, nodes: Vec<Node>, position: &Position) -> ModelResult<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        self.apply(OperationKind::Insert {
            position: position.clone(),
            nodes,
        })
    }

    pub fn insert_element(&mut self, element: Element, position: &Position) -> ModelResult<ElementId> {
        let id = element.id;
        self.insert(vec![Node::Element(element)], position)?;
        Ok(id)
    }

    pub fn insert_text(&mut self, data: impl Into<String>, attributes: Attributes, position: &Position) -> ModelResult<()> {
        let text = Text {
            data: data.into(),
            attributes,
        };
        if text.is_empty() {
            return Ok(());
        }
        self.insert(vec![Node::Text(text)], position)
    }

    /// Insert the content of a fragment together with its markers
    pub fn insert_fragment(&mut self, fragment: DocumentFragment, position: &Position) -> ModelResult<()> {
        let DocumentFragment { root, markers } = fragment;
        self.insert(root.children, position)?;

        for (name, range) in markers {
            let range = Range::new(
                translate_from_fragment(&range.start, position),
                translate_from_fragment(&range.end, position),
            );
            self.add_marker(name, range, true, true)?;
        }
        Ok(())
    }

    /// Remove everything the range covers, at every level
    pub fn remove(&mut self, range: &Range) -> ModelResult<()> {
        let root = self.document.root_for(range.root())?;
        let flat_ranges = range.minimal_flat_ranges(root)?;

        // Last first, so earlier ranges stay valid
        for flat in flat_ranges.iter().rev() {
            let root = self.document.root_for(flat.root())?;
            let parent = flat.start.parent(root)?;
            let nodes = tree::slice_nodes(parent, flat.start.offset(), flat.end.offset());
            self.apply(OperationKind::Remove {
                position: flat.start.clone(),
                nodes,
            })?;
        }
        Ok(())
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value, range: &Range) -> ModelResult<()> {
        self.change_attribute(key.into(), Some(value), range)
    }

    pub fn remove_attribute(&mut self, key: impl Into<String>, range: &Range) -> ModelResult<()> {
        self.change_attribute(key.into(), None, range)
    }

    /// Set an attribute on the element that starts at `position`
    pub fn set_element_attribute(&mut self, key: impl Into<String>, value: Value, position: &Position) -> ModelResult<()> {
        self.set_attribute(key, value, &Range::with_length(position.clone(), 1))
    }

    fn change_attribute(&mut self, key: String, value: Option<Value>, range: &Range) -> ModelResult<()> {
        let root = self.document.root_for(range.root())?;
        let mut parts: Vec<AttributePart> = Vec::new();

        for flat in range.minimal_flat_ranges(root)? {
            let parent = flat.start.parent(root)?;
            let (from, to) = (flat.start.offset(), flat.end.offset());
            let mut offset = 0;
            let mut run: Option<AttributePart> = None;

            for child in &parent.children {
                let child_end = offset + child.offset_size();
                let start = offset.max(from);
                let end = child_end.min(to);
                offset = child_end;
                if start >= end {
                    continue;
                }

                let old_value = child.attributes().get(&key).cloned();
                match &mut run {
                    Some(current) if current.old_value == old_value && current.range.end.offset() == start => {
                        current.range.end = current.range.end.with_offset(end);
                    }
                    _ => {
                        if let Some(done) = run.take() {
                            parts.push(done);
                        }
                        run = Some(AttributePart {
                            range: Range::new(flat.start.with_offset(start), flat.start.with_offset(end)),
                            old_value,
                            new_value: value.clone(),
                        });
                    }
                }
            }
            parts.extend(run);
        }

        parts.retain(|part| part.old_value != part.new_value);
        if parts.is_empty() {
            return Ok(());
        }
        self.apply(OperationKind::Attribute { key, parts })
    }

    pub fn rename(&mut self, position: &Position, new_name: impl Into<String>) -> ModelResult<()> {
        let root = self.document.root_for(&position.root)?;
        let old_name = match position.node_after(root) {
            Some(Node::Element(element)) => element.name.clone(),
            _ => return Err(ModelError::NotAnElement(position.path.clone())),
        };
        let new_name = new_name.into();
        if old_name == new_name {
            return Ok(());
        }
        self.apply(OperationKind::Rename {
            position: position.clone(),
            old_name,
            new_name,
        })
    }

    /// Move the content of a flat range to `target`: a removal followed by an
    /// insertion at the target as it is after the removal.
    pub fn move_range(&mut self, range: &Range, target: &Position) -> ModelResult<()> {
        if !range.is_flat() {
            return Err(ModelError::NotFlat);
        }
        let how_many = range.flat_len();
        let target = target
            .transformed_by_deletion(&range.start, how_many)
            .ok_or(ModelError::MoveIntoItself)?;

        let root = self.document.root_for(range.root())?;
        let parent = range.start.parent(root)?;
        let nodes = tree::slice_nodes(parent, range.start.offset(), range.end.offset());

        self.apply(OperationKind::Remove {
            position: range.start.clone(),
            nodes: nodes.clone(),
        })?;
        self.insert(nodes, &target)
    }

    /// Add a marker, or move it when it already exists
    pub fn add_marker(
        &mut self,
        name: impl Into<String>,
        range: Range,
        using_operation: bool,
        affects_data: bool,
    ) -> ModelResult<()> {
        let name = name.into();
        if using_operation {
            let old_range = self.document.markers().get(&name).map(|marker| marker.range.clone());
            return self.apply(OperationKind::Marker {
                name,
                old_range,
                new_range: Some(range),
                affects_data,
            });
        }

        self.document.markers_mut().set(Marker {
            name,
            range,
            managed_using_operation: false,
            affects_data,
        });
        Ok(())
    }

    pub fn update_marker(&mut self, name: &str, range: Range) -> ModelResult<()> {
        let marker = self
            .document
            .markers()
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::MarkerNotFound(name.to_string()))?;
        self.add_marker(name, range, marker.managed_using_operation, marker.affects_data)
    }

    pub fn remove_marker(&mut self, name: &str) -> ModelResult<()> {
        let marker = self
            .document
            .markers()
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::MarkerNotFound(name.to_string()))?;

        if marker.managed_using_operation {
            return self.apply(OperationKind::Marker {
                name: name.to_string(),
                old_range: Some(marker.range),
                new_range: None,
                affects_data: marker.affects_data,
            });
        }

        self.document.markers_mut().remove(name);
        Ok(())
    }
}

/// Map a fragment position onto the document position the fragment
/// content was inserted at.
fn translate_from_fragment(position: &Position, insertion: &Position) -> Position {
    let mut path = insertion.parent_path().to_vec();
    let mut relative = position.path.clone();
    relative[0] += insertion.offset();
    path.extend(relative);
    Position::new(insertion.root.clone(), path)
}
