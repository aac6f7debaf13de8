//! # Operations
//!
//! Every change to a document is an [`Operation`]: one atomic, serializable
//! edit that assumes a known document version.
//!
//! ## Contract
//!
//! - `execute` applies the change. The document checks `base_version` before
//!   calling it, operations never do.
//! - `reversed` returns the operation that undoes this one when applied right
//!   after it (valid at `base_version + 1`).
//! - `transformed_by` rewrites the operation so it can be applied after a
//!   concurrent one (valid at `other.base_version + 1`). See [`transform`].
//!
//! Moves are not a separate kind: the writer expresses them as a removal
//! followed by an insertion.

pub mod transform;

use crate::document::Document;
use crate::error::{ModelError, ModelResult};
use crate::markers::Marker;
use crate::node::{offset_size_of, Node};
use crate::position::Position;
use crate::range::Range;
use crate::tree;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use transform::transform_range;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub base_version: u64,
    pub kind: OperationKind,
}

/// One flat range of an attribute operation with its own previous value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributePart {
    pub range: Range,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OperationKind {
    /// Insert `nodes` at `position`
    Insert { position: Position, nodes: Vec<Node> },

    /// Remove content starting at `position`; `nodes` is the content removed
    Remove { position: Position, nodes: Vec<Node> },

    /// Change one attribute key over a set of flat ranges
    Attribute { key: String, parts: Vec<AttributePart> },

    /// Rename the element that starts at `position`
    Rename {
        position: Position,
        old_name: String,
        new_name: String,
    },

    /// Add (`old_range: None`), move, or remove (`new_range: None`) a marker
    Marker {
        name: String,
        old_range: Option<Range>,
        new_range: Option<Range>,
        affects_data: bool,
    },

    NoOp,
}

impl OperationKind {
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::Insert { .. } => "insert",
            OperationKind::Remove { .. } => "remove",
            OperationKind::Attribute { .. } => "attribute",
            OperationKind::Rename { .. } => "rename",
            OperationKind::Marker { .. } => "marker",
            OperationKind::NoOp => "noOp",
        }
    }

    /// Whether the operation changes tree structure (and thus live ranges)
    pub fn is_structural(&self) -> bool {
        matches!(self, OperationKind::Insert { .. } | OperationKind::Remove { .. })
    }
}

impl Operation {
    pub fn new(base_version: u64, kind: OperationKind) -> Self {
        Self { base_version, kind }
    }

    pub fn insert(base_version: u64, position: Position, nodes: Vec<Node>) -> Self {
        Self::new(base_version, OperationKind::Insert { position, nodes })
    }

    pub fn remove(base_version: u64, position: Position, nodes: Vec<Node>) -> Self {
        Self::new(base_version, OperationKind::Remove { position, nodes })
    }

    pub fn no_op(base_version: u64) -> Self {
        Self::new(base_version, OperationKind::NoOp)
    }

    pub fn is_no_op(&self) -> bool {
        matches!(self.kind, OperationKind::NoOp)
    }

    /// Offset size inserted or removed by a structural operation
    pub fn how_many(&self) -> usize {
        match &self.kind {
            OperationKind::Insert { nodes, .. } | OperationKind::Remove { nodes, .. } => offset_size_of(nodes),
            _ => 0,
        }
    }

    /// Apply the change to `document`
    pub fn execute(&self, document: &mut Document) -> ModelResult<()> {
        match &self.kind {
            OperationKind::Insert { position, nodes } => {
                let root = document.root_for_mut(&position.root)?;
                tree::insert_nodes(root, &position.path, nodes.clone())
            }
            OperationKind::Remove { position, nodes } => {
                let root = document.root_for_mut(&position.root)?;
                tree::remove_nodes(root, &position.path, offset_size_of(nodes)).map(|_| ())
            }
            OperationKind::Attribute { key, parts } => {
                for part in parts {
                    if !part.range.is_flat() {
                        return Err(ModelError::NotFlat);
                    }
                    let root = document.root_for_mut(part.range.root())?;
                    tree::set_attribute_range(
                        root,
                        part.range.start.parent_path(),
                        part.range.start.offset(),
                        part.range.end.offset(),
                        key,
                        part.new_value.as_ref(),
                    )?;
                }
                Ok(())
            }
            OperationKind::Rename { position, new_name, .. } => {
                let root = document.root_for_mut(&position.root)?;
                tree::rename_at(root, &position.path, new_name).map(|_| ())
            }
            OperationKind::Marker {
                name,
                new_range,
                affects_data,
                ..
            } => {
                match new_range {
                    Some(range) => {
                        document.markers_mut().set(Marker {
                            name: name.clone(),
                            range: range.clone(),
                            managed_using_operation: true,
                            affects_data: *affects_data,
                        });
                    }
                    None => {
                        document.markers_mut().remove(name);
                    }
                }
                Ok(())
            }
            OperationKind::NoOp => Ok(()),
        }
    }

    /// Operation that undoes this one, valid right after it was applied
    pub fn reversed(&self) -> Operation {
        let kind = match &self.kind {
            OperationKind::Insert { position, nodes } => OperationKind::Remove {
                position: position.clone(),
                nodes: nodes.clone(),
            },
            OperationKind::Remove { position, nodes } => OperationKind::Insert {
                position: position.clone(),
                nodes: nodes.clone(),
            },
            OperationKind::Attribute { key, parts } => OperationKind::Attribute {
                key: key.clone(),
                parts: parts
                    .iter()
                    .map(|part| AttributePart {
                        range: part.range.clone(),
                        old_value: part.new_value.clone(),
                        new_value: part.old_value.clone(),
                    })
                    .collect(),
            },
            OperationKind::Rename {
                position,
                old_name,
                new_name,
            } => OperationKind::Rename {
                position: position.clone(),
                old_name: new_name.clone(),
                new_name: old_name.clone(),
            },
            OperationKind::Marker {
                name,
                old_range,
                new_range,
                affects_data,
            } => OperationKind::Marker {
                name: name.clone(),
                old_range: new_range.clone(),
                new_range: old_range.clone(),
                affects_data: *affects_data,
            },
            OperationKind::NoOp => OperationKind::NoOp,
        };

        Operation {
            base_version: self.base_version + 1,
            kind,
        }
    }
}
