//! # Quire Model
//!
//! The abstract document tree and everything that changes it.
//!
//! ## Architecture
//!
//! ```text
//! Writer ──builds──▶ Operation ──apply_operation──▶ Document (roots, markers)
//!                        │                               │
//!                        ├── reversed()  ◀── UndoStack ──┤ history
//!                        └── transformed_by(other)       │ version
//! ```
//!
//! ## Core Principles
//!
//! 1. **Operations are the only mutation path**: every change is versioned,
//!    recorded in history and reversible
//! 2. **Closed operation set**: insert, remove, attribute, rename, marker and
//!    no-op, with exhaustive transformation between every pair
//! 3. **Offsets count characters**: an element is one offset, a text node one
//!    per character
//! 4. **Normalized text**: adjacent texts with equal attributes always merge

pub mod document;
pub mod error;
pub mod fragment;
pub mod markers;
pub mod node;
pub mod notation;
pub mod operation;
pub mod position;
pub mod range;
pub mod schema;
pub mod tree;
pub mod undo;
pub mod writer;

pub use document::{Document, MAIN_ROOT};
pub use error::{ModelError, ModelResult};
pub use fragment::{DocumentFragment, FragmentWriter};
pub use markers::{Marker, MarkerCollection};
pub use node::{Attributes, Element, ElementId, Node, Text};
pub use operation::{AttributePart, Operation, OperationKind};
pub use position::{Position, FRAGMENT_ROOT};
pub use range::{Range, TreeWalker, WalkerItem};
pub use schema::{Schema, SchemaItem};
pub use undo::UndoStack;
pub use writer::{Batch, Writer};
