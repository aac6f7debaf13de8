//! # Quire View
//!
//! The view tree is the rendered-shape side of the editor: what HTML data
//! turns into when read, and what the model turns into when written.
//!
//! ```text
//! "<p>foo</p>" ──HtmlDataProcessor::to_view──► ViewDocumentFragment
//!                                                   │ upcast (quire-engine)
//!                                                   ▼
//!                                              model fragment
//!
//! model ──downcast (quire-engine)──► DowncastWriter ──► ViewDocumentFragment
//!                                                         │ to_data
//!                                                         ▼
//!                                                    "<p>foo</p>"
//! ```
//!
//! Nodes carry identities ([`ViewNodeId`]) so the mapper and the consumable
//! tracker can refer to them without borrowing the tree.

pub mod error;
pub mod node;
pub mod notation;
pub mod position;
pub mod processor;
pub mod writer;

pub use error::{ViewError, ViewResult};
pub use node::{ViewDocumentFragment, ViewElement, ViewElementKind, ViewNode, ViewNodeId, ViewText};
pub use position::{ViewParent, ViewPosition, ViewRange};
pub use processor::{DataProcessor, HtmlDataProcessor};
pub use writer::DowncastWriter;
