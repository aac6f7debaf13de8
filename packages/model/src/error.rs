//! Error types for the model

use crate::node::ElementId;
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Operation expects document version {actual} but the document is at version {expected}")]
    VersionMismatch { expected: u64, actual: u64 },

    #[error("Invalid position {path:?} in root '{root}'")]
    InvalidPosition { root: String, path: Vec<usize> },

    #[error("Root not found: {0}")]
    RootNotFound(String),

    #[error("No element at {0:?}")]
    NotAnElement(Vec<usize>),

    #[error("Range is not flat")]
    NotFlat,

    #[error("Marker not found: {0}")]
    MarkerNotFound(String),

    #[error("Element not found: {0}")]
    ElementNotFound(ElementId),

    #[error("Cannot move a range into itself")]
    MoveIntoItself,

    #[error("Notation error: {0}")]
    Notation(#[from] quire_markup::MarkupError),
}

impl ModelError {
    pub fn invalid_position(root: impl Into<String>, path: &[usize]) -> Self {
        Self::InvalidPosition {
            root: root.into(),
            path: path.to_vec(),
        }
    }
}
