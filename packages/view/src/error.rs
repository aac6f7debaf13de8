//! Error types for the view

use crate::node::ViewNodeId;
use thiserror::Error;

pub type ViewResult<T> = Result<T, ViewError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewError {
    #[error("Invalid view position {0:?}")]
    InvalidPosition(Vec<usize>),

    #[error("View node not found: {0}")]
    NodeNotFound(ViewNodeId),

    #[error("View range is not flat: {start:?} - {end:?}")]
    NotFlat { start: Vec<usize>, end: Vec<usize> },

    #[error("Markup error: {0}")]
    Markup(#[from] quire_markup::MarkupError),
}
