//! Error types for conversion and the data pipeline

use quire_model::ModelError;
use quire_view::ViewError;
use thiserror::Error;

pub type ConversionResult<T> = Result<T, ConversionError>;
pub type EngineResult<T> = Result<T, EngineError>;

/// Failure inside a conversion pass; aborts the pass
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("No mapping for {0}")]
    UnmappedElement(String),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("View error: {0}")]
    View(#[from] ViewError),

    #[error("Claim on view item {0} is not held in this pass")]
    ClaimNotHeld(String),

    #[error("Converter for '{event}' failed: {message}")]
    Listener { event: String, message: String },
}

impl ConversionError {
    pub fn unmapped(what: impl std::fmt::Display) -> Self {
        Self::UnmappedElement(what.to_string())
    }

    pub fn listener(event: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Listener {
            event: event.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("View error: {0}")]
    View(#[from] ViewError),

    #[error("Root '{0}' already has content")]
    RootNotEmpty(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
