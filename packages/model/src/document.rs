//! # Model document
//!
//! Owns the root elements, the markers, the version counter and the history
//! of applied operations.
//!
//! ## Versioning
//!
//! The version starts at 0 and grows by one with every applied operation, so
//! `history[v]` is always the operation applied at version `v`. An operation
//! is only accepted when its `base_version` equals the current version.

use crate::error::{ModelError, ModelResult};
use crate::markers::MarkerCollection;
use crate::node::Element;
use crate::operation::{transform_range, Operation};
use crate::writer::{Batch, Writer};
use std::collections::BTreeMap;
use tracing::debug;

/// Name of the root created by [`Document::new`]
pub const MAIN_ROOT: &str = "main";

#[derive(Debug, Clone)]
pub struct Document {
    roots: BTreeMap<String, Element>,
    markers: MarkerCollection,
    version: u64,
    history: Vec<Operation>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Document with a single empty `main` root
    pub fn new() -> Self {
        let mut document = Self::empty();
        document.create_root(MAIN_ROOT);
        document
    }

    /// Document without roots
    pub fn empty() -> Self {
        Self {
            roots: BTreeMap::new(),
            markers: MarkerCollection::new(),
            version: 0,
            history: Vec::new(),
        }
    }

    /// Add an empty root; an existing root of that name is kept
    pub fn create_root(&mut self, name: impl Into<String>) -> &Element {
        self.roots
            .entry(name.into())
            .or_insert_with(|| Element::new("$root"))
    }

    pub fn root(&self, name: &str) -> Option<&Element> {
        self.roots.get(name)
    }

    pub fn main_root(&self) -> Option<&Element> {
        self.root(MAIN_ROOT)
    }

    pub fn root_names(&self) -> impl Iterator<Item = &str> {
        self.roots.keys().map(String::as_str)
    }

    pub(crate) fn root_for_mut(&mut self, name: &str) -> ModelResult<&mut Element> {
        self.roots
            .get_mut(name)
            .ok_or_else(|| ModelError::RootNotFound(name.to_string()))
    }

    pub fn root_for(&self, name: &str) -> ModelResult<&Element> {
        self.roots
            .get(name)
            .ok_or_else(|| ModelError::RootNotFound(name.to_string()))
    }

    pub fn markers(&self) -> &MarkerCollection {
        &self.markers
    }

    pub(crate) fn markers_mut(&mut self) -> &mut MarkerCollection {
        &mut self.markers
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn history(&self) -> &[Operation] {
        &self.history
    }

    /// Operations applied at or after `version`
    pub fn operations_since(&self, version: u64) -> &[Operation] {
        let start = (version as usize).min(self.history.len());
        &self.history[start..]
    }

    /// Apply one operation, checking its base version first
    pub fn apply_operation(&mut self, operation: Operation) -> ModelResult<()> {
        if operation.base_version != self.version {
            return Err(ModelError::VersionMismatch {
                expected: self.version,
                actual: operation.base_version,
            });
        }

        operation.execute(self)?;

        if operation.kind.is_structural() {
            let kind = &operation.kind;
            self.markers.update_ranges(|range| transform_range(range, kind));
        }

        debug!(
            operation = operation.kind.name(),
            version = self.version,
            "applied operation"
        );

        self.version += 1;
        self.history.push(operation);
        Ok(())
    }

    /// Group changes made through a [`Writer`] into one batch.
    ///
    /// Operations applied before an error stay applied; the error is returned
    /// and the partial batch is dropped.
    pub fn change<F, R>(&mut self, f: F) -> ModelResult<Batch>
    where
        F: FnOnce(&mut Writer<'_>) -> ModelResult<R>,
    {
        let mut writer = Writer::new(self);
        f(&mut writer)?;
        Ok(writer.into_batch())
    }
}
