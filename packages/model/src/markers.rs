//! Markers: named ranges that live next to the tree rather than in it.

use crate::range::Range;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub name: String,
    pub range: Range,
    /// Changed only through marker operations, so it takes part in history
    pub managed_using_operation: bool,
    /// Whether the marker is part of the document data (downcast on `get`)
    pub affects_data: bool,
}

impl Marker {
    /// Name group before the first `:` (`comment` for `comment:1`)
    pub fn group(&self) -> &str {
        self.name.split(':').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerCollection {
    markers: BTreeMap<String, Marker>,
}

impl MarkerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a marker, returning the previous one
    pub fn set(&mut self, marker: Marker) -> Option<Marker> {
        self.markers.insert(marker.name.clone(), marker)
    }

    pub fn get(&self, name: &str) -> Option<&Marker> {
        self.markers.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.markers.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Marker> {
        self.markers.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Markers named `prefix` or `prefix:*`
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a Marker> + 'a {
        self.markers.values().filter(move |marker| {
            marker.name == prefix
                || marker
                    .name
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with(':'))
        })
    }

    /// Markers whose range overlaps `range` or, when collapsed, lies inside it
    pub fn intersecting<'a>(&'a self, range: &'a Range) -> impl Iterator<Item = &'a Marker> + 'a {
        self.markers.values().filter(move |marker| {
            if marker.range.is_collapsed() {
                range.contains_range(&marker.range, true)
            } else {
                marker.range.intersection(range).is_some()
            }
        })
    }

    /// Replace every marker range, used when the tree changes under them
    pub fn update_ranges(&mut self, mut transform: impl FnMut(&Range) -> Range) {
        for marker in self.markers.values_mut() {
            marker.range = transform(&marker.range);
        }
    }
}
