//! Free-form options handed to every converter of a pass.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON object passed through a conversion unmodified
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversionOptions(Map<String, Value>);

impl ConversionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for ConversionOptions {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
