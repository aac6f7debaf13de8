use crate::error::EngineResult;
use quire_model::UndoStack;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "quire.config.json";

/// Quire configuration file format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default)]
    pub undo: UndoConfig,

    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub table: TableConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoConfig {
    /// Batches kept on the undo stack
    #[serde(default = "default_undo_steps")]
    pub steps: usize,
}

fn default_undo_steps() -> usize {
    100
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            steps: default_undo_steps(),
        }
    }
}

impl UndoConfig {
    pub fn stack(&self) -> UndoStack {
        UndoStack::with_max_levels(self.steps)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrimMode {
    /// A root with no text and no objects reads as `""`
    #[default]
    Empty,
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataConfig {
    #[serde(default)]
    pub trim: TrimMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableConfig {
    /// Drop empty `<tr>` rows before the first filled one
    #[serde(default = "default_true")]
    pub skip_empty_leading_rows: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            skip_empty_leading_rows: true,
        }
    }
}

impl EngineConfig {
    /// Load config from a file; a missing file gives the defaults
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: EngineConfig = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(EngineConfig::default())
        }
    }

    /// Load `quire.config.json` from a directory
    pub fn load_from_dir(dir: impl AsRef<Path>) -> EngineResult<Self> {
        Self::load(dir.as_ref().join(DEFAULT_CONFIG_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "undo": { "steps": 20 },
            "data": { "trim": "none" },
            "table": { "skipEmptyLeadingRows": false }
        }"#;

        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.undo.steps, 20);
        assert_eq!(config.data.trim, TrimMode::None);
        assert!(!config.table.skip_empty_leading_rows);
    }

    #[test]
    fn test_undo_stack_keeps_configured_steps() {
        use quire_model::{Document, Element, Position, MAIN_ROOT};

        let mut stack = UndoConfig { steps: 2 }.stack();
        let mut document = Document::new();
        for _ in 0..3 {
            stack
                .change(&mut document, |writer| {
                    writer.insert_element(Element::new("paragraph"), &Position::new(MAIN_ROOT, vec![0]))
                })
                .unwrap();
        }

        assert_eq!(stack.undo_levels(), 2);
    }

    #[test]
    fn test_default_config() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.undo.steps, 100);
        assert_eq!(config.data.trim, TrimMode::Empty);
        assert!(config.table.skip_empty_leading_rows);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = EngineConfig::load("/nonexistent/quire.config.json").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = std::env::temp_dir().join(format!("quire-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(DEFAULT_CONFIG_NAME), "{ not json").unwrap();

        let result = EngineConfig::load_from_dir(&dir);
        std::fs::remove_dir_all(&dir).unwrap();

        assert!(matches!(result, Err(crate::error::EngineError::Config(_))));
    }
}
