use anyhow::{Context, Result};
use quire_engine::{register_basics, DataController, EngineConfig};
use quire_table::register_table;
use std::path::Path;

/// Config from `--config`, or from `quire.config.json` in `cwd` when given
/// no path. A missing file means defaults.
pub fn load(path: Option<&Path>, cwd: &Path) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load(path),
        None => EngineConfig::load_from_dir(cwd),
    };
    config.context("Failed to load config")
}

/// Data controller with every feature the CLI knows about
pub fn controller(config: &EngineConfig) -> DataController {
    let mut controller = DataController::default().with_config(config.data.clone());
    register_basics(&mut controller);
    register_table(&mut controller, &config.table);
    controller
}
