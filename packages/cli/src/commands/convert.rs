use crate::config;
use anyhow::{Context, Result};
use clap::Args;
use quire_engine::{ConversionOptions, DataController};
use quire_model::{notation, Document, MAIN_ROOT};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// HTML file to convert
    pub input: PathBuf,

    /// Print the model instead of the HTML written back from it
    #[arg(long)]
    pub model: bool,

    /// Config file (defaults to quire.config.json in the current directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn convert(args: ConvertArgs, cwd: &Path) -> Result<()> {
    let config = config::load(args.config.as_deref(), cwd)?;
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    info!(input = %args.input.display(), bytes = source.len(), "converting");

    let controller = config::controller(&config);
    println!("{}", convert_source(&controller, &source, args.model)?);
    Ok(())
}

/// Load HTML into a document, then print the document as model notation or
/// as HTML
pub fn convert_source(controller: &DataController, source: &str, model: bool) -> Result<String> {
    let options = ConversionOptions::new();
    let mut document = Document::new();
    controller.set(&mut document, MAIN_ROOT, source, &options)?;

    if model {
        return Ok(notation::stringify_children(document.root_for(MAIN_ROOT)?));
    }
    Ok(controller.get(&document, MAIN_ROOT, &options)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_engine::EngineConfig;

    #[test]
    fn test_convert_to_model() {
        let controller = config::controller(&EngineConfig::default());
        let output = convert_source(&controller, "<p>foo <b>bar</b></p>", true).unwrap();

        assert_eq!(output, r#"<paragraph>foo <$text bold="true">bar</$text></paragraph>"#);
    }

    #[test]
    fn test_convert_to_html() {
        let controller = config::controller(&EngineConfig::default());
        let output = convert_source(&controller, "<h2>Title</h2><p>foo <b>bar</b></p>", false).unwrap();

        assert_eq!(output, "<h2>Title</h2><p>foo <strong>bar</strong></p>");
    }
}
