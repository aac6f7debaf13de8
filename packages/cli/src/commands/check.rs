use crate::config;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use quire_engine::{ConversionOptions, DataController};
use quire_model::notation;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// HTML file or directory to check
    pub input: PathBuf,

    /// List files that pass as well
    #[arg(short, long)]
    pub verbose: bool,

    /// Config file (defaults to quire.config.json in the current directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Result of reading a document, writing it and reading it again
#[derive(Debug, PartialEq)]
pub enum Outcome {
    Stable,
    Unstable { first: String, second: String },
}

pub fn check(args: CheckArgs, cwd: &Path) -> Result<()> {
    println!("🔍 {} Quire check", "Starting".green().bold());
    println!("   Input: {}", args.input.display());
    println!();

    let config = config::load(args.config.as_deref(), cwd)?;
    let controller = config::controller(&config);

    let files = if args.input.is_file() {
        vec![args.input.clone()]
    } else if args.input.is_dir() {
        let files = find_html_files(&args.input);
        println!("   Found {} HTML files", files.len());
        println!();
        files
    } else {
        return Err(anyhow!("Input path does not exist: {}", args.input.display()));
    };

    let mut failures = 0;
    for file in &files {
        match check_file(&controller, file) {
            Ok(Outcome::Stable) => {
                if args.verbose {
                    println!("{} {}", "✓".green(), file.display());
                }
            }
            Ok(Outcome::Unstable { first, second }) => {
                failures += 1;
                println!("{} {} changes when written and read again", "✗".red(), file.display());
                println!("   first read:  {}", first);
                println!("   second read: {}", second);
            }
            Err(err) => {
                failures += 1;
                eprintln!("{} {}: {:#}", "✗".red(), file.display(), err);
            }
        }
    }

    println!();
    println!(
        "✨ {} Check complete!",
        if failures > 0 {
            "Done".red().bold()
        } else {
            "Done".green().bold()
        }
    );
    println!("   Files checked: {}", files.len());

    if failures > 0 {
        return Err(anyhow!("{} of {} files failed", failures, files.len()));
    }
    println!("   {} No issues found!", "✓".green());
    Ok(())
}

fn check_file(controller: &DataController, path: &Path) -> Result<Outcome> {
    let source = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    check_source(controller, &source)
}

/// Read `source` into a model, write it back and read the output again; the
/// two models must match
pub fn check_source(controller: &DataController, source: &str) -> Result<Outcome> {
    let options = ConversionOptions::new();
    let first = controller.parse(source, &options)?;
    let written = controller.stringify(&first, &options)?;
    let second = controller.parse(&written, &options)?;

    let first = notation::stringify(first.children());
    let second = notation::stringify(second.children());
    if first == second {
        Ok(Outcome::Stable)
    } else {
        Ok(Outcome::Unstable { first, second })
    }
}

fn find_html_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext == "html" || ext == "htm")
        })
        .map(|entry| entry.path().to_path_buf())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_engine::EngineConfig;

    #[test]
    fn test_tables_are_stable() {
        let controller = config::controller(&EngineConfig::default());
        let source = "<table><tbody><tr></tr><tr><th>a</th><td>b</td></tr></tbody><thead><tr><th>h</th></tr></thead></table>";

        assert_eq!(check_source(&controller, source).unwrap(), Outcome::Stable);
    }

    #[test]
    fn test_basic_content_is_stable() {
        let controller = config::controller(&EngineConfig::default());
        let source = r#"<h3>Sub</h3><p style="text-align:center">a<i>b</i><br>c</p>loose text"#;

        assert_eq!(check_source(&controller, source).unwrap(), Outcome::Stable);
    }

    #[test]
    fn test_find_html_files() {
        let dir = std::env::temp_dir().join("quire-cli-find-html");
        let nested = dir.join("nested");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.join("a.html"), "<p>a</p>").unwrap();
        fs::write(nested.join("b.htm"), "<p>b</p>").unwrap();
        fs::write(dir.join("notes.txt"), "skip").unwrap();

        let mut names: Vec<String> = find_html_files(&dir)
            .iter()
            .filter_map(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
            .collect();
        names.sort();

        assert_eq!(names, vec!["a.html", "b.htm"]);
    }
}
