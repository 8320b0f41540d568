use crate::config::{load_context, read_document};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use folio_editor::normalize_document;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Document to normalize (JSON)
    pub input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Feature config file (defaults to folio.config.json in the current directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn normalize(args: NormalizeArgs, cwd: &Path) -> Result<()> {
    let ctx = load_context(cwd, args.config.as_deref())?;
    let mut document = read_document(&args.input)?;
    normalize_document(&mut document, &ctx);

    let value = document.to_value()?;
    let json = serde_json::to_string_pretty(&value)?;
    match &args.output {
        Some(output) => {
            std::fs::write(output, json + "\n")
                .with_context(|| format!("Failed to write {}", output.display()))?;
            eprintln!("{} {}", "Wrote".green().bold(), output.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
