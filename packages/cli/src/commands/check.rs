use crate::config::{load_context, read_document};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use folio_editor::check_document;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Document to check (JSON)
    pub input: PathBuf,

    /// Feature config file (defaults to folio.config.json in the current directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Report problems in a stored document. Fails when the structure is
/// invalid; component props problems are warnings.
pub fn check(args: CheckArgs, cwd: &Path) -> Result<()> {
    let ctx = load_context(cwd, args.config.as_deref())?;
    let document = read_document(&args.input)?;
    let issues = check_document(&document, &ctx.components);

    println!("🔍 {} {}", "Checking".green().bold(), args.input.display());
    let mut errors = 0;
    for issue in &issues {
        if issue.is_structural() {
            errors += 1;
            println!("   {} {}", "✗".red(), issue);
        } else {
            println!("   {} {}", "!".yellow(), issue);
        }
    }

    if errors > 0 {
        return Err(anyhow::anyhow!(
            "{} structural problem{} found; run `folio normalize` to repair",
            errors,
            if errors == 1 { "" } else { "s" }
        ));
    }
    if issues.is_empty() {
        println!("   {} No issues found!", "✓".green());
    }
    Ok(())
}
