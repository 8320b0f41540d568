use crate::config::{load_context, read_document};
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use folio_editor::{Editor, InsertMenu};
use folio_model::{Point, Selection};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct MenuArgs {
    /// Document to inspect (JSON)
    pub input: PathBuf,

    /// Cursor as `path:offset`, at the end of a `/` trigger
    #[arg(long)]
    pub at: Point,

    /// Print the menu as JSON
    #[arg(long)]
    pub json: bool,

    /// Feature config file (defaults to folio.config.json in the current directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn menu(args: MenuArgs, cwd: &Path) -> Result<()> {
    let menu = open_menu(&args, cwd)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&menu)?);
        return Ok(());
    }

    println!("{} {}", "Insert menu for".green().bold(), menu.trigger.text);
    if menu.items.is_empty() {
        println!("   {} No matching commands", "✗".yellow());
    }
    for (index, item) in menu.items.iter().enumerate() {
        let marker = if index == menu.focused { "›".cyan().bold() } else { " ".normal() };
        println!("   {} {:<24} {}", marker, item.label, item.key.dimmed());
    }
    Ok(())
}

fn open_menu(args: &MenuArgs, cwd: &Path) -> Result<InsertMenu> {
    let ctx = load_context(cwd, args.config.as_deref())?;
    let mut editor = Editor::new(read_document(&args.input)?, ctx);
    if !editor.set_selection(Some(Selection::collapsed(args.at.clone()))) {
        return Err(anyhow!("{} is not a cursor position", args.at));
    }
    editor
        .insert_menu()
        .ok_or_else(|| anyhow!("No `/` trigger at {}", args.at))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(dir: &Path, source: &str, at: &str) -> MenuArgs {
        let input = dir.join("doc.json");
        std::fs::write(&input, source).unwrap();
        MenuArgs {
            input,
            at: at.parse().unwrap(),
            json: true,
            config: None,
        }
    }

    #[test]
    fn test_ranks_commands_for_trigger() {
        let dir = tempfile::tempdir().unwrap();
        let source = r#"[{ "type": "paragraph", "children": [{ "type": "text", "text": "/div" }] }]"#;
        let menu = open_menu(&args(dir.path(), source, "0.0:4"), dir.path()).unwrap();
        assert_eq!(menu.trigger.query, "div");
        assert_eq!(menu.items[0].key, "divider");
    }

    #[test]
    fn test_requires_trigger() {
        let dir = tempfile::tempdir().unwrap();
        let source = r#"[{ "type": "paragraph", "children": [{ "type": "text", "text": "plain" }] }]"#;
        assert!(open_menu(&args(dir.path(), source, "0.0:5"), dir.path()).is_err());
    }
}
