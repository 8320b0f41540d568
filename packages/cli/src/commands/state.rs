use crate::config::{load_context, read_document};
use anyhow::{anyhow, Result};
use clap::Args;
use folio_editor::Editor;
use folio_model::{Point, Selection};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct StateArgs {
    /// Document to inspect (JSON)
    pub input: PathBuf,

    /// Selection anchor as `path:offset`, e.g. `0.1:3`
    #[arg(short, long)]
    pub anchor: Point,

    /// Selection focus; defaults to the anchor
    #[arg(short, long)]
    pub focus: Option<Point>,

    /// Feature config file (defaults to folio.config.json in the current directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Print the toolbar state for a selection as JSON. Points address the
/// normalized document.
pub fn state(args: StateArgs, cwd: &Path) -> Result<()> {
    println!("{}", render_state(&args, cwd)?);
    Ok(())
}

fn render_state(args: &StateArgs, cwd: &Path) -> Result<String> {
    let ctx = load_context(cwd, args.config.as_deref())?;
    let mut editor = Editor::new(read_document(&args.input)?, ctx);

    let focus = args.focus.clone().unwrap_or_else(|| args.anchor.clone());
    if !editor.set_selection(Some(Selection::new(args.anchor.clone(), focus))) {
        return Err(anyhow!("Selection does not point at text or a void node"));
    }
    Ok(serde_json::to_string_pretty(editor.feature_state())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_prints_state_for_selection() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("doc.json");
        std::fs::write(
            &input,
            r#"[{ "type": "heading", "level": 2, "children": [{ "type": "text", "text": "Hi", "marks": ["bold"] }] }]"#,
        )
        .unwrap();

        let args = StateArgs {
            input: input.clone(),
            anchor: "0.0:0".parse().unwrap(),
            focus: Some("0.0:2".parse().unwrap()),
            config: None,
        };
        let state: Value = serde_json::from_str(&render_state(&args, dir.path()).unwrap()).unwrap();
        assert_eq!(state["marks"]["bold"]["isSelected"], true);
        assert_eq!(state["headings"]["selected"]["level"], 2);

        let args = StateArgs {
            input,
            anchor: "0.0:9".parse().unwrap(),
            focus: None,
            config: None,
        };
        assert!(render_state(&args, dir.path()).is_err());
    }
}
