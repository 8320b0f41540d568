//! # Insert Menu
//!
//! The `/` command palette. Typing `/` as the only content of a text block
//! opens a menu of insertable things: block types, registered component
//! blocks and relationship targets. Entries are first filtered by what the
//! feature state allows at the cursor, then ranked by fuzzy match of the
//! text after the `/` against each entry's label and keywords.

use crate::editor::EditorContext;
use crate::state::FeatureState;
use crate::transforms::{BlockType, Command};
use folio_model::{Document, ListKind, NodeId, NodeKind, Path, Selection};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::Serialize;
use tracing::{debug, debug_span};

pub const TRIGGER: char = '/';

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertCommand {
    pub key: String,
    pub label: String,
    pub keywords: Vec<String>,
    pub command: Command,
}

impl InsertCommand {
    fn new(key: impl Into<String>, label: impl Into<String>, keywords: &[&str], command: Command) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            command,
        }
    }
}

/// The `/` run that opened the menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    #[serde(skip)]
    pub run: NodeId,
    pub path: Path,
    /// Full run text, marker included
    pub text: String,
    /// Text typed after the marker
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertMenu {
    pub trigger: Trigger,
    pub items: Vec<InsertCommand>,
    pub focused: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKey {
    Up,
    Down,
    Enter,
    Escape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// No open menu, or nothing matches; the key is left to the caller
    Ignored,
    Moved(usize),
    Dismissed,
    /// The command with this key ran
    Executed(String),
    /// The focused command could not run here
    Failed,
}

/// The open trigger under a collapsed cursor: a text block whose only child
/// is a run starting with `/`, with the cursor at the end of that run
pub fn find_trigger(doc: &Document, selection: Option<&Selection>) -> Option<Trigger> {
    let selection = selection?;
    if !selection.is_collapsed() {
        return None;
    }
    let focus = &selection.focus;
    let run = doc.node(&focus.path)?;
    let NodeKind::Text { text, .. } = &run.kind else {
        return None;
    };
    let block = doc.node(&focus.path.parent()?)?;
    if !block.is_text_block() || block.children().map_or(0, Vec::len) != 1 {
        return None;
    }
    let query = text.strip_prefix(TRIGGER)?;
    if focus.offset != run.text_len() {
        return None;
    }
    Some(Trigger {
        run: run.id,
        path: focus.path.clone(),
        text: text.clone(),
        query: query.to_string(),
    })
}

/// Entries that can run where the selection is, in menu order
pub fn available_commands(state: &FeatureState, ctx: &EditorContext) -> Vec<InsertCommand> {
    let mut commands = Vec::new();

    if !state.headings.is_disabled {
        for level in &state.headings.allowed_heading_levels {
            commands.push(InsertCommand::new(
                format!("heading-{}", level),
                format!("Heading {}", level),
                &["title", "h"],
                Command::SetBlockType {
                    block: BlockType::Heading { level: *level },
                },
            ));
        }
    }
    for (kind, key, label, keywords) in [
        (ListKind::Unordered, "bullet-list", "Bullet List", &["unordered", "ul"]),
        (ListKind::Ordered, "ordered-list", "Numbered List", &["ordered", "ol"]),
    ] {
        let toggle = state.lists.get(kind);
        if toggle.is_available() && !toggle.is_selected {
            commands.push(InsertCommand::new(
                key,
                label,
                keywords,
                Command::SetBlockType {
                    block: BlockType::List { kind },
                },
            ));
        }
    }
    if state.blockquote.is_available() && !state.blockquote.is_selected {
        commands.push(InsertCommand::new(
            "blockquote",
            "Blockquote",
            &["quote"],
            Command::ToggleBlockquote,
        ));
    }
    if state.code.is_available() && !state.code.is_selected {
        commands.push(InsertCommand::new(
            "code",
            "Code Block",
            &["pre", "snippet"],
            Command::SetBlockType { block: BlockType::Code },
        ));
    }
    if state.divider.is_available() {
        commands.push(InsertCommand::new(
            "divider",
            "Divider",
            &["hr", "horizontal rule", "separator"],
            Command::InsertDivider,
        ));
    }
    if !state.layout.is_disabled {
        commands.push(InsertCommand::new(
            "layout",
            "Layout",
            &["columns"],
            Command::InsertLayout { ratios: None },
        ));
    }
    for definition in ctx.components.iter() {
        let available = state
            .components
            .get(&definition.key)
            .map_or(false, |toggle| toggle.is_available());
        if available {
            let keywords: Vec<&str> = definition.keywords.iter().map(String::as_str).collect();
            commands.push(InsertCommand::new(
                format!("component:{}", definition.key),
                definition.label.as_str(),
                &keywords,
                Command::InsertComponentBlock {
                    component: definition.key.clone(),
                },
            ));
        }
    }
    for target in ctx.relationships.iter() {
        let available = state
            .relationships
            .get(&target.key)
            .map_or(false, |toggle| toggle.is_available());
        if available {
            commands.push(InsertCommand::new(
                format!("relationship:{}", target.key),
                target.label.as_str(),
                &["mention", "link"],
                Command::InsertRelationship {
                    relationship: target.key.clone(),
                },
            ));
        }
    }
    commands
}

/// Keep the entries matching `query`, best match first. Ties keep menu order.
pub fn rank(commands: Vec<InsertCommand>, query: &str) -> Vec<InsertCommand> {
    let query = query.trim();
    if query.is_empty() {
        return commands;
    }
    let _span = debug_span!("rank", query, total = commands.len()).entered();
    let matcher = SkimMatcherV2::default();

    let mut scored: Vec<(i64, InsertCommand)> = commands
        .into_iter()
        .filter_map(|command| {
            let score = std::iter::once(command.label.as_str())
                .chain(command.keywords.iter().map(String::as_str))
                .filter_map(|text| matcher.fuzzy_match(text, query))
                .max()?;
            Some((score, command))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    debug!(filtered_count = scored.len(), "insert menu filtered");
    scored.into_iter().map(|(_, command)| command).collect()
}
