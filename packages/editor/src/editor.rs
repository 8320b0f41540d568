//! # Editor
//!
//! One open document: the tree, the selection and the registries it was
//! built with. All changes go through [`Editor::apply`], which runs a
//! command against a working copy, normalizes it and commits it as one new
//! version. A command whose preconditions fail leaves everything untouched.

use crate::component::{ComponentRegistry, ComponentView};
use crate::config::FeatureConfig;
use crate::errors::EditorError;
use crate::insert_menu::{self, InsertMenu, KeyOutcome, MenuKey};
use crate::normalize::{normalize, normalize_document};
use crate::relationship::{RelationshipPicker, RelationshipRegistry, DEFAULT_DEBOUNCE};
use crate::rules::{in_code, in_placeholder};
use crate::state::{derive_state, FeatureState};
use crate::transforms::{self, disabled, not_allowed, Command, Transaction, TransformError, TransformResult};
use folio_model::{Document, Mark, NodeId, NodeKind, Path, Point, Selection};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, debug_span, info};

/// Configuration and registries shared by everything an editor does
#[derive(Debug, Clone)]
pub struct EditorContext {
    pub features: FeatureConfig,
    pub components: Arc<ComponentRegistry>,
    pub relationships: Arc<RelationshipRegistry>,
    /// Delay before a relationship search reaches the resolver
    pub search_debounce: Duration,
}

impl Default for EditorContext {
    fn default() -> Self {
        Self::new(FeatureConfig::default())
    }
}

impl EditorContext {
    pub fn new(features: FeatureConfig) -> Self {
        Self {
            features,
            components: Arc::new(ComponentRegistry::new()),
            relationships: Arc::new(RelationshipRegistry::new()),
            search_debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_components(mut self, components: ComponentRegistry) -> Self {
        self.components = Arc::new(components);
        self
    }

    pub fn with_relationships(mut self, relationships: RelationshipRegistry) -> Self {
        self.relationships = Arc::new(relationships);
        self
    }

    pub fn with_search_debounce(mut self, debounce: Duration) -> Self {
        self.search_debounce = debounce;
        self
    }
}

struct CachedState {
    version: u64,
    selection: Option<Selection>,
    pending_marks: Option<BTreeSet<Mark>>,
    state: FeatureState,
}

/// Position of the keyboard focus in an open insert menu
#[derive(Debug, Clone, PartialEq, Eq)]
struct MenuFocus {
    run: NodeId,
    query: String,
    index: usize,
}

pub struct Editor {
    document: Document,
    selection: Option<Selection>,
    version: u64,
    context: EditorContext,
    /// Marks for the next typed text at a collapsed cursor
    pending_marks: Option<BTreeSet<Mark>>,
    pickers: HashMap<NodeId, RelationshipPicker>,
    state_cache: Option<CachedState>,
    menu_focus: Option<MenuFocus>,
    /// Trigger run and text at the moment the menu was dismissed
    menu_dismissed: Option<(NodeId, String)>,
}

impl Editor {
    /// Open `document`, normalizing it first. The cursor starts at the
    /// beginning of the document.
    pub fn new(mut document: Document, context: EditorContext) -> Self {
        normalize_document(&mut document, &context);
        let selection = document.start_point().map(Selection::collapsed);
        info!(blocks = document.children.len(), "opened document");
        Self {
            document,
            selection,
            version: 0,
            context,
            pending_marks: None,
            pickers: HashMap::new(),
            state_cache: None,
            menu_focus: None,
            menu_dismissed: None,
        }
    }

    pub fn from_json(source: &str, context: EditorContext) -> Result<Self, EditorError> {
        let document = Document::from_json(source)?;
        Ok(Self::new(document, context))
    }

    pub fn to_json(&self) -> Result<String, EditorError> {
        Ok(self.document.to_json()?)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Increments once per committed command
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn context(&self) -> &EditorContext {
        &self.context
    }

    pub fn pending_marks(&self) -> Option<&BTreeSet<Mark>> {
        self.pending_marks.as_ref()
    }

    /// Replace the selection. Points must address text runs or void nodes.
    pub fn set_selection(&mut self, selection: Option<Selection>) -> bool {
        if let Some(selection) = &selection {
            if !self.document.is_valid_point(&selection.anchor) || !self.document.is_valid_point(&selection.focus) {
                debug!(anchor = %selection.anchor, focus = %selection.focus, "rejected invalid selection");
                return false;
            }
        }
        if selection != self.selection {
            self.pending_marks = None;
        }
        self.selection = selection;
        true
    }

    pub fn select(&mut self, point: Point) -> bool {
        self.set_selection(Some(Selection::collapsed(point)))
    }

    /// Run a command. Returns whether the document or pending marks changed.
    pub fn apply(&mut self, command: Command) -> bool {
        match self.try_apply(&command) {
            Ok(()) => true,
            Err(error) => {
                debug!(command = command.name(), %error, "command not applied");
                false
            }
        }
    }

    pub fn try_apply(&mut self, command: &Command) -> TransformResult {
        if let Command::ToggleMark { mark } = command {
            if self.selection.as_ref().map_or(false, Selection::is_collapsed) {
                return self.toggle_pending_mark(*mark);
            }
        }
        self.transact(command.name(), |tx| transforms::run(tx, command))
    }

    /// Run `edit` against a working copy and commit the result on success
    pub(crate) fn transact(
        &mut self,
        name: &str,
        edit: impl FnOnce(&mut Transaction<'_>) -> TransformResult,
    ) -> TransformResult {
        let _span = debug_span!("transact", command = name, version = self.version).entered();
        let mut tx = Transaction::begin(
            &self.document,
            self.selection.as_ref(),
            &self.context,
            self.pending_marks.clone(),
        )?;
        edit(&mut tx)?;
        normalize(&mut tx.doc, &mut tx.anchors, &self.context);
        let (document, selection) = tx.finish();

        self.document = document;
        self.selection = selection;
        self.version += 1;
        self.pending_marks = None;
        self.prune_pickers();
        debug!(version = self.version, "committed");
        Ok(())
    }

    fn toggle_pending_mark(&mut self, mark: Mark) -> TransformResult {
        if !self.context.features.allows_mark(mark) {
            return Err(disabled(mark.as_str()));
        }
        let focus = &self.selection.as_ref().ok_or(TransformError::NoSelection)?.focus;
        if in_code(&self.document, &focus.path) {
            return Err(not_allowed("formatting inside a code block"));
        }
        if in_placeholder(&self.document, &focus.path, &self.context.components) {
            return Err(not_allowed("content of an unknown component is read-only"));
        }
        let node = self.document.node(&focus.path).ok_or(TransformError::StaleSelection)?;
        let current = node
            .marks()
            .cloned()
            .ok_or_else(|| not_allowed("cursor is on a void node"))?;

        let mut marks = self.pending_marks.take().unwrap_or(current);
        if !marks.remove(&mark) {
            marks.insert(mark);
        }
        self.pending_marks = Some(marks);
        Ok(())
    }

    /// Feature state for the current selection, with pending marks shown
    /// as active. Cached until the version, selection or pending marks
    /// change.
    pub fn feature_state(&mut self) -> &FeatureState {
        let fresh = self.state_cache.as_ref().map_or(false, |cached| {
            cached.version == self.version
                && cached.selection == self.selection
                && cached.pending_marks == self.pending_marks
        });
        if !fresh {
            self.state_cache = None;
        }
        let cached = self.state_cache.get_or_insert_with(|| {
            let mut state = derive_state(&self.document, self.selection.as_ref(), &self.context);
            if let Some(pending) = &self.pending_marks {
                state = state.with_pending_marks(pending);
            }
            CachedState {
                version: self.version,
                selection: self.selection.clone(),
                pending_marks: self.pending_marks.clone(),
                state,
            }
        });
        &cached.state
    }

    /// Render data for the component block at `path`
    pub fn component_view(&self, path: &Path) -> Option<ComponentView> {
        match &self.document.node(path)?.kind {
            NodeKind::ComponentBlock { component, props, .. } => {
                Some(ComponentView::resolve(&self.context.components, component, props))
            }
            _ => None,
        }
    }

    /// Search handle for the relationship node at `path`. The same node
    /// always gets the same picker; it is cancelled once the node is gone.
    pub fn open_picker(&mut self, path: &Path) -> Option<RelationshipPicker> {
        let node = self.document.node(path)?;
        let NodeKind::Relationship { relationship, .. } = &node.kind else {
            return None;
        };
        let target = self.context.relationships.get(relationship)?;
        let debounce = self.context.search_debounce;
        let picker = self
            .pickers
            .entry(node.id)
            .or_insert_with(|| RelationshipPicker::with_debounce(Arc::clone(target), debounce));
        Some(picker.clone())
    }

    fn prune_pickers(&mut self) {
        let document = &self.document;
        self.pickers.retain(|id, picker| {
            let alive = document.path_of(*id).is_some();
            if !alive {
                debug!(relationship = %picker.target().key, "relationship removed, cancelling its search");
                picker.cancel();
            }
            alive
        });
    }

    /// The insert menu for the trigger under the cursor, if one is open
    pub fn insert_menu(&mut self) -> Option<InsertMenu> {
        let trigger = insert_menu::find_trigger(&self.document, self.selection.as_ref())?;
        if self.menu_dismissed.as_ref() == Some(&(trigger.run, trigger.text.clone())) {
            return None;
        }
        let state = self.feature_state().clone();
        let items = insert_menu::rank(insert_menu::available_commands(&state, &self.context), &trigger.query);

        let focused = match &self.menu_focus {
            Some(focus) if focus.run == trigger.run && focus.query == trigger.query => {
                focus.index.min(items.len().saturating_sub(1))
            }
            _ => 0,
        };
        self.menu_focus = Some(MenuFocus {
            run: trigger.run,
            query: trigger.query.clone(),
            index: focused,
        });
        Some(InsertMenu {
            trigger,
            items,
            focused,
        })
    }

    /// Handle a key while the insert menu may be open
    pub fn menu_key(&mut self, key: MenuKey) -> KeyOutcome {
        let Some(menu) = self.insert_menu() else {
            return KeyOutcome::Ignored;
        };
        if menu.items.is_empty() {
            return KeyOutcome::Ignored;
        }
        let count = menu.items.len();

        match key {
            MenuKey::Up | MenuKey::Down => {
                let index = match key {
                    MenuKey::Up => (menu.focused + count - 1) % count,
                    _ => (menu.focused + 1) % count,
                };
                if let Some(focus) = &mut self.menu_focus {
                    focus.index = index;
                }
                KeyOutcome::Moved(index)
            }
            MenuKey::Escape => {
                self.menu_dismissed = Some((menu.trigger.run, menu.trigger.text.clone()));
                self.menu_focus = None;
                KeyOutcome::Dismissed
            }
            MenuKey::Enter => {
                let item = &menu.items[menu.focused];
                match self.execute_insert(&menu.trigger, &item.command) {
                    Ok(()) => {
                        self.menu_focus = None;
                        KeyOutcome::Executed(item.key.clone())
                    }
                    Err(error) => {
                        debug!(command = item.key.as_str(), %error, "insert command failed");
                        KeyOutcome::Failed
                    }
                }
            }
        }
    }

    /// Delete the trigger text and run `command` in its place, as one edit
    fn execute_insert(&mut self, trigger: &insert_menu::Trigger, command: &Command) -> TransformResult {
        self.transact(command.name(), |tx| {
            let path = tx
                .doc
                .path_of(trigger.run)
                .ok_or_else(|| not_allowed("trigger text is gone"))?;
            if let NodeKind::Text { text, .. } = &mut tx.node_mut(&path)?.kind {
                text.clear();
            }
            if inserts_block(command) {
                // an emptied code block is replaced like an empty paragraph
                let code_block = tx
                    .doc
                    .text_block_of(&path)
                    .filter(|(_, block)| matches!(block.kind, NodeKind::Code { .. }))
                    .map(|(block_path, _)| block_path);
                if let Some(block_path) = code_block {
                    let block = tx.node_mut(&block_path)?;
                    if let NodeKind::Code { children } = &mut block.kind {
                        let children = std::mem::take(children);
                        block.kind = NodeKind::Paragraph {
                            text_align: None,
                            children,
                        };
                    }
                }
            }
            tx.select(&Point::new(path, 0))?;
            transforms::run(tx, command)
        })
    }
}

fn inserts_block(command: &Command) -> bool {
    matches!(
        command,
        Command::InsertBlock { .. }
            | Command::InsertDivider
            | Command::InsertLayout { .. }
            | Command::InsertComponentBlock { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_model::Node;

    fn editor(children: Vec<Node>) -> Editor {
        Editor::new(Document::new(children), EditorContext::default())
    }

    #[test]
    fn test_new_normalizes_and_places_cursor() {
        let editor = editor(vec![]);
        assert_eq!(editor.document(), &Document::empty());
        assert_eq!(editor.selection(), Some(&Selection::collapsed(Point::new(vec![0, 0], 0))));
        assert_eq!(editor.version(), 0);
    }

    #[test]
    fn test_unknown_component_content_is_read_only() {
        let mut editor = editor(vec![Node::component_block(
            "legacy",
            serde_json::json!({ "x": 1 }),
            vec![Node::component_slot("content", vec![Node::paragraph(vec![Node::text("raw")])])],
        )]);
        let before = editor.document().clone();
        assert!(editor.select(Point::new(vec![0, 0, 0, 0], 3)));

        assert!(!editor.apply(Command::InsertText { text: "!".into() }));
        assert!(!editor.apply(Command::DeleteBackward));
        assert!(!editor.apply(Command::ToggleMark { mark: Mark::Bold }));
        assert_eq!(editor.document(), &before);
        assert_eq!(editor.document().plain_text(), "raw");
        assert_eq!(editor.version(), 0);
    }

    #[test]
    fn test_failed_command_changes_nothing() {
        let mut editor = editor(vec![Node::code("x")]);
        let before = editor.document().clone();

        assert!(!editor.apply(Command::ToggleHeading { level: 1 }));
        assert_eq!(editor.document(), &before);
        assert_eq!(editor.version(), 0);
    }

    #[test]
    fn test_pending_marks_apply_to_typing() {
        let mut editor = editor(vec![Node::paragraph(vec![Node::text("ab")])]);
        editor.select(Point::new(vec![0, 0], 1));

        assert!(editor.apply(Command::ToggleMark { mark: Mark::Bold }));
        assert_eq!(editor.version(), 0);
        assert!(editor.feature_state().mark(Mark::Bold).is_selected);

        assert!(editor.apply(Command::InsertText { text: "X".into() }));
        assert_eq!(
            editor.document().children[0],
            Node::paragraph(vec![
                Node::text("a"),
                Node::marked_text("X", [Mark::Bold]),
                Node::text("b"),
            ])
        );
        assert!(editor.pending_marks().is_none());
        assert_eq!(editor.selection(), Some(&Selection::collapsed(Point::new(vec![0, 1], 1))));
    }

    #[test]
    fn test_invalid_selection_rejected() {
        let mut editor = editor(vec![Node::paragraph(vec![Node::text("ab")])]);
        assert!(!editor.select(Point::new(vec![0, 0], 9)));
        assert!(!editor.select(Point::new(vec![0], 0)));
        assert!(editor.select(Point::new(vec![0, 0], 2)));
    }

    #[test]
    fn test_feature_state_is_cached_per_version() {
        let mut editor = editor(vec![Node::paragraph(vec![Node::text("ab")])]);
        let first = editor.feature_state().clone();
        assert_eq!(editor.feature_state(), &first);

        editor.apply(Command::ToggleHeading { level: 1 });
        assert_ne!(editor.feature_state(), &first);
    }
}
