//! Integration tests for the editor crate

use folio_editor::relationship::{
    RelationshipRegistry, RelationshipResolver, RelationshipTarget, ResolveError, SearchOutcome, SearchQuery,
    SearchStatus,
};
use folio_editor::state::HeadingSelection;
use folio_editor::{Command, Editor, EditorContext, FeatureConfig};
use folio_model::{check_structure, Document, ListKind, Mark, Node, Path, Point, RelationshipData, Selection};
use futures::future::BoxFuture;
use std::time::Duration;

fn editor(children: Vec<Node>) -> Editor {
    Editor::new(Document::new(children), EditorContext::default())
}

fn range(anchor: (Vec<usize>, usize), focus: (Vec<usize>, usize)) -> Option<Selection> {
    Some(Selection::new(Point::new(anchor.0, anchor.1), Point::new(focus.0, focus.1)))
}

#[test]
fn test_toggle_mark_twice_restores_document() {
    let mut editor = editor(vec![Node::paragraph(vec![
        Node::text("plain "),
        Node::marked_text("bold", [Mark::Bold]),
    ])]);
    let original = editor.document().clone();
    assert!(editor.set_selection(range((vec![0, 0], 2), (vec![0, 0], 5))));

    assert!(editor.apply(Command::ToggleMark { mark: Mark::Bold }));
    assert_ne!(editor.document(), &original);
    assert!(editor.feature_state().marks[&Mark::Bold].is_selected);

    assert!(editor.apply(Command::ToggleMark { mark: Mark::Bold }));
    assert_eq!(editor.document(), &original);
    assert_eq!(editor.version(), 2);
}

#[test]
fn test_json_round_trip() {
    let source = r#"[
        { "type": "heading", "level": 2, "children": [{ "type": "text", "text": "Title" }] },
        { "type": "list", "kind": "ordered", "children": [
            { "type": "list-item", "children": [
                { "type": "paragraph", "children": [{ "type": "text", "text": "one", "marks": ["bold"] }] }
            ] }
        ] },
        { "type": "divider" },
        { "type": "paragraph", "children": [{ "type": "text", "text": "" }] }
    ]"#;
    let doc = Document::from_json(source).unwrap();
    let editor = Editor::new(doc.clone(), EditorContext::default());

    let saved = editor.to_json().unwrap();
    assert_eq!(Document::from_json(&saved).unwrap(), *editor.document());
    assert_eq!(editor.document(), &doc);
}

#[test]
fn test_mixed_selection_state() {
    let mut editor = editor(vec![
        Node::heading(1, vec![Node::marked_text("one", [Mark::Bold])]),
        Node::heading(2, vec![Node::text("two")]),
    ]);
    assert!(editor.set_selection(range((vec![0, 0], 0), (vec![1, 0], 3))));

    let state = editor.feature_state();
    assert_eq!(state.headings.selected, HeadingSelection::Normal);
    assert!(!state.marks[&Mark::Bold].is_selected);
    assert!(!state.marks[&Mark::Bold].is_disabled);

    assert!(editor.set_selection(range((vec![0, 0], 0), (vec![0, 0], 3))));
    let state = editor.feature_state();
    assert_eq!(state.headings.selected, HeadingSelection::Level(1));
    assert!(state.marks[&Mark::Bold].is_selected);
}

#[test]
fn test_divider_replaces_empty_paragraph() {
    let mut editor = editor(vec![
        Node::paragraph(vec![Node::text("x")]),
        Node::empty_paragraph(),
    ]);
    assert!(editor.select(Point::new(vec![1, 0], 0)));
    assert!(editor.apply(Command::InsertDivider));

    let kinds: Vec<&str> = editor.document().children.iter().map(Node::kind_name).collect();
    assert_eq!(kinds, vec!["paragraph", "divider", "paragraph"]);

    let mut editor = self::editor(vec![Node::paragraph(vec![Node::text("x")])]);
    assert!(editor.select(Point::new(vec![0, 0], 1)));
    assert!(editor.apply(Command::InsertDivider));

    let kinds: Vec<&str> = editor.document().children.iter().map(Node::kind_name).collect();
    assert_eq!(kinds, vec!["paragraph", "divider", "paragraph"]);
    assert_eq!(editor.document().children[0].text_content(), "x");
}

#[test]
fn test_layout_resize_keeps_content() {
    let mut editor = editor(vec![]);
    assert!(editor.apply(Command::InsertLayout { ratios: None }));
    assert!(editor.apply(Command::InsertText { text: "left".into() }));
    assert!(editor.select(Point::new(vec![0, 1, 0, 0], 0)));
    assert!(editor.apply(Command::InsertText { text: "right".into() }));
    let before = editor.document().plain_text();

    assert!(editor.apply(Command::SetLayout {
        path: None,
        ratios: vec![1],
    }));
    assert_eq!(editor.document().plain_text(), before);
    assert!(check_structure(editor.document()).is_empty());

    assert!(editor.apply(Command::SetLayout {
        path: Some(Path::new(vec![0])),
        ratios: vec![1, 2, 1],
    }));
    assert_eq!(editor.document().children[0].children().map(Vec::len), Some(3));
    assert_eq!(editor.document().plain_text().trim_end(), before.trim_end());
}

#[test]
fn test_layout_grow_then_shrink_keeps_content() {
    let mut editor = editor(vec![]);
    assert!(editor.apply(Command::InsertLayout {
        ratios: Some(vec![1, 1]),
    }));
    assert!(editor.apply(Command::InsertText { text: "left".into() }));
    assert!(editor.select(Point::new(vec![0, 1, 0, 0], 0)));
    assert!(editor.apply(Command::InsertText { text: "right".into() }));

    assert!(editor.apply(Command::SetLayout {
        path: Some(Path::new(vec![0])),
        ratios: vec![1, 1, 1],
    }));
    assert_eq!(editor.document().children[0].children().map(Vec::len), Some(3));

    assert!(editor.apply(Command::SetLayout {
        path: Some(Path::new(vec![0])),
        ratios: vec![1, 1],
    }));
    assert_eq!(editor.document().children[0].children().map(Vec::len), Some(2));
    assert_eq!(editor.document().plain_text().trim_end(), "left\nright");
    assert!(check_structure(editor.document()).is_empty());
}

#[test]
fn test_insert_menu_respects_code_context() {
    let mut editor = editor(vec![Node::code("/")]);
    assert!(editor.select(Point::new(vec![0, 0], 1)));

    let menu = editor.insert_menu().unwrap();
    let keys: Vec<&str> = menu.items.iter().map(|item| item.key.as_str()).collect();
    assert!(!keys.iter().any(|key| key.starts_with("heading")));
    assert!(!keys.iter().any(|key| key.contains("list")));
    assert!(!keys.contains(&"code"));
    assert!(keys.contains(&"divider"));

    let mut editor = self::editor(vec![Node::paragraph(vec![Node::text("/")])]);
    assert!(editor.select(Point::new(vec![0, 0], 1)));
    let keys: Vec<String> = editor.insert_menu().unwrap().items.into_iter().map(|item| item.key).collect();
    assert!(keys.contains(&"heading-1".to_string()));
    assert!(keys.contains(&"code".to_string()));
}

#[test]
fn test_config_gates_commands() {
    let config: FeatureConfig = serde_json::from_str(r#"{ "marks": ["italic"], "code": false }"#).unwrap();
    let mut editor = Editor::new(
        Document::new(vec![Node::paragraph(vec![Node::text("abc")])]),
        EditorContext::new(config),
    );
    assert!(editor.set_selection(range((vec![0, 0], 0), (vec![0, 0], 3))));

    assert!(!editor.apply(Command::ToggleMark { mark: Mark::Bold }));
    assert!(!editor.apply(Command::ToggleCode));
    assert!(editor.apply(Command::ToggleMark { mark: Mark::Italic }));
    assert_eq!(editor.version(), 1);

    let state = editor.feature_state();
    assert!(state.marks[&Mark::Bold].is_disabled);
    assert!(state.code.is_disabled);
}

/// Linear congruential generator; keeps the command sequence reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n.max(1) as u64) as usize
    }
}

fn random_point(doc: &Document, rng: &mut Lcg) -> Point {
    let positions = doc.positions();
    let path = positions[rng.below(positions.len())].clone();
    let len = doc.node(&path).map_or(0, Node::text_len);
    Point::new(path, rng.below(len + 1))
}

fn random_command(rng: &mut Lcg) -> Command {
    match rng.below(18) {
        0 | 1 => Command::InsertText { text: "ab".into() },
        2 => Command::DeleteBackward,
        3 => Command::ToggleMark {
            mark: Mark::ALL[rng.below(Mark::ALL.len())],
        },
        4 => Command::ToggleHeading {
            level: rng.below(6) as u8 + 1,
        },
        5 => Command::ToggleList {
            kind: if rng.below(2) == 0 { ListKind::Ordered } else { ListKind::Unordered },
        },
        6 => Command::IndentListItem,
        7 => Command::OutdentListItem,
        8 => Command::ToggleBlockquote,
        9 => Command::ToggleCode,
        10 => Command::InsertDivider,
        11 => Command::InsertLayout { ratios: None },
        12 => Command::SetLayout {
            path: None,
            ratios: vec![1; rng.below(3) + 1],
        },
        13 => Command::RemoveLayout { path: None },
        14 => Command::WrapLink {
            href: "https://example.com".into(),
        },
        15 => Command::UnwrapLink,
        16 => Command::InsertRelationship {
            relationship: "post".into(),
        },
        _ => Command::RemoveBlock { path: Path::new(vec![0]) },
    }
}

#[test]
fn test_random_commands_keep_invariants() {
    let relationships = RelationshipRegistry::new().with(RelationshipTarget::new(
        "post",
        "Post",
        folio_editor::relationship::StaticResolver::default(),
    ));
    let ctx = EditorContext::default().with_relationships(relationships);

    for seed in 0..20u64 {
        let mut rng = Lcg(seed);
        let mut editor = Editor::new(
            Document::new(vec![
                Node::heading(1, vec![Node::text("Title")]),
                Node::paragraph(vec![Node::text("some text")]),
                Node::list(
                    ListKind::Unordered,
                    vec![
                        Node::list_item(vec![Node::paragraph(vec![Node::text("one")])]),
                        Node::list_item(vec![Node::paragraph(vec![Node::text("two")])]),
                    ],
                ),
            ]),
            ctx.clone(),
        );

        for step in 0..60 {
            if rng.below(3) == 0 {
                let anchor = random_point(editor.document(), &mut rng);
                let focus = if rng.below(2) == 0 {
                    anchor.clone()
                } else {
                    random_point(editor.document(), &mut rng)
                };
                assert!(editor.set_selection(Some(Selection::new(anchor, focus))));
            }

            let command = random_command(&mut rng);
            let before = editor.version();
            let applied = editor.apply(command.clone());

            let violations = check_structure(editor.document());
            assert!(
                violations.is_empty(),
                "seed {} step {} {:?}: {:?}",
                seed,
                step,
                command,
                violations
            );
            let selection = editor.selection().cloned().unwrap();
            assert!(editor.document().is_valid_point(&selection.anchor), "seed {} step {}", seed, step);
            assert!(editor.document().is_valid_point(&selection.focus), "seed {} step {}", seed, step);
            if !applied {
                assert_eq!(editor.version(), before);
            }
        }
    }
}

/// Resolver whose latency depends on the term, so results arrive out of order
struct Delayed;

impl RelationshipResolver for Delayed {
    fn search<'a>(
        &'a self,
        query: &'a SearchQuery,
    ) -> BoxFuture<'a, Result<Vec<RelationshipData>, ResolveError>> {
        Box::pin(async move {
            let delay = if query.term.starts_with("slow") { 500 } else { 10 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(vec![RelationshipData::new(query.term.as_str(), query.term.as_str())])
        })
    }
}

fn editor_with_relationship() -> Editor {
    let relationships = RelationshipRegistry::new().with(RelationshipTarget::new("post", "Post", Delayed));
    let ctx = EditorContext::default()
        .with_relationships(relationships)
        .with_search_debounce(Duration::from_millis(50));
    let mut editor = Editor::new(Document::new(vec![Node::paragraph(vec![Node::text("see ")])]), ctx);
    assert!(editor.select(Point::new(vec![0, 0], 4)));
    assert!(editor.apply(Command::InsertRelationship {
        relationship: "post".into(),
    }));
    editor
}

#[tokio::test(start_paused = true)]
async fn test_search_last_call_wins() {
    let mut editor = editor_with_relationship();
    let picker = editor.open_picker(&Path::new(vec![0, 1])).unwrap();

    let slow = tokio::spawn(picker.search("slow"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    let fast = tokio::spawn(picker.search("fast"));

    assert_eq!(fast.await.unwrap(), SearchOutcome::Applied);
    assert_eq!(slow.await.unwrap(), SearchOutcome::Superseded);

    let state = picker.state();
    assert_eq!(state.term, "fast");
    assert_eq!(state.results[0].id, "fast");

    let again = editor.open_picker(&Path::new(vec![0, 1])).unwrap();
    assert_eq!(again.state(), state);
}

/// Shorter terms take longer, so typing "a", "ab", "abc" resolves in reverse
struct ShorterIsSlower;

impl RelationshipResolver for ShorterIsSlower {
    fn search<'a>(
        &'a self,
        query: &'a SearchQuery,
    ) -> BoxFuture<'a, Result<Vec<RelationshipData>, ResolveError>> {
        Box::pin(async move {
            let delay = match query.term.len() {
                1 => 500,
                2 => 200,
                _ => 10,
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(vec![RelationshipData::new(query.term.as_str(), query.term.as_str())])
        })
    }
}

#[tokio::test(start_paused = true)]
async fn test_search_typed_prefixes_keep_latest() {
    let relationships = RelationshipRegistry::new().with(RelationshipTarget::new("post", "Post", ShorterIsSlower));
    let ctx = EditorContext::default()
        .with_relationships(relationships)
        .with_search_debounce(Duration::from_millis(50));
    let mut editor = Editor::new(Document::new(vec![Node::paragraph(vec![Node::text("see ")])]), ctx);
    assert!(editor.select(Point::new(vec![0, 0], 4)));
    assert!(editor.apply(Command::InsertRelationship {
        relationship: "post".into(),
    }));
    let picker = editor.open_picker(&Path::new(vec![0, 1])).unwrap();

    let a = tokio::spawn(picker.search("a"));
    tokio::time::sleep(Duration::from_millis(60)).await;
    let ab = tokio::spawn(picker.search("ab"));
    tokio::time::sleep(Duration::from_millis(60)).await;
    let abc = tokio::spawn(picker.search("abc"));

    assert_eq!(abc.await.unwrap(), SearchOutcome::Applied);
    assert_eq!(ab.await.unwrap(), SearchOutcome::Superseded);
    assert_eq!(a.await.unwrap(), SearchOutcome::Superseded);

    let state = picker.state();
    assert_eq!(state.term, "abc");
    assert_eq!(state.status, SearchStatus::Ready);
    assert_eq!(state.results.len(), 1);
    assert_eq!(state.results[0].id, "abc");
}

#[tokio::test(start_paused = true)]
async fn test_search_discarded_when_node_removed() {
    let mut editor = editor_with_relationship();
    let picker = editor.open_picker(&Path::new(vec![0, 1])).unwrap();
    let pending = tokio::spawn(picker.search("slow post"));

    assert!(editor.apply(Command::SetRelationship {
        path: Path::new(vec![0, 1]),
        data: None,
    }));
    assert_eq!(pending.await.unwrap(), SearchOutcome::Cancelled);
    assert_eq!(picker.state().status, SearchStatus::Cancelled);
    assert!(picker.state().results.is_empty());
}
