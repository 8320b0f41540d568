//! Document diagnostics for stored documents, before they are normalized

use crate::component::{validate, ComponentRegistry};
use folio_model::{check_structure, walk_node, Document, Node, NodeKind, Path, Violation, Visitor};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "issue", rename_all = "camelCase")]
pub enum Issue {
    Structure(Violation),
    /// Shown as a placeholder and left untouched
    UnknownComponent { path: Path, component: String },
    /// Invalid fields fall back to their defaults when edited
    InvalidProps { path: Path, component: String },
}

impl Issue {
    pub fn path(&self) -> &Path {
        match self {
            Issue::Structure(violation) => &violation.path,
            Issue::UnknownComponent { path, .. } | Issue::InvalidProps { path, .. } => path,
        }
    }

    /// Structural problems are repaired by normalization; the others are not
    pub fn is_structural(&self) -> bool {
        matches!(self, Issue::Structure(_))
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::Structure(violation) => write!(f, "{}: {}", violation.path, violation.kind),
            Issue::UnknownComponent { path, component } => {
                write!(f, "{}: unknown component '{}'", path, component)
            }
            Issue::InvalidProps { path, component } => {
                write!(f, "{}: props do not match the '{}' schema", path, component)
            }
        }
    }
}

struct PropsChecker<'a> {
    components: &'a ComponentRegistry,
    issues: Vec<Issue>,
}

impl Visitor for PropsChecker<'_> {
    fn visit_node(&mut self, path: &Path, node: &Node) {
        if let NodeKind::ComponentBlock { component, props, .. } = &node.kind {
            match self.components.get(component) {
                None => self.issues.push(Issue::UnknownComponent {
                    path: path.clone(),
                    component: component.clone(),
                }),
                Some(definition) if !validate(&definition.schema, props) => {
                    self.issues.push(Issue::InvalidProps {
                        path: path.clone(),
                        component: component.clone(),
                    })
                }
                Some(_) => {}
            }
        }
        walk_node(self, path, node);
    }
}

/// Structure violations followed by component props problems
pub fn check_document(doc: &Document, components: &ComponentRegistry) -> Vec<Issue> {
    let mut issues: Vec<Issue> = check_structure(doc).into_iter().map(Issue::Structure).collect();
    let mut checker = PropsChecker {
        components,
        issues: Vec::new(),
    };
    folio_model::walk_document(&mut checker, doc);
    issues.extend(checker.issues);
    issues
}
