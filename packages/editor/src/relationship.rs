//! # Relationship Embedding
//!
//! A relationship node is a void inline bound to one external record. Records
//! are found through a caller-supplied [`RelationshipResolver`]; the editor
//! never talks to a backend itself.
//!
//! ## Search semantics
//!
//! [`RelationshipPicker::search`] registers the call immediately (bumping a
//! generation counter) and returns a future that waits out the debounce
//! before asking the resolver. A result is only applied if no newer search
//! and no cancellation happened in the meantime, so results that arrive out
//! of order never overwrite newer ones. The editor cancels a picker when its
//! node disappears from the document.

use folio_model::RelationshipData;
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("Search failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub term: String,
    /// Record attributes the term may match
    pub attributes: Vec<String>,
}

/// Looks up records for a relationship target
pub trait RelationshipResolver: Send + Sync {
    fn search<'a>(
        &'a self,
        query: &'a SearchQuery,
    ) -> BoxFuture<'a, Result<Vec<RelationshipData>, ResolveError>>;
}

/// Resolver over a fixed record set; matches the term case-insensitively
/// against the label and the searchable attributes of `data`
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    records: Vec<RelationshipData>,
}

impl StaticResolver {
    pub fn new(records: Vec<RelationshipData>) -> Self {
        Self { records }
    }

    fn matches(record: &RelationshipData, query: &SearchQuery) -> bool {
        let term = query.term.to_lowercase();
        if term.is_empty() {
            return true;
        }
        let label_match = record
            .label
            .as_deref()
            .map_or(false, |label| label.to_lowercase().contains(&term));
        label_match
            || query.attributes.iter().any(|attribute| {
                record.data[attribute.as_str()]
                    .as_str()
                    .map_or(false, |value| value.to_lowercase().contains(&term))
            })
    }
}

impl RelationshipResolver for StaticResolver {
    fn search<'a>(
        &'a self,
        query: &'a SearchQuery,
    ) -> BoxFuture<'a, Result<Vec<RelationshipData>, ResolveError>> {
        let results: Vec<RelationshipData> = self
            .records
            .iter()
            .filter(|record| Self::matches(record, query))
            .cloned()
            .collect();
        Box::pin(futures::future::ready(Ok::<_, ResolveError>(results)))
    }
}

/// A kind of external record that can be embedded
pub struct RelationshipTarget {
    pub key: String,
    pub label: String,
    pub searchable_attributes: Vec<String>,
    resolver: Arc<dyn RelationshipResolver>,
}

impl fmt::Debug for RelationshipTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationshipTarget")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("searchable_attributes", &self.searchable_attributes)
            .finish_non_exhaustive()
    }
}

impl RelationshipTarget {
    pub fn new(key: &str, label: &str, resolver: impl RelationshipResolver + 'static) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            searchable_attributes: Vec::new(),
            resolver: Arc::new(resolver),
        }
    }

    pub fn with_attributes(mut self, attributes: &[&str]) -> Self {
        self.searchable_attributes = attributes.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn resolver(&self) -> &Arc<dyn RelationshipResolver> {
        &self.resolver
    }
}

#[derive(Debug, Clone, Default)]
pub struct RelationshipRegistry {
    targets: BTreeMap<String, Arc<RelationshipTarget>>,
}

impl RelationshipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, target: RelationshipTarget) -> &mut Self {
        self.targets.insert(target.key.clone(), Arc::new(target));
        self
    }

    pub fn with(mut self, target: RelationshipTarget) -> Self {
        self.register(target);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Arc<RelationshipTarget>> {
        self.targets.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<RelationshipTarget>> {
        self.targets.values()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchStatus {
    Idle,
    Loading,
    Ready,
    /// Resolver error; results are empty and the search can be retried
    Failed { message: String },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickerState {
    pub term: String,
    pub status: SearchStatus,
    pub results: Vec<RelationshipData>,
}

impl PickerState {
    pub fn can_retry(&self) -> bool {
        matches!(self.status, SearchStatus::Failed { .. })
    }
}

/// How one search call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Results were stored
    Applied,
    /// A newer search was started before this one finished
    Superseded,
    Cancelled,
    Failed,
}

struct PickerInner {
    target: Arc<RelationshipTarget>,
    debounce: Duration,
    generation: AtomicU64,
    cancelled: AtomicBool,
    state: Mutex<PickerState>,
}

impl PickerInner {
    fn state(&self) -> MutexGuard<'_, PickerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Why a search of `generation` must not apply its result, if it must not
    fn superseded(&self, generation: u64) -> Option<SearchOutcome> {
        if self.cancelled.load(Ordering::SeqCst) {
            Some(SearchOutcome::Cancelled)
        } else if self.generation.load(Ordering::SeqCst) != generation {
            Some(SearchOutcome::Superseded)
        } else {
            None
        }
    }
}

/// Search state for one relationship node. Clones share the same state.
#[derive(Clone)]
pub struct RelationshipPicker {
    inner: Arc<PickerInner>,
}

impl fmt::Debug for RelationshipPicker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationshipPicker")
            .field("target", &self.inner.target.key)
            .field("state", &self.state())
            .finish()
    }
}

impl RelationshipPicker {
    pub fn new(target: Arc<RelationshipTarget>) -> Self {
        Self::with_debounce(target, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(target: Arc<RelationshipTarget>, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(PickerInner {
                target,
                debounce,
                generation: AtomicU64::new(0),
                cancelled: AtomicBool::new(false),
                state: Mutex::new(PickerState {
                    term: String::new(),
                    status: SearchStatus::Idle,
                    results: Vec::new(),
                }),
            }),
        }
    }

    pub fn target(&self) -> &RelationshipTarget {
        &self.inner.target
    }

    pub fn state(&self) -> PickerState {
        self.inner.state().clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Start a search for `term`. Any search started earlier is superseded
    /// as of this call, even if its future is still pending.
    pub fn search(&self, term: impl Into<String>) -> impl Future<Output = SearchOutcome> + Send + 'static {
        let term = term.into();
        let inner = Arc::clone(&self.inner);
        // generations only move while the state lock is held
        let generation = {
            let mut state = inner.state();
            let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            if !inner.cancelled.load(Ordering::SeqCst) {
                state.term = term.clone();
                state.status = SearchStatus::Loading;
            }
            generation
        };

        async move {
            tokio::time::sleep(inner.debounce).await;
            if let Some(outcome) = inner.superseded(generation) {
                return outcome;
            }

            let query = SearchQuery {
                term,
                attributes: inner.target.searchable_attributes.clone(),
            };
            debug!(relationship = %inner.target.key, term = %query.term, generation, "resolving");
            let result = inner.target.resolver.search(&query).await;

            let mut state = inner.state();
            if let Some(outcome) = inner.superseded(generation) {
                debug!(relationship = %inner.target.key, generation, ?outcome, "discarding results");
                return outcome;
            }

            match result {
                Ok(results) => {
                    debug!(relationship = %inner.target.key, count = results.len(), "results ready");
                    state.results = results;
                    state.status = SearchStatus::Ready;
                    SearchOutcome::Applied
                }
                Err(e) => {
                    warn!(relationship = %inner.target.key, error = %e, "relationship search failed");
                    state.results.clear();
                    state.status = SearchStatus::Failed {
                        message: e.to_string(),
                    };
                    SearchOutcome::Failed
                }
            }
        }
    }

    /// Search the last term again
    pub fn retry(&self) -> impl Future<Output = SearchOutcome> + Send + 'static {
        let term = self.inner.state().term.clone();
        self.search(term)
    }

    /// Drop all pending results; later searches resolve as cancelled
    pub fn cancel(&self) {
        let mut state = self.inner.state();
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        state.status = SearchStatus::Cancelled;
        state.results.clear();
    }
}
