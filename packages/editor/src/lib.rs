//! # Folio Editor
//!
//! Editing engine for structured rich-text documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ folio-model: Document tree, paths, points   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: Document + selection lifecycle      │
//! │  - Normalize on load and after every edit   │
//! │  - Run commands as all-or-nothing edits     │
//! │  - Derive toolbar state per selection       │
//! │  - Insert menu and relationship pickers     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ rendering surface (caller supplied)         │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Tree is source of truth**: feature state and menus are derived views
//! 2. **Commands are atomic**: a failed precondition changes nothing
//! 3. **Selections follow node ids**: structure changes never strand the cursor
//! 4. **Registries are explicit**: components and relationship targets are
//!    passed in per editor
//!
//! ## Usage
//!
//! ```rust,ignore
//! use folio_editor::{Command, Editor, EditorContext};
//! use folio_model::Mark;
//!
//! let mut editor = Editor::from_json(&source, EditorContext::default())?;
//! editor.apply(Command::ToggleMark { mark: Mark::Bold });
//!
//! let state = editor.feature_state();
//! assert!(state.marks[&Mark::Bold].is_selected);
//!
//! let saved = editor.to_json()?;
//! ```

pub mod component;
pub mod config;
mod editor;
mod errors;
pub mod insert_menu;
mod normalize;
pub mod relationship;
pub mod rules;
pub mod state;
mod transforms;
pub mod validate;

pub use config::{FeatureConfig, DEFAULT_CONFIG_NAME};
pub use editor::{Editor, EditorContext};
pub use errors::EditorError;
pub use insert_menu::{InsertCommand, InsertMenu, KeyOutcome, MenuKey};
pub use normalize::normalize_document;
pub use state::{derive_state, FeatureState, ToggleState};
pub use transforms::{BlockType, Command, TransformError, TransformResult};
pub use validate::{check_document, Issue};
