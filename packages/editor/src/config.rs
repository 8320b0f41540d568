//! # Feature Configuration
//!
//! Which formatting features an editor instance offers. Everything is on by
//! default; a JSON file can switch features off or change the heading levels
//! and layout presets.

use crate::errors::EditorError;
use folio_model::{ListKind, Mark, TextAlign};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "folio.config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureConfig {
    /// Marks offered in the toolbar
    #[serde(default = "default_marks")]
    pub marks: BTreeSet<Mark>,

    /// Heading levels offered, in display order
    #[serde(default = "default_heading_levels")]
    pub heading_levels: Vec<u8>,

    #[serde(default)]
    pub lists: ListFeatures,

    #[serde(default)]
    pub alignment: AlignmentFeatures,

    #[serde(default = "enabled")]
    pub dividers: bool,

    #[serde(default = "enabled")]
    pub links: bool,

    #[serde(default = "enabled")]
    pub blockquote: bool,

    #[serde(default = "enabled")]
    pub code: bool,

    /// Layout ratio presets; the first one is used for new layouts. An empty
    /// list disables layouts.
    #[serde(default = "default_layouts")]
    pub layouts: Vec<Vec<u32>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFeatures {
    #[serde(default = "enabled")]
    pub ordered: bool,
    #[serde(default = "enabled")]
    pub unordered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentFeatures {
    #[serde(default = "enabled")]
    pub center: bool,
    #[serde(default = "enabled")]
    pub end: bool,
}

fn enabled() -> bool {
    true
}

fn default_marks() -> BTreeSet<Mark> {
    Mark::ALL.into_iter().collect()
}

fn default_heading_levels() -> Vec<u8> {
    (1..=6).collect()
}

fn default_layouts() -> Vec<Vec<u32>> {
    vec![vec![1, 1], vec![1, 1, 1], vec![2, 1], vec![1, 2], vec![1, 2, 1]]
}

impl Default for ListFeatures {
    fn default() -> Self {
        Self {
            ordered: true,
            unordered: true,
        }
    }
}

impl Default for AlignmentFeatures {
    fn default() -> Self {
        Self {
            center: true,
            end: true,
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            marks: default_marks(),
            heading_levels: default_heading_levels(),
            lists: ListFeatures::default(),
            alignment: AlignmentFeatures::default(),
            dividers: true,
            links: true,
            blockquote: true,
            code: true,
            layouts: default_layouts(),
        }
    }
}

impl FeatureConfig {
    /// Plain paragraphs only
    pub fn minimal() -> Self {
        Self {
            marks: BTreeSet::new(),
            heading_levels: Vec::new(),
            lists: ListFeatures {
                ordered: false,
                unordered: false,
            },
            alignment: AlignmentFeatures {
                center: false,
                end: false,
            },
            dividers: false,
            links: false,
            blockquote: false,
            code: false,
            layouts: Vec::new(),
        }
    }

    pub fn from_json(source: &str) -> Result<Self, EditorError> {
        let config: FeatureConfig = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `folio.config.json` from a directory, falling back to defaults
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, EditorError> {
        let path: PathBuf = dir.as_ref().join(DEFAULT_CONFIG_NAME);
        if path.exists() {
            Self::load_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_file(path: &Path) -> Result<Self, EditorError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    fn validate(&self) -> Result<(), EditorError> {
        if let Some(level) = self.heading_levels.iter().find(|l| !(1..=6).contains(*l)) {
            return Err(EditorError::Config(format!(
                "heading level {} is outside 1-6",
                level
            )));
        }
        if let Some(preset) = self
            .layouts
            .iter()
            .find(|preset| preset.is_empty() || preset.contains(&0))
        {
            return Err(EditorError::Config(format!(
                "layout preset {:?} must be non-empty with positive ratios",
                preset
            )));
        }
        Ok(())
    }

    pub fn allows_mark(&self, mark: Mark) -> bool {
        self.marks.contains(&mark)
    }

    pub fn allows_heading(&self, level: u8) -> bool {
        self.heading_levels.contains(&level)
    }

    pub fn allows_list(&self, kind: ListKind) -> bool {
        match kind {
            ListKind::Ordered => self.lists.ordered,
            ListKind::Unordered => self.lists.unordered,
        }
    }

    /// `None` is start alignment, which is always available
    pub fn allows_alignment(&self, align: Option<TextAlign>) -> bool {
        match align {
            None => true,
            Some(TextAlign::Center) => self.alignment.center,
            Some(TextAlign::End) => self.alignment.end,
        }
    }

    pub fn any_alignment(&self) -> bool {
        self.alignment.center || self.alignment.end
    }

    /// Ratios used by a new layout
    pub fn default_layout(&self) -> Option<&Vec<u32>> {
        self.layouts.first()
    }
}
