use anyhow::{Context, Result};
use folio_editor::{EditorContext, FeatureConfig};
use folio_model::Document;
use std::path::Path;
use tracing::debug;

/// Feature configuration from `--config`, or `folio.config.json` in `cwd`
/// when present, or the defaults
pub fn load_context(cwd: &Path, config: Option<&Path>) -> Result<EditorContext> {
    let features = match config {
        Some(path) => FeatureConfig::load_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => FeatureConfig::load(cwd).context("Failed to load folio.config.json")?,
    };
    debug!(?features, "feature config");
    Ok(EditorContext::new(features))
}

pub fn read_document(path: &Path) -> Result<Document> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Document::from_json(&source).with_context(|| format!("{} is not a folio document", path.display()))
}
