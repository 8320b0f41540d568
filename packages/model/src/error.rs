use crate::path::Path;
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid point: {0}")]
    InvalidPoint(String),

    #[error("Node not found at {0}")]
    NodeNotFound(Path),

    #[error("Node at {0} cannot have children")]
    NotAContainer(Path),
}

impl ModelError {
    pub fn invalid_path(message: impl Into<String>) -> Self {
        Self::InvalidPath(message.into())
    }

    pub fn invalid_point(message: impl Into<String>) -> Self {
        Self::InvalidPoint(message.into())
    }
}
