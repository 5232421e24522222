use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenogramError {
    #[error("invalid genogram JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid editor config: {0}")]
    InvalidConfig(String),
    #[error("document is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("{collection} entry `{key}` holds an entity with id `{id}`")]
    IdMismatch {
        collection: &'static str,
        key: String,
        id: String,
    },
}

impl GenogramError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GenogramError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, GenogramError>;
