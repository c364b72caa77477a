use std::path::PathBuf;

use thiserror::Error;

/// Fatal pipeline failures. Per-row problems never surface here; they are
/// counted as skipped records at the ingestion boundary.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("data source unavailable: {0}")]
    SourceUnavailable(String),

    #[error(
        "{table} table is missing required columns {missing:?}; available columns: {available:?}"
    )]
    SchemaMismatch {
        table: &'static str,
        missing: Vec<&'static str>,
        available: Vec<String>,
    },

    #[error("no persisted document at {}", .0.display())]
    MissingOutputFile(PathBuf),

    #[error("persisted document {} is malformed: {reason}", .path.display())]
    MalformedDocument { path: PathBuf, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialize document: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PipelineError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
