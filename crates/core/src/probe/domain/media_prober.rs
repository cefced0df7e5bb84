use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::media_descriptor::MediaDescriptor;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("failed to launch {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("probe exited with status {status:?}: {stderr}")]
    ToolFailed { status: Option<i32>, stderr: String },
    #[error("probe output is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("probe output has no format.duration")]
    MissingDuration,
    #[error("media duration must be positive, got {0}")]
    InvalidDuration(f64),
    #[error("media has no streams")]
    NoStreams,
    #[error("cannot read size of {path}: {source}")]
    FileSize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Domain interface for inspecting a media file before planning.
pub trait MediaProber: Send + Sync {
    fn probe(&self, path: &Path) -> Result<MediaDescriptor, ProbeError>;
}
