use std::path::{Path, PathBuf};

use thiserror::Error;

use super::frame_sample::FrameSample;
use crate::shared::artifact_layout::ArtifactLayout;
use crate::shared::cancellation::CancellationToken;

#[derive(Error, Debug)]
pub enum FrameExtractError {
    #[error("failed to open video {path}: {message}")]
    Open { path: PathBuf, message: String },
    #[error("no video stream in {0}")]
    NoVideoStream(PathBuf),
    #[error("failed to decode video: {0}")]
    Decode(String),
    #[error("failed to write frame {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to list frames in {path}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("frame extraction cancelled")]
    Cancelled,
}

/// Domain interface for sampling stills from a video at a fixed interval.
///
/// Implementations write `frame_<seconds>.jpg` into the layout's root and
/// return the samples written, ascending by timestamp.
pub trait FrameExtractor: Send {
    fn extract(
        &self,
        video: &Path,
        interval_seconds: u32,
        layout: &ArtifactLayout,
        cancel: &CancellationToken,
    ) -> Result<Vec<FrameSample>, FrameExtractError>;
}
