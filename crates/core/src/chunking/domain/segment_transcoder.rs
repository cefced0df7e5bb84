use std::path::Path;

use thiserror::Error;

use super::chunk_plan::SegmentSpan;
use crate::shared::cancellation::CancellationToken;

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("failed to launch transcoder: {0}")]
    Launch(#[source] std::io::Error),
    #[error("transcoder exited with status {status:?}: {stderr}")]
    Failed { status: Option<i32>, stderr: String },
    #[error("transcoding cancelled")]
    Cancelled,
}

/// Target encoding for uploaded segments: mono, narrow speech band, low bit
/// rate, so even dense source audio lands well under the payload ceiling.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentEncoding {
    pub codec: String,
    pub bit_rate: String,
    pub channels: u16,
    pub sample_rate: u32,
    pub filter: String,
    pub extension: String,
}

impl Default for SegmentEncoding {
    fn default() -> Self {
        Self {
            codec: "libmp3lame".to_string(),
            bit_rate: "64k".to_string(),
            channels: 1,
            sample_rate: 22050,
            filter: "highpass=f=200,lowpass=f=3000".to_string(),
            extension: "mp3".to_string(),
        }
    }
}

/// Domain interface for cutting one span of the source into a segment file.
pub trait SegmentTranscoder: Send + Sync {
    fn transcode(
        &self,
        source: &Path,
        span: &SegmentSpan,
        encoding: &SegmentEncoding,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), TranscodeError>;
}
