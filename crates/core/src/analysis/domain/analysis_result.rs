use serde::{Deserialize, Serialize};

pub const NO_FRAME_DETAILS: &str = "No frame details found";
pub const NO_CONNECTIONS: &str = "No audio-visual connections found";
pub const PARSING_ERROR: &str = "Parsing error";
pub const ANALYSIS_FAILED: &str = "Analysis failed";

/// The two sections extracted from one model response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    pub frames: String,
    pub audio_visual_connections: String,
}

impl FrameAnalysis {
    pub fn new(frames: impl Into<String>, audio_visual_connections: impl Into<String>) -> Self {
        Self {
            frames: frames.into(),
            audio_visual_connections: audio_visual_connections.into(),
        }
    }

    /// Placeholder recorded when the request itself failed.
    pub fn request_failed() -> Self {
        Self::new(ANALYSIS_FAILED, ANALYSIS_FAILED)
    }

    /// Placeholder recorded when the response could not be read.
    pub fn parse_failed() -> Self {
        Self::new(PARSING_ERROR, PARSING_ERROR)
    }
}

/// One analysed frame as persisted in `analysis_minute_<m>.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub timestamp: u32,
    pub frame_path: String,
    pub analysis: FrameAnalysis,
}

/// All results of one minute, in frame order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinuteAnalysis {
    pub minute_index: u32,
    pub results: Vec<AnalysisResult>,
}
