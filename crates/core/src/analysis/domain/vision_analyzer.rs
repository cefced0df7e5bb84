use std::path::PathBuf;

use thiserror::Error;

use super::analysis_request::AnalysisRequest;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("failed to read frame image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("analysis request failed: {0}")]
    Request(String),
    #[error("analysis service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// The service answered with a success status but an undecodable body.
    #[error("analysis response is not valid JSON: {0}")]
    Body(String),
}

/// Domain interface for the multimodal analysis service.
///
/// Returns the raw response body; extracting the tagged sections is a
/// separate step so request failures and parse failures stay distinct.
pub trait VisionAnalyzer: Send {
    fn analyze(&self, request: &AnalysisRequest) -> Result<serde_json::Value, AnalysisError>;
}
