use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("failed to read audio segment {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("transcription request failed: {0}")]
    Request(String),
    #[error("transcription service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected transcription response: {0}")]
    Response(String),
    #[error("transcription cancelled")]
    Cancelled,
}

/// Domain interface for remote speech-to-text.
///
/// Implementations upload one bounded audio artifact and return its plain
/// text. Language and prompt are fixed per recognizer, not per call.
pub trait SpeechRecognizer: Send + Sync {
    fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError>;
}
