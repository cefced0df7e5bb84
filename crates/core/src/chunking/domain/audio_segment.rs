use std::path::{Path, PathBuf};

use super::chunk_plan::SegmentSpan;

/// A transcoded slice of the source audio waiting to be transcribed.
///
/// The artifact belongs to the run that produced it and is deleted once the
/// segment has been consumed, whether or not transcription succeeded.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSegment {
    span: SegmentSpan,
    artifact_path: PathBuf,
    size_bytes: u64,
}

impl AudioSegment {
    pub fn new(span: SegmentSpan, artifact_path: PathBuf, size_bytes: u64) -> Self {
        Self {
            span,
            artifact_path,
            size_bytes,
        }
    }

    pub fn index(&self) -> usize {
        self.span.index
    }

    pub fn start_seconds(&self) -> f64 {
        self.span.start_seconds
    }

    pub fn duration_seconds(&self) -> f64 {
        self.span.duration_seconds
    }

    pub fn offset_seconds(&self) -> u32 {
        self.span.offset_seconds()
    }

    pub fn span(&self) -> &SegmentSpan {
        &self.span
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Removes the artifact from disk. A file that is already gone is not an error.
    pub fn discard(self) {
        remove_artifact(&self.artifact_path);
    }
}

/// Deletes a segment artifact, logging anything other than "not found".
pub fn remove_artifact(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove segment {}: {e}", path.display()),
    }
}
