use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use crate::shared::artifact_layout::{parse_transcript_offset, write_atomic, ArtifactLayout};
use crate::transcription::domain::transcript_entry::TranscriptEntry;
use crate::transcription::domain::transcript_index::TranscriptIndex;

#[derive(Error, Debug)]
pub enum TranscriptStoreError {
    #[error("failed to write transcript {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to list transcripts in {path}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reads and writes transcript artifacts inside one output directory.
#[derive(Clone, Debug)]
pub struct TranscriptStore {
    layout: ArtifactLayout,
}

impl TranscriptStore {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self { layout }
    }

    /// Persists one entry as `transcript_<offset>.txt`, replacing any earlier one.
    pub fn write_entry(&self, entry: &TranscriptEntry) -> Result<PathBuf, TranscriptStoreError> {
        let path = self.layout.transcript_path(entry.start_offset_seconds);
        write_atomic(&path, entry.to_artifact().as_bytes()).map_err(|source| {
            TranscriptStoreError::Write {
                path: path.clone(),
                source,
            }
        })?;
        Ok(path)
    }

    /// Loads every transcript artifact in the output directory.
    ///
    /// A missing directory yields an empty index. Unreadable files are
    /// logged and skipped.
    pub fn load_index(&self) -> Result<TranscriptIndex, TranscriptStoreError> {
        let root = self.layout.root();
        if !root.exists() {
            log::warn!("No transcript directory at {}", root.display());
            return Ok(TranscriptIndex::new());
        }
        let dir = fs::read_dir(root).map_err(|source| TranscriptStoreError::List {
            path: root.to_path_buf(),
            source,
        })?;

        let mut index = TranscriptIndex::new();
        for dir_entry in dir.flatten() {
            let name = dir_entry.file_name();
            let Some(offset) = parse_transcript_offset(&name.to_string_lossy()) else {
                continue;
            };
            match fs::read_to_string(dir_entry.path()) {
                Ok(content) => index.insert(TranscriptEntry::from_artifact(offset, &content)),
                Err(e) => log::error!(
                    "Error loading transcript {}: {e}",
                    dir_entry.path().display()
                ),
            }
        }
        log::info!("Loaded {} transcripts from {}", index.len(), root.display());
        Ok(index)
    }

    /// Writes the final transcript: texts in the given order joined by one space.
    pub fn write_final(&self, texts: &[String]) -> Result<PathBuf, TranscriptStoreError> {
        let path = self.layout.final_transcript_path();
        write_atomic(&path, texts.join(" ").as_bytes()).map_err(|source| {
            TranscriptStoreError::Write {
                path: path.clone(),
                source,
            }
        })?;
        Ok(path)
    }
}
