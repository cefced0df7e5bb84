use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use crate::analysis::domain::analysis_result::{AnalysisResult, MinuteAnalysis};
use crate::shared::artifact_layout::{parse_analysis_minute, write_atomic, ArtifactLayout};

#[derive(Error, Debug)]
pub enum AnalysisStoreError {
    #[error("failed to write analysis {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize analysis for minute {minute}: {source}")]
    Serialize {
        minute: u32,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to list analysis results in {path}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Persists one JSON array per minute under `frame_analysis/`.
#[derive(Clone, Debug)]
pub struct AnalysisStore {
    layout: ArtifactLayout,
}

impl AnalysisStore {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self { layout }
    }

    /// Replaces the minute's artifact wholesale with `results`.
    pub fn write_minute(
        &self,
        minute: u32,
        results: &[AnalysisResult],
    ) -> Result<PathBuf, AnalysisStoreError> {
        let dir = self.layout.analysis_dir();
        fs::create_dir_all(&dir).map_err(|source| AnalysisStoreError::Write {
            path: dir.clone(),
            source,
        })?;

        let json = serde_json::to_string_pretty(results)
            .map_err(|source| AnalysisStoreError::Serialize { minute, source })?;
        let path = self.layout.analysis_path(minute);
        write_atomic(&path, json.as_bytes()).map_err(|source| AnalysisStoreError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Every persisted minute, ordered by minute index.
    ///
    /// A missing analysis directory yields nothing; unreadable or malformed
    /// files are logged and skipped.
    pub fn load_all(&self) -> Result<Vec<MinuteAnalysis>, AnalysisStoreError> {
        let dir = self.layout.analysis_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&dir).map_err(|source| AnalysisStoreError::List {
            path: dir.clone(),
            source,
        })?;

        let mut minutes = Vec::new();
        for entry in entries.flatten() {
            let Some(minute_index) = parse_analysis_minute(&entry.file_name().to_string_lossy())
            else {
                continue;
            };
            let path = entry.path();
            let parsed = fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|json| {
                    serde_json::from_str::<Vec<AnalysisResult>>(&json).map_err(|e| e.to_string())
                });
            match parsed {
                Ok(results) => minutes.push(MinuteAnalysis {
                    minute_index,
                    results,
                }),
                Err(e) => log::error!("Error loading {}: {e}", path.display()),
            }
        }
        minutes.sort_by_key(|m| m.minute_index);
        Ok(minutes)
    }
}
