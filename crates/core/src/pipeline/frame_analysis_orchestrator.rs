use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::analysis::domain::analysis_request::AnalysisRequest;
use crate::analysis::domain::analysis_result::{AnalysisResult, FrameAnalysis};
use crate::analysis::domain::tagged_response::parse_response;
use crate::analysis::domain::vision_analyzer::{AnalysisError, VisionAnalyzer};
use crate::analysis::infrastructure::analysis_store::{AnalysisStore, AnalysisStoreError};
use crate::frames::domain::frame_extractor::FrameExtractError;
use crate::frames::domain::frame_sample::{minute_of, minute_start, FrameSample};
use crate::frames::infrastructure::frame_catalog::FrameCatalog;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::artifact_layout::ArtifactLayout;
use crate::shared::cancellation::CancellationToken;
use crate::transcription::domain::transcript_index::TranscriptIndex;
use crate::transcription::infrastructure::transcript_store::{
    TranscriptStore, TranscriptStoreError,
};

#[derive(Error, Debug)]
pub enum FrameAnalysisError {
    #[error(transparent)]
    Transcripts(#[from] TranscriptStoreError),
    #[error(transparent)]
    Frames(#[from] FrameExtractError),
    #[error(transparent)]
    Store(#[from] AnalysisStoreError),
    #[error("no frames found in {0}")]
    NoFrames(PathBuf),
    #[error("start minute {start} is after end minute {end}")]
    InvalidRange { start: u32, end: u32 },
    #[error("minute {0} is beyond the last representable timestamp")]
    MinuteOutOfRange(u32),
    #[error("analysis cancelled during minute {0}")]
    Cancelled(u32),
}

/// Half-open minute range `[start, end)`. An open end is resolved from the
/// latest frame on disk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MinuteRange {
    pub start: u32,
    pub end: Option<u32>,
}

impl MinuteRange {
    pub fn new(start: u32, end: Option<u32>) -> Result<Self, FrameAnalysisError> {
        for minute in std::iter::once(start).chain(end) {
            if minute_start(minute).is_none() {
                return Err(FrameAnalysisError::MinuteOutOfRange(minute));
            }
        }
        if let Some(end) = end {
            if start > end {
                return Err(FrameAnalysisError::InvalidRange { start, end });
            }
        }
        Ok(Self { start, end })
    }
}

/// Lifecycle of one minute (and of each frame within it).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnalysisState {
    Pending,
    Fetching,
    Requesting,
    Parsing,
    Persisted,
    Failed,
}

impl fmt::Display for AnalysisState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisState::Pending => "pending",
            AnalysisState::Fetching => "fetching",
            AnalysisState::Requesting => "requesting",
            AnalysisState::Parsing => "parsing",
            AnalysisState::Persisted => "persisted",
            AnalysisState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tallies for one analysis run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnalysisSummary {
    pub minutes_persisted: Vec<u32>,
    pub minutes_skipped: Vec<u32>,
    pub frames_analysed: usize,
    pub request_failures: usize,
    pub parse_failures: usize,
    pub artifacts: Vec<PathBuf>,
}

impl AnalysisSummary {
    pub fn degraded_frames(&self) -> usize {
        self.request_failures + self.parse_failures
    }
}

#[derive(Clone, Debug)]
pub struct AnalysisOptions {
    pub context_description: String,
    pub context_window_seconds: u32,
    pub request_delay: Duration,
    pub frame_interval_seconds: u32,
}

/// Walks minute batches in increasing order, sends each frame with its
/// transcript context to the vision service, and persists one result array
/// per minute.
///
/// A failed request or unreadable response becomes a placeholder record; it
/// never aborts the minute. Cancellation aborts the current minute without
/// writing it.
pub struct FrameAnalysisOrchestrator {
    analyzer: Box<dyn VisionAnalyzer>,
    options: AnalysisOptions,
}

impl FrameAnalysisOrchestrator {
    pub fn new(analyzer: Box<dyn VisionAnalyzer>, options: AnalysisOptions) -> Self {
        Self { analyzer, options }
    }

    pub fn run(
        &self,
        layout: &ArtifactLayout,
        range: MinuteRange,
        cancel: &CancellationToken,
        logger: &mut dyn PipelineLogger,
    ) -> Result<AnalysisSummary, FrameAnalysisError> {
        let catalog = FrameCatalog::new(layout.clone(), self.options.frame_interval_seconds);
        let end = match range.end {
            Some(end) => end,
            None => {
                let last = catalog
                    .max_timestamp()?
                    .ok_or_else(|| FrameAnalysisError::NoFrames(layout.root().to_path_buf()))?;
                minute_of(last) + 1
            }
        };
        if range.start > end {
            return Err(FrameAnalysisError::InvalidRange {
                start: range.start,
                end,
            });
        }

        let index = TranscriptStore::new(layout.clone()).load_index()?;
        match (index.offsets().next(), index.offsets().last()) {
            (Some(first), Some(last)) => log::info!(
                "Transcript context: {} entries from {first}s to {last}s",
                index.len()
            ),
            _ => log::warn!("No transcript entries found; frames are analysed without context"),
        }
        let store = AnalysisStore::new(layout.clone());
        let mut summary = AnalysisSummary::default();

        let total = (end - range.start) as usize;
        for minute in range.start..end {
            logger.info(&format!("Processing minute {minute}"));
            logger.progress("analysis", (minute - range.start) as usize, total);
            self.analyze_minute(minute, &catalog, &index, &store, cancel, logger, &mut summary)?;
        }
        logger.progress("analysis", total, total);
        Ok(summary)
    }

    #[allow(clippy::too_many_arguments)]
    fn analyze_minute(
        &self,
        minute: u32,
        catalog: &FrameCatalog,
        index: &TranscriptIndex,
        store: &AnalysisStore,
        cancel: &CancellationToken,
        logger: &mut dyn PipelineLogger,
        summary: &mut AnalysisSummary,
    ) -> Result<(), FrameAnalysisError> {
        let mut state = AnalysisState::Pending;
        transition(minute, &mut state, AnalysisState::Fetching);

        let batch = catalog.minute_batch(minute);
        if batch.is_empty() {
            log::warn!("No frames found for minute {minute}");
            summary.minutes_skipped.push(minute);
            return Ok(());
        }

        log::info!(
            "Minute {minute}: {} frames from {}s",
            batch.len(),
            batch.start_seconds()
        );
        let started = Instant::now();
        let mut results = Vec::with_capacity(batch.len());
        for frame in &batch.frames {
            if cancel.is_cancelled() {
                return Err(FrameAnalysisError::Cancelled(minute));
            }
            transition(minute, &mut state, AnalysisState::Requesting);
            let analysis = self.analyze_frame(frame, index, logger, summary);
            results.push(AnalysisResult {
                timestamp: frame.timestamp_seconds,
                frame_path: frame.image_path.display().to_string(),
                analysis,
            });
            summary.frames_analysed += 1;

            if !cancel.sleep(self.options.request_delay) {
                return Err(FrameAnalysisError::Cancelled(minute));
            }
        }

        let path = store.write_minute(minute, &results)?;
        transition(minute, &mut state, AnalysisState::Persisted);
        logger.timing("analysis_minute", started.elapsed().as_secs_f64() * 1000.0);
        log::info!("Saved analysis for minute {minute} to {}", path.display());
        summary.minutes_persisted.push(minute);
        summary.artifacts.push(path);
        Ok(())
    }

    fn analyze_frame(
        &self,
        frame: &FrameSample,
        index: &TranscriptIndex,
        logger: &mut dyn PipelineLogger,
        summary: &mut AnalysisSummary,
    ) -> FrameAnalysis {
        let ts = frame.timestamp_seconds;
        let request = AnalysisRequest {
            timestamp_seconds: ts,
            image_path: frame.image_path.clone(),
            transcript_context: index.context_window(ts, self.options.context_window_seconds),
            context_description: self.options.context_description.clone(),
        };

        let started = Instant::now();
        let parsed = match self.analyzer.analyze(&request) {
            Ok(response) => {
                logger.timing("analysis_request", started.elapsed().as_secs_f64() * 1000.0);
                log::debug!(
                    "Frame {ts}s: {} -> {}",
                    AnalysisState::Requesting,
                    AnalysisState::Parsing
                );
                parse_response(&response).map_err(|e| e.to_string())
            }
            // The service answered but the body could not be decoded.
            Err(AnalysisError::Body(reason)) => Err(reason),
            Err(e) => {
                log::debug!(
                    "Frame {ts}s: {} -> {}",
                    AnalysisState::Requesting,
                    AnalysisState::Failed
                );
                log::error!(
                    "Error analyzing frame at {ts}s after {:.2}s: {e}",
                    started.elapsed().as_secs_f64()
                );
                logger.skipped("analysis_request", &format!("frame {ts}s"), &e.to_string());
                summary.request_failures += 1;
                return FrameAnalysis::request_failed();
            }
        };

        match parsed {
            Ok(analysis) => analysis,
            Err(reason) => {
                log::debug!("Frame {ts}s: {} -> {}", AnalysisState::Parsing, AnalysisState::Failed);
                log::error!("Error parsing response for frame at {ts}s: {reason}");
                logger.skipped("analysis_parse", &format!("frame {ts}s"), &reason);
                summary.parse_failures += 1;
                FrameAnalysis::parse_failed()
            }
        }
    }
}

fn transition(minute: u32, state: &mut AnalysisState, next: AnalysisState) {
    if *state != next {
        log::debug!("Minute {minute}: {state} -> {next}");
        *state = next;
    }
}
