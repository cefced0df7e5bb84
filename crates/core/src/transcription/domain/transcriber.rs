use std::time::Instant;

use super::speech_recognizer::{SpeechRecognizer, TranscriptionError};
use super::transcript_entry::TranscriptEntry;
use crate::chunking::domain::audio_segment::AudioSegment;
use crate::shared::cancellation::CancellationToken;
use crate::shared::progress_counter::ProgressCounter;

/// Result of transcribing one segment under the best-effort policy: the entry
/// is always produced, with empty text when `failure` is set.
#[derive(Debug)]
pub struct TranscriptionOutcome {
    pub entry: TranscriptEntry,
    pub failure: Option<TranscriptionError>,
}

impl TranscriptionOutcome {
    pub fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }
}

/// Turns audio segments into transcript entries, counting completions
/// across concurrent workers.
pub struct Transcriber<'a> {
    recognizer: &'a dyn SpeechRecognizer,
    progress: ProgressCounter,
}

impl<'a> Transcriber<'a> {
    pub fn new(recognizer: &'a dyn SpeechRecognizer, total_segments: usize) -> Self {
        Self {
            recognizer,
            progress: ProgressCounter::new("Transcription", total_segments),
        }
    }

    pub fn completed(&self) -> usize {
        self.progress.completed()
    }

    /// Transcribes one segment. Failures are logged and yield empty text;
    /// only successes advance the completed count.
    pub fn transcribe(
        &self,
        segment: &AudioSegment,
        cancel: &CancellationToken,
    ) -> TranscriptionOutcome {
        let start = segment.offset_seconds();
        let end = segment.span().end_seconds().round() as u32;

        if cancel.is_cancelled() {
            return TranscriptionOutcome {
                entry: TranscriptEntry::new(start, end, ""),
                failure: Some(TranscriptionError::Cancelled),
            };
        }

        let started = Instant::now();
        match self.recognizer.transcribe(segment.artifact_path()) {
            Ok(text) => {
                self.progress.increment();
                log::debug!(
                    "Segment {} ({:.1}s from {:.1}s) transcribed in {:.2}s",
                    segment.index(),
                    segment.duration_seconds(),
                    segment.start_seconds(),
                    started.elapsed().as_secs_f64()
                );
                TranscriptionOutcome {
                    entry: TranscriptEntry::new(start, end, text),
                    failure: None,
                }
            }
            Err(e) => {
                log::error!(
                    "Error transcribing segment {} ({start}s) after {:.2}s: {e}",
                    segment.index(),
                    started.elapsed().as_secs_f64()
                );
                TranscriptionOutcome {
                    entry: TranscriptEntry::new(start, end, ""),
                    failure: Some(e),
                }
            }
        }
    }
}
