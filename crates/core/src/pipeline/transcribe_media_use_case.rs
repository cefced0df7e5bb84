use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;

use crate::chunking::domain::audio_segment::AudioSegment;
use crate::chunking::domain::chunk_plan::{ChunkPlanner, PlanError, SegmentSpan};
use crate::chunking::domain::segment_splitter::{SegmentError, SegmentSplitter, SplitTarget};
use crate::execution::worker_pool::{TaskOutcome, WorkerPool};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::probe::domain::media_prober::{MediaProber, ProbeError};
use crate::shared::artifact_layout::ArtifactLayout;
use crate::shared::cancellation::CancellationToken;
use crate::shared::progress_counter::ProgressCounter;
use crate::transcription::domain::speech_recognizer::{SpeechRecognizer, TranscriptionError};
use crate::transcription::domain::transcriber::{Transcriber, TranscriptionOutcome};
use crate::transcription::infrastructure::transcript_store::{
    TranscriptStore, TranscriptStoreError,
};

#[derive(Error, Debug)]
pub enum TranscribeMediaError {
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("failed to prepare working directory {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Store(#[from] TranscriptStoreError),
    #[error("transcription cancelled")]
    Cancelled,
}

/// Worker counts for the two pools.
#[derive(Clone, Debug)]
pub struct TranscribeMediaConfig {
    pub split_workers: usize,
    pub transcribe_workers: usize,
}

/// What a transcription run produced and which units it had to degrade.
#[derive(Clone, Debug, PartialEq)]
pub struct TranscriptionReport {
    pub planned_segments: usize,
    pub split_failures: Vec<usize>,
    pub transcription_failures: Vec<usize>,
    pub transcript_paths: Vec<PathBuf>,
    pub final_transcript: PathBuf,
}

impl TranscriptionReport {
    pub fn degraded_segments(&self) -> usize {
        self.split_failures.len() + self.transcription_failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.degraded_segments() == 0
    }
}

/// Probe, plan, split and transcribe one recording, then write the final
/// transcript.
///
/// Splitting and transcription run on separate bounded pools. A segment that
/// fails either step contributes an empty string to the final transcript at
/// its position; the run carries on.
pub struct TranscribeMediaUseCase {
    prober: Box<dyn MediaProber>,
    planner: ChunkPlanner,
    splitter: SegmentSplitter,
    recognizer: Box<dyn SpeechRecognizer>,
    config: TranscribeMediaConfig,
}

impl TranscribeMediaUseCase {
    pub fn new(
        prober: Box<dyn MediaProber>,
        planner: ChunkPlanner,
        splitter: SegmentSplitter,
        recognizer: Box<dyn SpeechRecognizer>,
        config: TranscribeMediaConfig,
    ) -> Self {
        Self {
            prober,
            planner,
            splitter,
            recognizer,
            config,
        }
    }

    pub fn run(
        &self,
        source: &Path,
        layout: &ArtifactLayout,
        cancel: &CancellationToken,
        logger: &mut dyn PipelineLogger,
    ) -> Result<TranscriptionReport, TranscribeMediaError> {
        let root = layout.root();
        std::fs::create_dir_all(root).map_err(|source| TranscribeMediaError::Workspace {
            path: root.to_path_buf(),
            source,
        })?;

        let started = Instant::now();
        let media = self.prober.probe(source)?;
        logger.timing("probe", elapsed_ms(started));
        logger.info(&format!(
            "Duration: {:.2}s, bit rate: {:.0} bps",
            media.duration_seconds, media.bit_rate_bps
        ));

        let plan = self.planner.plan(&media)?;
        let spans = plan.spans();
        logger.info(&format!(
            "Splitting into {} segments of up to {:.2}s",
            plan.total_chunks, plan.chunk_duration_seconds
        ));

        let workspace = tempfile::Builder::new()
            .prefix(".segments-")
            .tempdir_in(root)
            .map_err(|source| TranscribeMediaError::Workspace {
                path: root.to_path_buf(),
                source,
            })?;

        let segments = self.split_all(
            source,
            workspace.path(),
            plan.max_chunk_bytes,
            &spans,
            cancel,
            logger,
        );
        let split_ok: Vec<usize> = segments.iter().map(AudioSegment::index).collect();
        let split_failures: Vec<usize> = spans
            .iter()
            .map(|s| s.index)
            .filter(|i| !split_ok.contains(i))
            .collect();

        if cancel.is_cancelled() {
            return Err(TranscribeMediaError::Cancelled);
        }

        let store = TranscriptStore::new(layout.clone());
        let transcribed = self.transcribe_all(segments, &store, cancel, logger)?;

        if cancel.is_cancelled() {
            return Err(TranscribeMediaError::Cancelled);
        }

        let mut texts = vec![String::new(); spans.len()];
        let mut transcript_paths = Vec::new();
        let mut recognised = Vec::new();
        for (index, outcome, path) in transcribed {
            if !outcome.is_degraded() {
                recognised.push(index);
            }
            texts[index] = outcome.entry.text;
            transcript_paths.push(path);
        }
        let transcription_failures: Vec<usize> = split_ok
            .into_iter()
            .filter(|i| !recognised.contains(i))
            .collect();

        let final_transcript = store.write_final(&texts)?;
        logger.info(&format!("Transcription saved to {}", final_transcript.display()));

        if let Err(e) = workspace.close() {
            log::warn!("Failed to remove segment directory: {e}");
        }

        Ok(TranscriptionReport {
            planned_segments: spans.len(),
            split_failures,
            transcription_failures,
            transcript_paths,
            final_transcript,
        })
    }

    fn split_all(
        &self,
        source: &Path,
        work_dir: &Path,
        max_chunk_bytes: u64,
        spans: &[SegmentSpan],
        cancel: &CancellationToken,
        logger: &mut dyn PipelineLogger,
    ) -> Vec<AudioSegment> {
        let target = SplitTarget {
            source,
            work_dir,
            max_chunk_bytes,
        };
        let progress = ProgressCounter::new("Split", spans.len());
        let pool = WorkerPool::new("split", self.config.split_workers);
        logger.info(&format!(
            "Splitting {} segments on {} workers",
            spans.len(),
            pool.max_workers()
        ));

        let started = Instant::now();
        let tasks: Vec<_> = spans
            .iter()
            .map(|span| {
                let target = &target;
                let progress = &progress;
                move || -> Result<AudioSegment, SegmentError> {
                    let segment = self.splitter.split(target, span, cancel)?;
                    progress.increment();
                    Ok(segment)
                }
            })
            .collect();
        let outcomes = pool.run(tasks, cancel);
        logger.timing("split", elapsed_ms(started));

        let mut segments = Vec::new();
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                TaskOutcome::Succeeded(segment) => segments.push(segment),
                TaskOutcome::Failed(e) => {
                    logger.skipped("split", &format!("segment {index}"), &e.to_string())
                }
                TaskOutcome::Panicked(msg) => {
                    logger.skipped("split", &format!("segment {index}"), &msg)
                }
                TaskOutcome::Abandoned => {
                    logger.skipped("split", &format!("segment {index}"), "cancelled")
                }
            }
            logger.progress("split", index + 1, spans.len());
        }
        segments
    }

    /// Transcribes every segment, writing each transcript artifact as soon as
    /// it is ready. Returns `(segment index, outcome, artifact path)` per
    /// transcribed segment.
    fn transcribe_all(
        &self,
        segments: Vec<AudioSegment>,
        store: &TranscriptStore,
        cancel: &CancellationToken,
        logger: &mut dyn PipelineLogger,
    ) -> Result<Vec<(usize, TranscriptionOutcome, PathBuf)>, TranscribeMediaError> {
        let total = segments.len();
        let indices: Vec<usize> = segments.iter().map(AudioSegment::index).collect();
        let transcriber = Transcriber::new(&*self.recognizer, total);
        let pool = WorkerPool::new("transcribe", self.config.transcribe_workers);
        logger.info(&format!(
            "Transcribing {total} segments on {} workers",
            pool.max_workers()
        ));

        let started = Instant::now();
        let tasks: Vec<_> = segments
            .into_iter()
            .map(|segment| {
                let transcriber = &transcriber;
                move || -> Result<(TranscriptionOutcome, Option<PathBuf>), TranscriptStoreError> {
                    let outcome = transcriber.transcribe(&segment, cancel);
                    segment.discard();
                    // A cancelled segment leaves no artifact behind.
                    if matches!(outcome.failure, Some(TranscriptionError::Cancelled)) {
                        return Ok((outcome, None));
                    }
                    let path = store.write_entry(&outcome.entry)?;
                    Ok((outcome, Some(path)))
                }
            })
            .collect();
        let outcomes = pool.run(tasks, cancel);
        logger.timing("transcribe", elapsed_ms(started));

        let mut transcribed = Vec::with_capacity(total);
        for (outcome, index) in outcomes.into_iter().zip(indices) {
            let unit = format!("segment {index}");
            match outcome {
                TaskOutcome::Succeeded((_, None)) => return Err(TranscribeMediaError::Cancelled),
                TaskOutcome::Succeeded((outcome, Some(path))) => {
                    if let Some(failure) = &outcome.failure {
                        logger.skipped("transcribe", &unit, &failure.to_string());
                    }
                    transcribed.push((index, outcome, path));
                }
                TaskOutcome::Failed(e) => return Err(e.into()),
                TaskOutcome::Panicked(msg) => logger.skipped("transcribe", &unit, &msg),
                TaskOutcome::Abandoned => return Err(TranscribeMediaError::Cancelled),
            }
        }
        logger.info(&format!(
            "Transcribed {}/{} segments",
            transcriber.completed(),
            total
        ));
        Ok(transcribed)
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::domain::segment_transcoder::{
        SegmentEncoding, SegmentTranscoder, TranscodeError,
    };
    use crate::pipeline::pipeline_logger::{NullPipelineLogger, StdoutPipelineLogger};
    use crate::shared::media_descriptor::MediaDescriptor;
    use tempfile::TempDir;

    struct StubProber {
        duration: f64,
        bit_rate: f64,
    }

    impl MediaProber for StubProber {
        fn probe(&self, path: &Path) -> Result<MediaDescriptor, ProbeError> {
            Ok(MediaDescriptor {
                duration_seconds: self.duration,
                bit_rate_bps: self.bit_rate,
                file_size_bytes: 0,
                source_path: Some(path.to_path_buf()),
            })
        }
    }

    /// Writes `segment <index>` as the artifact; fails for `fail_index`.
    struct StubTranscoder {
        fail_index: Option<usize>,
    }

    impl SegmentTranscoder for StubTranscoder {
        fn transcode(
            &self,
            _source: &Path,
            span: &SegmentSpan,
            _encoding: &SegmentEncoding,
            output: &Path,
            _cancel: &CancellationToken,
        ) -> Result<(), TranscodeError> {
            if Some(span.index) == self.fail_index {
                return Err(TranscodeError::Failed {
                    status: Some(1),
                    stderr: "corrupt input".to_string(),
                });
            }
            std::fs::write(output, format!("segment {}", span.index)).unwrap();
            Ok(())
        }
    }

    /// Echoes the artifact's content; fails when it names `fail_index`.
    struct EchoRecognizer {
        fail_index: Option<usize>,
    }

    impl SpeechRecognizer for EchoRecognizer {
        fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
            let content = std::fs::read_to_string(audio_path).unwrap();
            if let Some(i) = self.fail_index {
                if content == format!("segment {i}") {
                    return Err(TranscriptionError::Request("timed out".to_string()));
                }
            }
            Ok(format!("text of {content}"))
        }
    }

    /// 500 s at 80 bps with a 1000-byte ceiling gives five 100 s segments.
    fn use_case(
        duration: f64,
        split_fail: Option<usize>,
        recognize_fail: Option<usize>,
    ) -> TranscribeMediaUseCase {
        TranscribeMediaUseCase::new(
            Box::new(StubProber {
                duration,
                bit_rate: 80.0,
            }),
            ChunkPlanner::new(1000, 1.0).unwrap(),
            SegmentSplitter::new(
                Box::new(StubTranscoder {
                    fail_index: split_fail,
                }),
                SegmentEncoding::default(),
            ),
            Box::new(EchoRecognizer {
                fail_index: recognize_fail,
            }),
            TranscribeMediaConfig {
                split_workers: 4,
                transcribe_workers: 2,
            },
        )
    }

    fn leftover_segment_dirs(root: &Path) -> usize {
        std::fs::read_dir(root)
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().starts_with(".segments-"))
            .count()
    }

    #[test]
    fn test_single_segment_transcript_is_unmodified() {
        let tmp = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(tmp.path().join("output_talk"));
        let uc = TranscribeMediaUseCase::new(
            Box::new(StubProber {
                duration: 185.0,
                bit_rate: 64_000.0,
            }),
            ChunkPlanner::default(),
            SegmentSplitter::new(
                Box::new(StubTranscoder { fail_index: None }),
                SegmentEncoding::default(),
            ),
            Box::new(EchoRecognizer { fail_index: None }),
            TranscribeMediaConfig {
                split_workers: 4,
                transcribe_workers: 2,
            },
        );

        let report = uc
            .run(Path::new("talk.mp3"), &layout, &CancellationToken::new(), &mut NullPipelineLogger)
            .unwrap();

        assert_eq!(report.planned_segments, 1);
        assert!(report.is_complete());
        assert_eq!(
            std::fs::read_to_string(&report.final_transcript).unwrap(),
            "text of segment 0"
        );
        assert_eq!(
            std::fs::read_to_string(layout.transcript_path(0)).unwrap(),
            "[0s - 185s]\ntext of segment 0"
        );
    }

    #[test]
    fn test_split_failure_leaves_gap_and_run_continues() {
        let tmp = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(tmp.path());
        let mut logger = StdoutPipelineLogger::default();

        let report = use_case(500.0, Some(1), None)
            .run(Path::new("talk.mp3"), &layout, &CancellationToken::new(), &mut logger)
            .unwrap();

        assert_eq!(report.planned_segments, 5);
        assert_eq!(report.split_failures, vec![1]);
        assert!(report.transcription_failures.is_empty());
        assert_eq!(report.transcript_paths.len(), 4);
        assert!(!layout.transcript_path(100).exists());
        assert_eq!(
            std::fs::read_to_string(&report.final_transcript).unwrap(),
            "text of segment 0  text of segment 2 text of segment 3 text of segment 4"
        );
        assert_eq!(logger.skipped_for("split").unwrap(), ["segment 1".to_string()]);
        assert_eq!(leftover_segment_dirs(tmp.path()), 0);
    }

    #[test]
    fn test_transcription_failure_is_empty_text_with_artifact() {
        let tmp = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(tmp.path());

        let report = use_case(500.0, None, Some(3))
            .run(Path::new("talk.mp3"), &layout, &CancellationToken::new(), &mut NullPipelineLogger)
            .unwrap();

        assert_eq!(report.transcription_failures, vec![3]);
        assert_eq!(report.degraded_segments(), 1);
        assert_eq!(
            std::fs::read_to_string(layout.transcript_path(300)).unwrap(),
            "[300s - 400s]\n"
        );
        let final_text = std::fs::read_to_string(&report.final_transcript).unwrap();
        assert!(final_text.contains("text of segment 2  text of segment 4"));
    }

    #[test]
    fn test_last_segment_is_clipped() {
        let tmp = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(tmp.path());

        use_case(450.0, None, None)
            .run(Path::new("talk.mp3"), &layout, &CancellationToken::new(), &mut NullPipelineLogger)
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(layout.transcript_path(400)).unwrap(),
            "[400s - 450s]\ntext of segment 4"
        );
    }

    #[test]
    fn test_probe_failure_is_fatal() {
        struct FailingProber;
        impl MediaProber for FailingProber {
            fn probe(&self, _path: &Path) -> Result<MediaDescriptor, ProbeError> {
                Err(ProbeError::MissingDuration)
            }
        }

        let tmp = TempDir::new().unwrap();
        let uc = TranscribeMediaUseCase::new(
            Box::new(FailingProber),
            ChunkPlanner::default(),
            SegmentSplitter::new(
                Box::new(StubTranscoder { fail_index: None }),
                SegmentEncoding::default(),
            ),
            Box::new(EchoRecognizer { fail_index: None }),
            TranscribeMediaConfig {
                split_workers: 1,
                transcribe_workers: 1,
            },
        );
        let result = uc.run(
            Path::new("talk.mp3"),
            &ArtifactLayout::new(tmp.path()),
            &CancellationToken::new(),
            &mut NullPipelineLogger,
        );
        assert!(matches!(result, Err(TranscribeMediaError::Probe(_))));
    }

    #[test]
    fn test_segment_cancelled_mid_transcription_writes_no_artifact() {
        /// Cancels the run while recognising the segment that names `at`.
        struct CancellingRecognizer {
            token: CancellationToken,
            at: usize,
        }

        impl SpeechRecognizer for CancellingRecognizer {
            fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
                let content = std::fs::read_to_string(audio_path).unwrap();
                if content == format!("segment {}", self.at) {
                    self.token.cancel();
                    return Err(TranscriptionError::Cancelled);
                }
                Ok(format!("text of {content}"))
            }
        }

        let tmp = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(tmp.path());
        let token = CancellationToken::new();
        let uc = TranscribeMediaUseCase::new(
            Box::new(StubProber {
                duration: 500.0,
                bit_rate: 80.0,
            }),
            ChunkPlanner::new(1000, 1.0).unwrap(),
            SegmentSplitter::new(
                Box::new(StubTranscoder { fail_index: None }),
                SegmentEncoding::default(),
            ),
            Box::new(CancellingRecognizer {
                token: token.clone(),
                at: 2,
            }),
            TranscribeMediaConfig {
                split_workers: 2,
                transcribe_workers: 1,
            },
        );

        let result = uc.run(Path::new("talk.mp3"), &layout, &token, &mut NullPipelineLogger);

        assert!(matches!(result, Err(TranscribeMediaError::Cancelled)));
        assert!(layout.transcript_path(0).exists());
        assert!(!layout.transcript_path(200).exists());
        assert!(!layout.transcript_path(300).exists());
        assert!(!layout.final_transcript_path().exists());
    }

    #[test]
    fn test_cancelled_run_writes_no_final_transcript() {
        let tmp = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(tmp.path());
        let token = CancellationToken::new();
        token.cancel();

        let result = use_case(500.0, None, None).run(
            Path::new("talk.mp3"),
            &layout,
            &token,
            &mut NullPipelineLogger,
        );
        assert!(matches!(result, Err(TranscribeMediaError::Cancelled)));
        assert!(!layout.final_transcript_path().exists());
    }
}
