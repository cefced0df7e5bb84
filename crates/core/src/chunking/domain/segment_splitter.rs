use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;

use super::audio_segment::{remove_artifact, AudioSegment};
use super::chunk_plan::SegmentSpan;
use super::segment_transcoder::{SegmentEncoding, SegmentTranscoder, TranscodeError};
use crate::shared::cancellation::CancellationToken;

#[derive(Error, Debug)]
pub enum SegmentError {
    #[error("segment {index} is {size_bytes} bytes, over the {max_bytes} byte limit")]
    TooLarge {
        index: usize,
        size_bytes: u64,
        max_bytes: u64,
    },
    #[error("segment {index} produced an empty artifact")]
    Empty { index: usize },
    #[error("transcoder failed for segment {index}: {source}")]
    ToolError {
        index: usize,
        #[source]
        source: TranscodeError,
    },
    #[error("segment {index} was cancelled")]
    Cancelled { index: usize },
}

impl SegmentError {
    pub fn index(&self) -> usize {
        match self {
            SegmentError::TooLarge { index, .. }
            | SegmentError::Empty { index }
            | SegmentError::ToolError { index, .. }
            | SegmentError::Cancelled { index } => *index,
        }
    }
}

/// Where a run's segments come from and go to.
#[derive(Clone, Debug)]
pub struct SplitTarget<'a> {
    pub source: &'a Path,
    pub work_dir: &'a Path,
    pub max_chunk_bytes: u64,
}

/// Produces one bounded audio segment per span and enforces the size ceiling.
///
/// Any failure removes whatever partial artifact the transcoder left behind.
pub struct SegmentSplitter {
    transcoder: Box<dyn SegmentTranscoder>,
    encoding: SegmentEncoding,
}

impl SegmentSplitter {
    pub fn new(transcoder: Box<dyn SegmentTranscoder>, encoding: SegmentEncoding) -> Self {
        Self {
            transcoder,
            encoding,
        }
    }

    pub fn artifact_path(&self, work_dir: &Path, span: &SegmentSpan) -> PathBuf {
        work_dir.join(format!("segment_{}.{}", span.index, self.encoding.extension))
    }

    pub fn split(
        &self,
        target: &SplitTarget<'_>,
        span: &SegmentSpan,
        cancel: &CancellationToken,
    ) -> Result<AudioSegment, SegmentError> {
        let output = self.artifact_path(target.work_dir, span);
        log::debug!(
            "Splitting segment {}: {:.1}s to {:.1}s -> {}",
            span.index,
            span.start_seconds,
            span.end_seconds(),
            output.display()
        );
        let started = Instant::now();

        let result = self.split_inner(target, span, &output, cancel);
        match &result {
            Ok(segment) => log::debug!(
                "Segment {} split in {:.2}s ({:.2} MB)",
                span.index,
                started.elapsed().as_secs_f64(),
                segment.size_bytes() as f64 / 1024.0 / 1024.0
            ),
            Err(_) => remove_artifact(&output),
        }
        result
    }

    fn split_inner(
        &self,
        target: &SplitTarget<'_>,
        span: &SegmentSpan,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<AudioSegment, SegmentError> {
        let index = span.index;
        self.transcoder
            .transcode(target.source, span, &self.encoding, output, cancel)
            .map_err(|source| match source {
                TranscodeError::Cancelled => SegmentError::Cancelled { index },
                source => SegmentError::ToolError { index, source },
            })?;

        let size_bytes = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
        if size_bytes == 0 {
            return Err(SegmentError::Empty { index });
        }
        if size_bytes > target.max_chunk_bytes {
            return Err(SegmentError::TooLarge {
                index,
                size_bytes,
                max_bytes: target.max_chunk_bytes,
            });
        }

        Ok(AudioSegment::new(span.clone(), output.to_path_buf(), size_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Writes `bytes` zero bytes to the output, or fails with the given status.
    struct StubTranscoder {
        bytes: usize,
        fail_status: Option<i32>,
    }

    impl SegmentTranscoder for StubTranscoder {
        fn transcode(
            &self,
            _source: &Path,
            _span: &SegmentSpan,
            _encoding: &SegmentEncoding,
            output: &Path,
            _cancel: &CancellationToken,
        ) -> Result<(), TranscodeError> {
            std::fs::write(output, vec![0u8; self.bytes]).unwrap();
            match self.fail_status {
                Some(code) => Err(TranscodeError::Failed {
                    status: Some(code),
                    stderr: "boom".to_string(),
                }),
                None => Ok(()),
            }
        }
    }

    struct CancelledTranscoder;

    impl SegmentTranscoder for CancelledTranscoder {
        fn transcode(
            &self,
            _: &Path,
            _: &SegmentSpan,
            _: &SegmentEncoding,
            _: &Path,
            _: &CancellationToken,
        ) -> Result<(), TranscodeError> {
            Err(TranscodeError::Cancelled)
        }
    }

    fn span(index: usize) -> SegmentSpan {
        SegmentSpan {
            index,
            start_seconds: index as f64 * 60.0,
            duration_seconds: 60.0,
        }
    }

    fn splitter(bytes: usize, fail_status: Option<i32>) -> SegmentSplitter {
        SegmentSplitter::new(
            Box::new(StubTranscoder { bytes, fail_status }),
            SegmentEncoding::default(),
        )
    }

    fn run_split(
        splitter: &SegmentSplitter,
        dir: &Path,
        max_bytes: u64,
        index: usize,
    ) -> (Result<AudioSegment, SegmentError>, PathBuf) {
        let target = SplitTarget {
            source: Path::new("source.mp3"),
            work_dir: dir,
            max_chunk_bytes: max_bytes,
        };
        let span = span(index);
        let path = splitter.artifact_path(dir, &span);
        (splitter.split(&target, &span, &CancellationToken::new()), path)
    }

    #[test]
    fn test_successful_split_returns_segment() {
        let tmp = TempDir::new().unwrap();
        let (result, path) = run_split(&splitter(100, None), tmp.path(), 1000, 3);
        let segment = result.unwrap();
        assert_eq!(segment.index(), 3);
        assert_eq!(segment.size_bytes(), 100);
        assert_eq!(segment.artifact_path(), path);
        assert!(path.ends_with("segment_3.mp3"));
        assert!(path.exists());
    }

    #[test]
    fn test_oversize_segment_fails_and_is_removed() {
        let tmp = TempDir::new().unwrap();
        let (result, path) = run_split(&splitter(2000, None), tmp.path(), 1000, 0);
        match result {
            Err(SegmentError::TooLarge {
                index,
                size_bytes,
                max_bytes,
            }) => {
                assert_eq!(index, 0);
                assert_eq!(size_bytes, 2000);
                assert_eq!(max_bytes, 1000);
            }
            other => panic!("expected TooLarge, got {other:?}"),
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_segment_at_exact_limit_is_accepted() {
        let tmp = TempDir::new().unwrap();
        let (result, _) = run_split(&splitter(1000, None), tmp.path(), 1000, 0);
        assert!(result.is_ok());
    }

    #[test]
    fn test_empty_segment_fails_and_is_removed() {
        let tmp = TempDir::new().unwrap();
        let (result, path) = run_split(&splitter(0, None), tmp.path(), 1000, 1);
        assert!(matches!(result, Err(SegmentError::Empty { index: 1 })));
        assert!(!path.exists());
    }

    #[test]
    fn test_tool_failure_removes_partial_artifact() {
        let tmp = TempDir::new().unwrap();
        let (result, path) = run_split(&splitter(50, Some(1)), tmp.path(), 1000, 2);
        let err = result.unwrap_err();
        assert!(matches!(err, SegmentError::ToolError { index: 2, .. }));
        assert_eq!(err.index(), 2);
        assert!(!path.exists());
    }

    #[test]
    fn test_cancelled_transcode_maps_to_cancelled() {
        let tmp = TempDir::new().unwrap();
        let splitter = SegmentSplitter::new(Box::new(CancelledTranscoder), SegmentEncoding::default());
        let (result, _) = run_split(&splitter, tmp.path(), 1000, 4);
        assert!(matches!(result, Err(SegmentError::Cancelled { index: 4 })));
    }
}
