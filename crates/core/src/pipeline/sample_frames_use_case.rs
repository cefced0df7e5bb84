use std::path::Path;
use std::time::Instant;

use crate::frames::domain::frame_extractor::{FrameExtractError, FrameExtractor};
use crate::frames::domain::frame_sample::FrameSample;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::artifact_layout::ArtifactLayout;
use crate::shared::cancellation::CancellationToken;

/// Writes one still per sampling interval into the output directory.
pub struct SampleFramesUseCase {
    extractor: Box<dyn FrameExtractor>,
    interval_seconds: u32,
}

impl SampleFramesUseCase {
    pub fn new(extractor: Box<dyn FrameExtractor>, interval_seconds: u32) -> Self {
        Self {
            extractor,
            interval_seconds,
        }
    }

    pub fn run(
        &self,
        video: &Path,
        layout: &ArtifactLayout,
        cancel: &CancellationToken,
        logger: &mut dyn PipelineLogger,
    ) -> Result<Vec<FrameSample>, FrameExtractError> {
        logger.info(&format!(
            "Extracting frames every {}s from {}",
            self.interval_seconds,
            video.display()
        ));
        let started = Instant::now();
        let samples = self
            .extractor
            .extract(video, self.interval_seconds, layout, cancel)?;
        logger.timing("frames", started.elapsed().as_secs_f64() * 1000.0);
        logger.info(&format!(
            "Extracted {} frames into {}",
            samples.len(),
            layout.root().display()
        ));
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pipeline_logger::StdoutPipelineLogger;
    use std::path::PathBuf;

    struct StubExtractor;

    impl FrameExtractor for StubExtractor {
        fn extract(
            &self,
            _video: &Path,
            interval_seconds: u32,
            layout: &ArtifactLayout,
            _cancel: &CancellationToken,
        ) -> Result<Vec<FrameSample>, FrameExtractError> {
            Ok((0..3)
                .map(|k| FrameSample {
                    timestamp_seconds: k * interval_seconds,
                    image_path: layout.frame_path(k * interval_seconds),
                })
                .collect())
        }
    }

    #[test]
    fn test_passes_interval_and_records_timing() {
        let uc = SampleFramesUseCase::new(Box::new(StubExtractor), 15);
        let mut logger = StdoutPipelineLogger::default();
        let samples = uc
            .run(
                Path::new("talk.mp4"),
                &ArtifactLayout::new("/out"),
                &CancellationToken::new(),
                &mut logger,
            )
            .unwrap();

        let ts: Vec<u32> = samples.iter().map(|s| s.timestamp_seconds).collect();
        assert_eq!(ts, vec![0, 15, 30]);
        assert_eq!(samples[2].image_path, PathBuf::from("/out/frame_30.jpg"));
        assert_eq!(logger.timings_for("frames").unwrap().len(), 1);
    }
}
