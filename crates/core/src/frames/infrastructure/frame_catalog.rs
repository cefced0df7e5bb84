use std::fs;

use crate::frames::domain::frame_extractor::FrameExtractError;
use crate::frames::domain::frame_sample::{minute_targets, FrameSample, MinuteBatch};
use crate::shared::artifact_layout::{parse_frame_timestamp, ArtifactLayout};

/// Finds frame artifacts already on disk in an output directory.
#[derive(Clone, Debug)]
pub struct FrameCatalog {
    layout: ArtifactLayout,
    interval_seconds: u32,
}

impl FrameCatalog {
    pub fn new(layout: ArtifactLayout, interval_seconds: u32) -> Self {
        Self {
            layout,
            interval_seconds: interval_seconds.max(1),
        }
    }

    /// Every `frame_<seconds>.jpg` in the directory, ascending by timestamp.
    pub fn samples(&self) -> Result<Vec<FrameSample>, FrameExtractError> {
        let root = self.layout.root();
        let dir = fs::read_dir(root).map_err(|source| FrameExtractError::List {
            path: root.to_path_buf(),
            source,
        })?;
        let mut samples: Vec<FrameSample> = dir
            .flatten()
            .filter_map(|entry| {
                let timestamp_seconds = parse_frame_timestamp(&entry.file_name().to_string_lossy())?;
                Some(FrameSample {
                    timestamp_seconds,
                    image_path: entry.path(),
                })
            })
            .collect();
        samples.sort_by_key(|s| s.timestamp_seconds);
        Ok(samples)
    }

    /// Latest frame timestamp on disk, or `None` when there are no frames.
    pub fn max_timestamp(&self) -> Result<Option<u32>, FrameExtractError> {
        Ok(self.samples()?.last().map(|s| s.timestamp_seconds))
    }

    /// Frames at the sampling targets of minute `m` that exist on disk.
    pub fn minute_batch(&self, minute_index: u32) -> MinuteBatch {
        let frames = minute_targets(minute_index, self.interval_seconds)
            .map(|ts| FrameSample {
                timestamp_seconds: ts,
                image_path: self.layout.frame_path(ts),
            })
            .filter(|s| s.image_path.is_file());
        MinuteBatch::collect(minute_index, frames)
    }
}
