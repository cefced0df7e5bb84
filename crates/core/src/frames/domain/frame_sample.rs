use std::path::PathBuf;

use crate::shared::constants::SECONDS_PER_MINUTE;

/// One sampled still, named by its whole-second timestamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameSample {
    pub timestamp_seconds: u32,
    pub image_path: PathBuf,
}

/// The minute a timestamp falls in.
pub fn minute_of(timestamp_seconds: u32) -> u32 {
    timestamp_seconds / SECONDS_PER_MINUTE
}

/// First second of minute `m`, or `None` when it is past the last
/// representable timestamp.
pub fn minute_start(minute_index: u32) -> Option<u32> {
    minute_index.checked_mul(SECONDS_PER_MINUTE)
}

/// Frames whose timestamps lie in `[m * 60, m * 60 + 60)`, ascending.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinuteBatch {
    pub minute_index: u32,
    pub frames: Vec<FrameSample>,
}

impl MinuteBatch {
    /// Keeps only the samples belonging to `minute_index`, sorted by timestamp.
    pub fn collect(minute_index: u32, samples: impl IntoIterator<Item = FrameSample>) -> Self {
        let mut frames: Vec<FrameSample> = samples
            .into_iter()
            .filter(|s| minute_of(s.timestamp_seconds) == minute_index)
            .collect();
        frames.sort_by_key(|s| s.timestamp_seconds);
        frames.dedup_by_key(|s| s.timestamp_seconds);
        Self {
            minute_index,
            frames,
        }
    }

    pub fn start_seconds(&self) -> u32 {
        minute_start(self.minute_index).unwrap_or(u32::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

/// Timestamps a frame is wanted at, within one minute: `m*60, m*60+interval, ...`.
/// Empty for minutes past the last representable timestamp.
pub fn minute_targets(minute_index: u32, interval_seconds: u32) -> impl Iterator<Item = u32> {
    let (start, end) = match minute_start(minute_index) {
        Some(start) => (start, start.saturating_add(SECONDS_PER_MINUTE)),
        None => (0, 0),
    };
    (start..end).step_by(interval_seconds.max(1) as usize)
}

/// Decides which decoded frames become samples.
///
/// Targets sit at `k * interval`, measured from the stream's own start time
/// so that frame timestamps line up with zero-based transcript offsets. The
/// first decoded frame at or after a target fills it. If the decoder jumps
/// past a whole interval, the targets it skipped over are reported and left
/// empty.
#[derive(Clone, Debug)]
pub struct SampleSchedule {
    interval_seconds: u32,
    origin_seconds: f64,
    next_target: u32,
}

/// What to do with one decoded frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SampleDecision {
    Skip,
    Capture {
        timestamp_seconds: u32,
        missed: Vec<u32>,
    },
}

impl SampleSchedule {
    pub fn new(interval_seconds: u32) -> Self {
        Self::starting_at(interval_seconds, 0.0)
    }

    /// Schedule for a stream whose first presentation time is `origin_seconds`.
    pub fn starting_at(interval_seconds: u32, origin_seconds: f64) -> Self {
        Self {
            interval_seconds: interval_seconds.max(1),
            origin_seconds: if origin_seconds.is_finite() {
                origin_seconds
            } else {
                0.0
            },
            next_target: 0,
        }
    }

    pub fn next_target(&self) -> u32 {
        self.next_target
    }

    /// Offers a frame at stream time `stream_seconds`.
    pub fn offer(&mut self, stream_seconds: f64) -> SampleDecision {
        let time_seconds = stream_seconds - self.origin_seconds;
        if !time_seconds.is_finite() || time_seconds < self.next_target as f64 {
            return SampleDecision::Skip;
        }
        let interval = self.interval_seconds;
        let slot = (time_seconds / interval as f64).floor() as u32 * interval;
        let missed: Vec<u32> = (self.next_target..slot).step_by(interval as usize).collect();
        self.next_target = slot + interval;
        SampleDecision::Capture {
            timestamp_seconds: slot,
            missed,
        }
    }
}
