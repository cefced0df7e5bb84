use thiserror::Error;

use crate::shared::constants::{DEFAULT_SAFETY_MARGIN, MAX_PAYLOAD_BYTES, MIN_CHUNK_SECONDS};
use crate::shared::media_descriptor::MediaDescriptor;

/// Relative slack under which a trailing sliver is treated as rounding noise.
const TRAILING_EPSILON: f64 = 1e-9;

#[derive(Error, Debug, PartialEq)]
pub enum PlanError {
    #[error("bit rate must be positive, got {0}")]
    InvalidBitRate(f64),
    #[error("duration must be positive, got {0}")]
    InvalidDuration(f64),
    #[error("safety margin must be in (0, 1], got {0}")]
    InvalidMargin(f64),
}

/// One time slice of the source: `[start, start + duration)`.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentSpan {
    pub index: usize,
    pub start_seconds: f64,
    pub duration_seconds: f64,
}

impl SegmentSpan {
    /// Whole-second key used to name the segment's transcript.
    pub fn offset_seconds(&self) -> u32 {
        self.start_seconds.floor() as u32
    }

    pub fn end_seconds(&self) -> f64 {
        self.start_seconds + self.duration_seconds
    }
}

/// How a recording is cut so every segment fits one upload.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkPlan {
    pub chunk_duration_seconds: f64,
    pub total_chunks: usize,
    pub max_chunk_bytes: u64,
    pub total_duration_seconds: f64,
}

impl ChunkPlan {
    /// The span of segment `index`; the last one is clipped to the remaining duration.
    pub fn span(&self, index: usize) -> Option<SegmentSpan> {
        if index >= self.total_chunks {
            return None;
        }
        let start_seconds = index as f64 * self.chunk_duration_seconds;
        let duration_seconds = self
            .chunk_duration_seconds
            .min(self.total_duration_seconds - start_seconds);
        Some(SegmentSpan {
            index,
            start_seconds,
            duration_seconds,
        })
    }

    /// All spans in index order. They tile `[0, total_duration)` without gaps.
    pub fn spans(&self) -> Vec<SegmentSpan> {
        (0..self.total_chunks).filter_map(|i| self.span(i)).collect()
    }
}

/// Sizes chunks from the source bit rate so each encoded segment stays under
/// the payload ceiling.
#[derive(Clone, Debug)]
pub struct ChunkPlanner {
    max_payload_bytes: u64,
    safety_margin: f64,
}

impl ChunkPlanner {
    pub fn new(max_payload_bytes: u64, safety_margin: f64) -> Result<Self, PlanError> {
        if !(safety_margin > 0.0 && safety_margin <= 1.0) {
            return Err(PlanError::InvalidMargin(safety_margin));
        }
        Ok(Self {
            max_payload_bytes,
            safety_margin,
        })
    }

    pub fn plan(&self, media: &MediaDescriptor) -> Result<ChunkPlan, PlanError> {
        let duration = media.duration_seconds;
        if !duration.is_finite() || duration <= 0.0 {
            return Err(PlanError::InvalidDuration(duration));
        }
        let bit_rate = media.bit_rate_bps;
        if !bit_rate.is_finite() || bit_rate <= 0.0 {
            return Err(PlanError::InvalidBitRate(bit_rate));
        }

        let budget_bits = self.max_payload_bytes as f64 * 8.0 * self.safety_margin;
        let mut chunk_duration = budget_bits / bit_rate;
        if chunk_duration < MIN_CHUNK_SECONDS {
            log::warn!(
                "Computed chunk duration {chunk_duration:.3}s is below {MIN_CHUNK_SECONDS}s; clamping"
            );
            chunk_duration = MIN_CHUNK_SECONDS;
        }

        let mut total_chunks = (duration / chunk_duration).ceil() as usize;
        if total_chunks > 1 {
            let remainder = duration - (total_chunks - 1) as f64 * chunk_duration;
            if remainder <= duration * TRAILING_EPSILON {
                total_chunks -= 1;
            }
        }

        log::info!("Calculated chunk duration: {chunk_duration:.2}s ({total_chunks} chunks)");

        Ok(ChunkPlan {
            chunk_duration_seconds: chunk_duration,
            total_chunks,
            max_chunk_bytes: self.max_payload_bytes,
            total_duration_seconds: duration,
        })
    }
}

impl Default for ChunkPlanner {
    fn default() -> Self {
        Self {
            max_payload_bytes: MAX_PAYLOAD_BYTES,
            safety_margin: DEFAULT_SAFETY_MARGIN,
        }
    }
}
