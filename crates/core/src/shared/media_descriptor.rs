use std::path::PathBuf;

/// Size and timing facts about a source recording, probed once per run.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaDescriptor {
    pub duration_seconds: f64,
    pub bit_rate_bps: f64,
    pub file_size_bytes: u64,
    pub source_path: Option<PathBuf>,
}

impl MediaDescriptor {
    /// Bit rate implied by file size over duration, used when the container
    /// does not report one.
    pub fn estimated_bit_rate(file_size_bytes: u64, duration_seconds: f64) -> f64 {
        if duration_seconds <= 0.0 {
            return 0.0;
        }
        file_size_bytes as f64 * 8.0 / duration_seconds
    }
}
