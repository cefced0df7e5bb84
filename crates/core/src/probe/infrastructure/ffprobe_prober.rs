use std::path::{Path, PathBuf};
use std::process::Command;

use crate::probe::domain::media_prober::{MediaProber, ProbeError};
use crate::probe::domain::probe_document::descriptor_from_probe_json;
use crate::shared::constants::FFPROBE_BINARY;
use crate::shared::media_descriptor::MediaDescriptor;

/// Probes media by running the `ffprobe` binary and parsing its JSON report.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    binary: PathBuf,
}

impl FfprobeProber {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from(FFPROBE_BINARY),
        }
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaProber for FfprobeProber {
    fn probe(&self, path: &Path) -> Result<MediaDescriptor, ProbeError> {
        log::info!("Probing {}", path.display());

        let file_size_bytes = std::fs::metadata(path)
            .map_err(|source| ProbeError::FileSize {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        let output = Command::new(&self.binary)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .map_err(|source| ProbeError::Launch {
                tool: self.binary.display().to_string(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            log::debug!("ffprobe stderr: {}", stderr.trim());
        }
        if !output.status.success() {
            return Err(ProbeError::ToolFailed {
                status: output.status.code(),
                stderr: stderr.into_owned(),
            });
        }

        let json = String::from_utf8_lossy(&output.stdout);
        let descriptor = descriptor_from_probe_json(&json, file_size_bytes, Some(path))?;

        log::info!(
            "File size: {:.2} MB, duration: {:.2}s, bit rate: {:.2} kbps",
            descriptor.file_size_bytes as f64 / 1024.0 / 1024.0,
            descriptor.duration_seconds,
            descriptor.bit_rate_bps / 1000.0
        );
        Ok(descriptor)
    }
}
