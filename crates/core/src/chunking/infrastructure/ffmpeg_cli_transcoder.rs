use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use crate::chunking::domain::chunk_plan::SegmentSpan;
use crate::chunking::domain::segment_transcoder::{
    SegmentEncoding, SegmentTranscoder, TranscodeError,
};
use crate::shared::cancellation::CancellationToken;
use crate::shared::constants::FFMPEG_BINARY;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Cuts segments by running the `ffmpeg` binary, one process per segment.
///
/// The process is polled rather than waited on so a cancellation kills it
/// instead of leaving the worker blocked.
#[derive(Debug, Clone)]
pub struct FfmpegCliTranscoder {
    binary: PathBuf,
}

impl FfmpegCliTranscoder {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from(FFMPEG_BINARY),
        }
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfmpegCliTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Argument list for one segment.
pub fn build_args(
    source: &Path,
    span: &SegmentSpan,
    encoding: &SegmentEncoding,
    output: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-y", "-i"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(source.as_os_str().to_owned());
    args.extend(
        [
            "-ss".to_string(),
            format!("{:.3}", span.start_seconds),
            "-t".to_string(),
            format!("{:.3}", span.duration_seconds),
            "-acodec".to_string(),
            encoding.codec.clone(),
            "-ab".to_string(),
            encoding.bit_rate.clone(),
            "-ac".to_string(),
            encoding.channels.to_string(),
            "-ar".to_string(),
            encoding.sample_rate.to_string(),
            "-af".to_string(),
            encoding.filter.clone(),
        ]
        .into_iter()
        .map(OsString::from),
    );
    args.push(output.as_os_str().to_owned());
    args
}

impl SegmentTranscoder for FfmpegCliTranscoder {
    fn transcode(
        &self,
        source: &Path,
        span: &SegmentSpan,
        encoding: &SegmentEncoding,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), TranscodeError> {
        if cancel.is_cancelled() {
            return Err(TranscodeError::Cancelled);
        }

        let mut child = Command::new(&self.binary)
            .args(build_args(source, span, encoding, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(TranscodeError::Launch)?;

        // Drain stderr on a side thread so a chatty ffmpeg never blocks on a full pipe.
        let stderr_reader = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf);
                buf
            })
        });

        let status = wait_or_kill(&mut child, cancel)?;
        let stderr = stderr_reader
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        if !stderr.trim().is_empty() {
            log::debug!("ffmpeg stderr for segment {}: {}", span.index, stderr.trim());
        }

        match status {
            Some(status) if status.success() => Ok(()),
            Some(status) => Err(TranscodeError::Failed {
                status: status.code(),
                stderr,
            }),
            None => Err(TranscodeError::Cancelled),
        }
    }
}

/// Waits for the child, killing it if the token fires. `None` means killed.
fn wait_or_kill(
    child: &mut Child,
    cancel: &CancellationToken,
) -> Result<Option<std::process::ExitStatus>, TranscodeError> {
    loop {
        if let Some(status) = child.try_wait().map_err(TranscodeError::Launch)? {
            return Ok(Some(status));
        }
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}
