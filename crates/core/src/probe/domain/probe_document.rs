use std::path::Path;

use serde::Deserialize;

use super::media_prober::ProbeError;
use crate::shared::media_descriptor::MediaDescriptor;

/// The subset of `ffprobe -print_format json -show_format -show_streams`
/// output the planner needs.
#[derive(Debug, Deserialize)]
struct ProbeDocument {
    format: Option<ProbeFormat>,
    streams: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<NumericField>,
    bit_rate: Option<NumericField>,
}

/// ffprobe prints numbers as strings; other producers emit real numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumericField {
    Number(f64),
    Text(String),
}

impl NumericField {
    fn as_f64(&self) -> Option<f64> {
        match self {
            NumericField::Number(n) => Some(*n),
            NumericField::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Builds a [`MediaDescriptor`] from probe JSON.
///
/// A missing or zero bit rate falls back to `file_size * 8 / duration`.
pub fn descriptor_from_probe_json(
    json: &str,
    file_size_bytes: u64,
    source_path: Option<&Path>,
) -> Result<MediaDescriptor, ProbeError> {
    let doc: ProbeDocument = serde_json::from_str(json)?;

    if matches!(doc.streams.as_deref(), Some([])) {
        return Err(ProbeError::NoStreams);
    }

    let format = doc.format.ok_or(ProbeError::MissingDuration)?;
    let duration_seconds = format
        .duration
        .as_ref()
        .and_then(NumericField::as_f64)
        .ok_or(ProbeError::MissingDuration)?;
    if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
        return Err(ProbeError::InvalidDuration(duration_seconds));
    }

    let reported = format
        .bit_rate
        .as_ref()
        .and_then(NumericField::as_f64)
        .filter(|b| b.is_finite() && *b > 0.0);
    let bit_rate_bps = match reported {
        Some(b) => b,
        None => {
            let estimated = MediaDescriptor::estimated_bit_rate(file_size_bytes, duration_seconds);
            log::debug!("Bit rate not reported, estimated {estimated:.0} bps from file size");
            estimated
        }
    };

    Ok(MediaDescriptor {
        duration_seconds,
        bit_rate_bps,
        file_size_bytes,
        source_path: source_path.map(Path::to_path_buf),
    })
}
