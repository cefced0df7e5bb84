use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use super::constants::{
    ANALYSIS_BASE_URL, ANALYSIS_MAX_TOKENS, ANALYSIS_MODEL, DEFAULT_CONTEXT_WINDOW_SECONDS,
    DEFAULT_FRAME_INTERVAL_SECONDS, DEFAULT_REQUEST_DELAY_MS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SAFETY_MARGIN, DEFAULT_SPLIT_WORKERS, DEFAULT_TRANSCRIBE_WORKERS, MAX_PAYLOAD_BYTES,
    TRANSCRIPTION_BASE_URL, TRANSCRIPTION_LANGUAGE, TRANSCRIPTION_MODEL, TRANSCRIPTION_PROMPT,
};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

/// Speech-to-text service parameters passed through on every upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionServiceSettings {
    pub base_url: String,
    pub model: String,
    pub language: String,
    pub prompt: String,
}

impl Default for TranscriptionServiceSettings {
    fn default() -> Self {
        Self {
            base_url: TRANSCRIPTION_BASE_URL.to_string(),
            model: TRANSCRIPTION_MODEL.to_string(),
            language: TRANSCRIPTION_LANGUAGE.to_string(),
            prompt: TRANSCRIPTION_PROMPT.to_string(),
        }
    }
}

/// Vision-language service parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisServiceSettings {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl Default for AnalysisServiceSettings {
    fn default() -> Self {
        Self {
            base_url: ANALYSIS_BASE_URL.to_string(),
            model: ANALYSIS_MODEL.to_string(),
            max_tokens: ANALYSIS_MAX_TOKENS,
        }
    }
}

/// Run configuration. Credentials are deliberately absent: they come from
/// the environment or explicit flags only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub max_payload_bytes: u64,
    pub safety_margin: f64,
    pub split_workers: usize,
    pub transcribe_workers: usize,
    pub frame_interval_seconds: u32,
    pub context_window_seconds: u32,
    pub request_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub transcription: TranscriptionServiceSettings,
    pub analysis: AnalysisServiceSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_payload_bytes: MAX_PAYLOAD_BYTES,
            safety_margin: DEFAULT_SAFETY_MARGIN,
            split_workers: DEFAULT_SPLIT_WORKERS,
            transcribe_workers: DEFAULT_TRANSCRIBE_WORKERS,
            frame_interval_seconds: DEFAULT_FRAME_INTERVAL_SECONDS,
            context_window_seconds: DEFAULT_CONTEXT_WINDOW_SECONDS,
            request_delay_ms: DEFAULT_REQUEST_DELAY_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            transcription: TranscriptionServiceSettings::default(),
            analysis: AnalysisServiceSettings::default(),
        }
    }
}

impl Settings {
    /// `<config dir>/Media Digest/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Media Digest").join("settings.json"))
    }

    /// Loads settings from `path`, or from the default location when `None`.
    ///
    /// A missing file yields defaults; an unreadable or malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(p) => p,
            None => return Ok(Self::default()),
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(&path).map_err(|source| SettingsError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| SettingsError::Parse { path, source })
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_payload_bytes == 0 {
            return Err(SettingsError::Invalid(
                "max_payload_bytes must be positive".to_string(),
            ));
        }
        if !(self.safety_margin > 0.0 && self.safety_margin <= 1.0) {
            return Err(SettingsError::Invalid(format!(
                "safety_margin must be in (0, 1], got {}",
                self.safety_margin
            )));
        }
        if self.split_workers == 0 || self.transcribe_workers == 0 {
            return Err(SettingsError::Invalid(
                "worker counts must be at least 1".to_string(),
            ));
        }
        if self.frame_interval_seconds == 0 {
            return Err(SettingsError::Invalid(
                "frame_interval_seconds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_service_limits() {
        let s = Settings::default();
        assert_eq!(s.max_payload_bytes, 24 * 1024 * 1024);
        assert_eq!(s.safety_margin, 0.9);
        assert_eq!(s.split_workers, 4);
        assert_eq!(s.transcribe_workers, 2);
        assert_eq!(s.frame_interval_seconds, 10);
        assert_eq!(s.context_window_seconds, 300);
        assert_eq!(s.request_delay(), Duration::from_secs(1));
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let tmp = TempDir::new().unwrap();
        let s = Settings::load(Some(&tmp.path().join("absent.json"))).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(
            &path,
            r#"{"transcribe_workers": 3, "analysis": {"model": "custom-model"}}"#,
        )
        .unwrap();

        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(s.transcribe_workers, 3);
        assert_eq!(s.split_workers, 4);
        assert_eq!(s.analysis.model, "custom-model");
        assert_eq!(s.analysis.max_tokens, ANALYSIS_MAX_TOKENS);
    }

    #[test]
    fn test_load_malformed_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Settings::load(Some(&path)),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let s = Settings {
            transcribe_workers: 0,
            ..Settings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_margin_out_of_range() {
        for margin in [0.0, -0.5, 1.5] {
            let s = Settings {
                safety_margin: margin,
                ..Settings::default()
            };
            assert!(s.validate().is_err(), "margin {margin} should be rejected");
        }
    }

    #[test]
    fn test_default_path_names_the_app() {
        if let Some(path) = Settings::default_path() {
            assert!(path.to_string_lossy().contains("Media Digest"));
            assert!(path.ends_with("settings.json"));
        }
    }
}
