use std::path::Path;
use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;

use crate::shared::settings::TranscriptionServiceSettings;
use crate::transcription::domain::speech_recognizer::{SpeechRecognizer, TranscriptionError};

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Speech recognizer backed by an OpenAI-compatible `/audio/transcriptions`
/// endpoint. Language and prompt are sent unchanged with every upload.
#[derive(Debug, Clone)]
pub struct OpenAiSpeechRecognizer {
    service: TranscriptionServiceSettings,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl OpenAiSpeechRecognizer {
    pub fn new(
        service: TranscriptionServiceSettings,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TranscriptionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TranscriptionError::Request(e.to_string()))?;
        Ok(Self {
            service,
            api_key: api_key.into(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/audio/transcriptions",
            self.service.base_url.trim_end_matches('/')
        )
    }
}

impl SpeechRecognizer for OpenAiSpeechRecognizer {
    fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
        let bytes = std::fs::read(audio_path).map_err(|source| TranscriptionError::Read {
            path: audio_path.to_path_buf(),
            source,
        })?;
        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "segment.mp3".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")
            .map_err(|e| TranscriptionError::Request(e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("model", self.service.model.clone())
            .text("language", self.service.language.clone())
            .text("prompt", self.service.prompt.clone())
            .text("response_format", "json");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| TranscriptionError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| TranscriptionError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(TranscriptionError::Status {
                status: status.as_u16(),
                body,
            });
        }
        parse_transcription_response(&body)
    }
}

/// Extracts `text` from a JSON transcription response, unmodified.
pub fn parse_transcription_response(body: &str) -> Result<String, TranscriptionError> {
    serde_json::from_str::<TranscriptionResponse>(body)
        .map(|r| r.text)
        .map_err(|e| TranscriptionError::Response(e.to_string()))
}
