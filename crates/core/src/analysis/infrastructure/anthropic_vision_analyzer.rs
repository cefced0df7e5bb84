use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};

use crate::analysis::domain::analysis_request::{AnalysisRequest, TASK_DESCRIPTION};
use crate::analysis::domain::vision_analyzer::{AnalysisError, VisionAnalyzer};
use crate::shared::constants::ANTHROPIC_VERSION;
use crate::shared::settings::AnalysisServiceSettings;

/// Vision analyzer backed by the Anthropic messages API.
///
/// Each frame is one single-turn request: label, base64 image, then the
/// transcript context, with the fixed task description as the system prompt.
#[derive(Debug, Clone)]
pub struct AnthropicVisionAnalyzer {
    service: AnalysisServiceSettings,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl AnthropicVisionAnalyzer {
    pub fn new(
        service: AnalysisServiceSettings,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AnalysisError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::Request(e.to_string()))?;
        Ok(Self {
            service,
            api_key: api_key.into(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/messages", self.service.base_url.trim_end_matches('/'))
    }

    /// The request body for one frame, given its already-read image bytes.
    pub fn request_body(&self, request: &AnalysisRequest, image: &[u8]) -> Value {
        json!({
            "model": self.service.model,
            "max_tokens": self.service.max_tokens,
            "temperature": 0,
            "system": TASK_DESCRIPTION,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": request.frame_label()},
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": request.media_type(),
                            "data": STANDARD.encode(image),
                        }
                    },
                    {"type": "text", "text": request.context_text()},
                ]
            }]
        })
    }
}

impl VisionAnalyzer for AnthropicVisionAnalyzer {
    fn analyze(&self, request: &AnalysisRequest) -> Result<Value, AnalysisError> {
        let image = std::fs::read(&request.image_path).map_err(|source| AnalysisError::ImageRead {
            path: request.image_path.clone(),
            source,
        })?;
        let body = self.request_body(request, &image);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .map_err(|e| AnalysisError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let text = response
            .text()
            .map_err(|e| AnalysisError::Request(e.to_string()))?;
        decode_response_body(&text)
    }
}

/// Decodes a successful response body. Anything that is not JSON is a
/// [`AnalysisError::Body`], so callers can tell it apart from transport failures.
pub fn decode_response_body(body: &str) -> Result<Value, AnalysisError> {
    serde_json::from_str(body).map_err(|e| AnalysisError::Body(e.to_string()))
}
