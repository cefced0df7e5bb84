use serde_json::Value;
use thiserror::Error;

use super::analysis_result::{FrameAnalysis, NO_CONNECTIONS, NO_FRAME_DETAILS};

const FRAMES_TAG: &str = "frames";
const CONNECTIONS_TAG: &str = "connections";

#[derive(Error, Debug, PartialEq)]
pub enum ResponseParseError {
    #[error("response has no content array")]
    MissingContent,
    #[error("text block {0} has no text")]
    MalformedTextBlock(usize),
}

/// Concatenates the text blocks of a messages response with single spaces.
/// Non-text blocks are ignored.
pub fn response_text(response: &Value) -> Result<String, ResponseParseError> {
    let blocks = response
        .get("content")
        .and_then(Value::as_array)
        .ok_or(ResponseParseError::MissingContent)?;

    let mut texts = Vec::new();
    for (i, block) in blocks.iter().enumerate() {
        if block.get("type").and_then(Value::as_str) != Some("text") {
            continue;
        }
        let text = block
            .get("text")
            .and_then(Value::as_str)
            .ok_or(ResponseParseError::MalformedTextBlock(i))?;
        texts.push(text);
    }
    Ok(texts.join(" "))
}

/// Content between the first `<tag>` and the next `</tag>`, trimmed.
///
/// `None` when the opening tag is absent or never closed.
pub fn extract_section(text: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = text.find(&open)? + open.len();
    let len = text[start..].find(&close)?;
    Some(text[start..start + len].trim().to_string())
}

/// Pulls both tagged sections out of a response. Each missing section gets
/// its own placeholder; the other is kept.
pub fn parse_response(response: &Value) -> Result<FrameAnalysis, ResponseParseError> {
    let text = response_text(response)?;
    let frames = extract_section(&text, FRAMES_TAG).unwrap_or_else(|| NO_FRAME_DETAILS.to_string());
    let connections =
        extract_section(&text, CONNECTIONS_TAG).unwrap_or_else(|| NO_CONNECTIONS.to_string());
    Ok(FrameAnalysis::new(frames, connections))
}
