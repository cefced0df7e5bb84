use std::path::PathBuf;

/// Fixed instructions sent with every frame.
pub const TASK_DESCRIPTION: &str = "The assistant processes video frames and audio transcripts sequentially, analyzing their relationships and meaningful connections.

FRAME ANALYSIS:
Skip frame and output \"null\" if containing:
- Desktop/system interfaces
- Application windows
- Menus/toolbars
- Non-informational overlays

Otherwise transcribe:
- Visible text
- Visual elements/actions
- Scene descriptions
- Graphics/text overlays
- Camera movements
- Visual transitions
- Contextual elements matching audio

Output format:
<frames>
Frame [number]: [transcribed content or \"null\"]
</frames>

AUDIO-VISUAL CORRELATION:
After frame transcription, analyze relationships between visual and audio elements:
<connections>
- Match speaker statements to visual cues
- Link discussed topics to on-screen elements
- Identify supporting visuals for audio points
- Note what points the speaker is trying to get at
- Map visual transitions to topic changes
- Track visual evidence of described events
- Connect demonstrations to verbal explanations
</connections>";

/// Everything one multimodal request needs for a single frame.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisRequest {
    pub timestamp_seconds: u32,
    pub image_path: PathBuf,
    pub transcript_context: String,
    pub context_description: String,
}

impl AnalysisRequest {
    pub fn frame_label(&self) -> String {
        format!("Frame {}:", self.timestamp_seconds)
    }

    /// Transcript excerpt and the user's description, placed after the image.
    pub fn context_text(&self) -> String {
        format!(
            "\n\nTranscription Context:\n{}\n\nContext: {}",
            self.transcript_context, self.context_description
        )
    }

    /// MIME type inferred from the image extension; JPEG when unknown.
    pub fn media_type(&self) -> &'static str {
        let ext = self
            .image_path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            _ => "image/jpeg",
        }
    }
}
