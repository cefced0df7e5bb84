use std::fmt::Write;

use super::analysis_result::MinuteAnalysis;

/// Renders persisted minute results as a Markdown digest, one section per
/// minute in the order given.
pub fn render_markdown(title: &str, minutes: &[MinuteAnalysis]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {title}\n");

    if minutes.is_empty() {
        out.push_str("_No analysis results found._\n");
        return out;
    }

    for minute in minutes {
        let _ = writeln!(out, "## Minute {}\n", minute.minute_index);
        for result in &minute.results {
            let _ = writeln!(out, "### Frame at {}s\n", result.timestamp);
            let _ = writeln!(out, "`{}`\n", result.frame_path);
            let _ = writeln!(out, "**Frame description**\n\n{}\n", result.analysis.frames);
            let _ = writeln!(
                out,
                "**Audio-visual connections**\n\n{}\n",
                result.analysis.audio_visual_connections
            );
        }
    }
    out
}
