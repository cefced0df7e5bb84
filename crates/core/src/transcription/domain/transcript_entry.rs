/// Text recognised for one segment, keyed by its whole-second start offset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub start_offset_seconds: u32,
    pub end_offset_seconds: u32,
    pub text: String,
}

impl TranscriptEntry {
    pub fn new(start_offset_seconds: u32, end_offset_seconds: u32, text: impl Into<String>) -> Self {
        Self {
            start_offset_seconds,
            end_offset_seconds,
            text: text.into(),
        }
    }

    /// `[start s - end s]` on the first line, raw text after it.
    pub fn to_artifact(&self) -> String {
        format!(
            "[{}s - {}s]\n{}",
            self.start_offset_seconds, self.end_offset_seconds, self.text
        )
    }

    /// Reads an artifact written by [`to_artifact`](Self::to_artifact).
    ///
    /// Content without a recognisable header is taken as text in full, with
    /// the end offset equal to the start.
    pub fn from_artifact(start_offset_seconds: u32, content: &str) -> Self {
        let (first, rest) = match content.split_once('\n') {
            Some((first, rest)) => (first, rest),
            None => (content, ""),
        };
        match parse_header(first) {
            Some((_, end)) => Self::new(start_offset_seconds, end, rest),
            None => Self::new(start_offset_seconds, start_offset_seconds, content),
        }
    }
}

fn parse_header(line: &str) -> Option<(u32, u32)> {
    let inner = line.trim().strip_prefix('[')?.strip_suffix(']')?;
    let (start, end) = inner.split_once(" - ")?;
    let start = start.trim().strip_suffix('s')?.parse().ok()?;
    let end = end.trim().strip_suffix('s')?.parse().ok()?;
    Some((start, end))
}
