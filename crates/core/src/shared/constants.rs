/// Upload ceiling for one audio segment (the service limit is 25 MiB).
pub const MAX_PAYLOAD_BYTES: u64 = 24 * 1024 * 1024;

/// Fraction of the payload budget used when sizing chunks; absorbs re-encoding overhead.
pub const DEFAULT_SAFETY_MARGIN: f64 = 0.9;

/// Chunks shorter than this would collide on whole-second transcript keys.
pub const MIN_CHUNK_SECONDS: f64 = 1.0;

pub const DEFAULT_SPLIT_WORKERS: usize = 4;
pub const DEFAULT_TRANSCRIBE_WORKERS: usize = 2;

pub const DEFAULT_FRAME_INTERVAL_SECONDS: u32 = 10;
pub const DEFAULT_CONTEXT_WINDOW_SECONDS: u32 = 300;
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

pub const SECONDS_PER_MINUTE: u32 = 60;

pub const FFPROBE_BINARY: &str = "ffprobe";
pub const FFMPEG_BINARY: &str = "ffmpeg";

pub const TRANSCRIPTION_BASE_URL: &str = "https://api.openai.com/v1";
pub const TRANSCRIPTION_MODEL: &str = "whisper-1";
pub const TRANSCRIPTION_LANGUAGE: &str = "en";
pub const TRANSCRIPTION_PROMPT: &str = "This is English speech transcription.";

pub const ANALYSIS_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const ANALYSIS_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const ANALYSIS_MAX_TOKENS: u32 = 1000;
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
