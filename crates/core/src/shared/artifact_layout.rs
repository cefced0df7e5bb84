use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const TRANSCRIPT_PREFIX: &str = "transcript_";
const TRANSCRIPT_EXTENSION: &str = "txt";
const FRAME_PREFIX: &str = "frame_";
const FRAME_EXTENSION: &str = "jpg";
const ANALYSIS_DIR: &str = "frame_analysis";
const ANALYSIS_PREFIX: &str = "analysis_minute_";
const ANALYSIS_EXTENSION: &str = "json";
const FINAL_TRANSCRIPT: &str = "transcription.txt";

/// Names every artifact a run reads or writes inside one output directory.
///
/// Artifacts are keyed by absolute time (transcript offset, frame timestamp,
/// minute index), so concurrent writers never share a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `output_<stem>` under `parent`, one directory per source recording.
    pub fn for_source(parent: &Path, source: &Path) -> Self {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "media".to_string());
        Self::new(parent.join(format!("output_{stem}")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn transcript_path(&self, offset_seconds: u32) -> PathBuf {
        self.root
            .join(format!("{TRANSCRIPT_PREFIX}{offset_seconds}.{TRANSCRIPT_EXTENSION}"))
    }

    pub fn frame_path(&self, timestamp_seconds: u32) -> PathBuf {
        self.root
            .join(format!("{FRAME_PREFIX}{timestamp_seconds}.{FRAME_EXTENSION}"))
    }

    pub fn analysis_dir(&self) -> PathBuf {
        self.root.join(ANALYSIS_DIR)
    }

    pub fn analysis_path(&self, minute: u32) -> PathBuf {
        self.analysis_dir()
            .join(format!("{ANALYSIS_PREFIX}{minute}.{ANALYSIS_EXTENSION}"))
    }

    pub fn final_transcript_path(&self) -> PathBuf {
        self.root.join(FINAL_TRANSCRIPT)
    }
}

/// Parses the offset out of `transcript_<offset>.txt`.
pub fn parse_transcript_offset(file_name: &str) -> Option<u32> {
    parse_keyed_name(file_name, TRANSCRIPT_PREFIX, TRANSCRIPT_EXTENSION)
}

/// Parses the timestamp out of `frame_<seconds>.jpg`.
pub fn parse_frame_timestamp(file_name: &str) -> Option<u32> {
    parse_keyed_name(file_name, FRAME_PREFIX, FRAME_EXTENSION)
}

/// Parses the minute index out of `analysis_minute_<m>.json`.
pub fn parse_analysis_minute(file_name: &str) -> Option<u32> {
    parse_keyed_name(file_name, ANALYSIS_PREFIX, ANALYSIS_EXTENSION)
}

/// Writes `contents` to a `.part` sibling, then renames it over `dest`.
///
/// Readers see either the previous file or the complete new one. The
/// `.part` file is removed if any step fails.
pub fn write_atomic(dest: &Path, contents: &[u8]) -> std::io::Result<()> {
    let temp_path = dest.with_extension("part");
    let result = (|| {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(contents)?;
        file.flush()?;
        drop(file);
        fs::rename(&temp_path, dest)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn parse_keyed_name(file_name: &str, prefix: &str, extension: &str) -> Option<u32> {
    let rest = file_name.strip_prefix(prefix)?;
    let key = rest.strip_suffix(extension)?.strip_suffix('.')?;
    // Canonical decimal only, so a parsed key always maps back to the same name.
    let canonical = !key.is_empty()
        && key.bytes().all(|b| b.is_ascii_digit())
        && (key == "0" || !key.starts_with('0'));
    if !canonical {
        return None;
    }
    key.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_paths_are_keyed_by_time() {
        let layout = ArtifactLayout::new("/out");
        assert_eq!(layout.transcript_path(60), PathBuf::from("/out/transcript_60.txt"));
        assert_eq!(layout.frame_path(130), PathBuf::from("/out/frame_130.jpg"));
        assert_eq!(
            layout.analysis_path(2),
            PathBuf::from("/out/frame_analysis/analysis_minute_2.json")
        );
        assert_eq!(
            layout.final_transcript_path(),
            PathBuf::from("/out/transcription.txt")
        );
    }

    #[test]
    fn test_for_source_uses_file_stem() {
        let layout = ArtifactLayout::for_source(Path::new("/work"), Path::new("/media/Lecture 01.mp4"));
        assert_eq!(layout.root(), Path::new("/work/output_Lecture 01"));
    }

    #[rstest]
    #[case::plain("frame_0.jpg", Some(0))]
    #[case::large("frame_3600.jpg", Some(3600))]
    #[case::wrong_extension("frame_10.png", None)]
    #[case::wrong_prefix("thumb_10.jpg", None)]
    #[case::not_a_number("frame_x.jpg", None)]
    #[case::negative("frame_-10.jpg", None)]
    #[case::plus_sign("frame_+10.jpg", None)]
    #[case::leading_zero("frame_010.jpg", None)]
    #[case::double_zero("frame_00.jpg", None)]
    #[case::empty_key("frame_.jpg", None)]
    fn test_parse_frame_timestamp(#[case] name: &str, #[case] expected: Option<u32>) {
        assert_eq!(parse_frame_timestamp(name), expected);
    }

    #[test]
    fn test_parse_transcript_and_analysis_names() {
        assert_eq!(parse_transcript_offset("transcript_120.txt"), Some(120));
        assert_eq!(parse_transcript_offset("transcription.txt"), None);
        assert_eq!(parse_analysis_minute("analysis_minute_12.json"), Some(12));
        assert_eq!(parse_analysis_minute("analysis_minute_12.json.part"), None);
        assert_eq!(parse_analysis_minute("analysis_minute_07.json"), None);
        assert_eq!(parse_transcript_offset("transcript_+60.txt"), None);
    }

    #[test]
    fn test_write_atomic_replaces_whole_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("analysis_minute_0.json");
        write_atomic(&dest, b"first version, longer").unwrap();
        write_atomic(&dest, b"second").unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "second");
        assert!(!dest.with_extension("part").exists());
    }

    #[test]
    fn test_write_atomic_failure_leaves_no_part_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("missing_dir").join("out.json");
        assert!(write_atomic(&dest, b"data").is_err());
        assert!(!dest.with_extension("part").exists());
    }
}
