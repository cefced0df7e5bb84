pub mod audio_segment;
pub mod chunk_plan;
pub mod segment_splitter;
pub mod segment_transcoder;
