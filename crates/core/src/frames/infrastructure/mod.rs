pub mod ffmpeg_frame_extractor;
pub mod frame_catalog;
