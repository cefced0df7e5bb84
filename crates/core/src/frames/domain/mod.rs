pub mod frame_extractor;
pub mod frame_sample;
