pub mod frame_analysis_orchestrator;
pub mod pipeline_logger;
pub mod sample_frames_use_case;
pub mod transcribe_media_use_case;
