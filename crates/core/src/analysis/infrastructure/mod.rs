pub mod analysis_store;
pub mod anthropic_vision_analyzer;
