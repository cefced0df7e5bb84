pub mod analysis;
pub mod chunking;
pub mod execution;
pub mod frames;
pub mod pipeline;
pub mod probe;
pub mod shared;
pub mod transcription;
