pub mod artifact_layout;
pub mod cancellation;
pub mod constants;
pub mod media_descriptor;
pub mod progress_counter;
pub mod settings;
