pub mod speech_recognizer;
pub mod transcriber;
pub mod transcript_entry;
pub mod transcript_index;
