pub mod openai_speech_recognizer;
pub mod transcript_store;
