pub mod media_prober;
pub mod probe_document;
