pub mod analysis_request;
pub mod analysis_result;
pub mod digest_report;
pub mod tagged_response;
pub mod vision_analyzer;
