pub mod upload_intake;
pub mod upload_pipeline;
