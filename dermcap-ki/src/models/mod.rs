//! Data models for the import workflow

pub mod import_request;
pub mod prepared_batch;
pub mod upload_result;

pub use import_request::{ImportForm, ImportRequest};
pub use prepared_batch::PreparedBatch;
pub use upload_result::UploadResult;
