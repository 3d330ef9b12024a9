//! Validation pipeline stages and the backend client

pub mod duplicate_guard;
pub mod identity_checker;
pub mod import_pipeline;
pub mod metric_auditor;
pub mod redcap_client;
pub mod schema_mapper;

pub use duplicate_guard::SessionIndex;
pub use identity_checker::ReferenceIndex;
pub use import_pipeline::{prepare_batch, BackendSnapshot, ImportPipeline};
pub use metric_auditor::AuditReport;
pub use redcap_client::RedcapClient;
