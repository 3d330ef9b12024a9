//! Outcome of a successful validation pass

use dermcap_common::{CanonicalTable, Result};
use uuid::Uuid;

use crate::services::metric_auditor::AuditReport;

/// Canonical records that passed every check, plus the audit computed from them
#[derive(Debug, Clone)]
pub struct PreparedBatch {
    /// Identifies this pass in logs
    pub pass_id: Uuid,
    pub location: String,
    pub table: CanonicalTable,
    /// Review-only; never part of the upload payload
    pub audit: AuditReport,
}

impl PreparedBatch {
    /// CSV payload for the backend import call
    pub fn payload(&self) -> Result<String> {
        self.table.to_csv()
    }
}
