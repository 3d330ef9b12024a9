//! Validation-and-transform pipeline
//!
//! **Stages** (each fatal stage stops the pass; the upload is always last):
//! 1. Schema Mapper: vendor table → canonical table
//! 2. Duplicate Guard: session must not already be stored (session-scoped sites only)
//! 3. Identity Cross-Checker: (patient, session) must not contradict the reference
//!    (session-scoped sites only)
//! 4. Derived-Metric Auditor: review-only angles, never fatal
//! 5. Upload (only from [`ImportPipeline::upload`])
//!
//! [`prepare_batch`] is the whole pass as a pure function of the request,
//! the site profile and a snapshot of backend state. [`ImportPipeline`] wraps
//! it with the backend reads and the final write.

use dermcap_common::{CanonicalTable, Error, LocationProfile, Result};

use super::duplicate_guard::{check_session, SessionIndex};
use super::identity_checker::{check_identity, IdentityCheck, ReferenceIndex};
use super::metric_auditor::audit;
use super::redcap_client::RedcapClient;
use super::schema_mapper::{map_records, RecordIdentity};
use crate::models::{ImportRequest, PreparedBatch, UploadResult};

/// Backend state read at the start of a pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendSnapshot {
    pub sessions: SessionIndex,
    pub reference: ReferenceIndex,
}

/// Run every validation stage without touching the backend
pub fn prepare_batch(
    request: &ImportRequest,
    profile: &LocationProfile,
    snapshot: &BackendSnapshot,
) -> Result<PreparedBatch> {
    let table = map_request(request)?;
    finish_batch(request, profile, table, snapshot)
}

/// Stage 1: map the vendor table, refusing files with no measurements
pub fn map_request(request: &ImportRequest) -> Result<CanonicalTable> {
    let identity = RecordIdentity {
        upi: request.upi,
        session: request.session,
        operator: request.operator.clone(),
    };
    let table = map_records(&request.raw, &identity)?;
    if table.is_empty() {
        return Err(Error::InvalidInput(
            "Measurement file contains a header but no rows".to_string(),
        ));
    }
    Ok(table)
}

/// Stages 2 to 4 on an already-mapped table
fn finish_batch(
    request: &ImportRequest,
    profile: &LocationProfile,
    table: CanonicalTable,
    snapshot: &BackendSnapshot,
) -> Result<PreparedBatch> {
    if request.location != profile.name {
        return Err(Error::Internal(format!(
            "Request for location '{}' checked against profile '{}'",
            request.location, profile.name
        )));
    }

    if profile.session_scoped {
        let session = request.session.ok_or_else(|| {
            Error::InvalidInput(format!("Session # is required for {}", profile.display_name()))
        })?;

        check_session(session, &snapshot.sessions)?;

        match check_identity(request.upi, session, &snapshot.reference)? {
            IdentityCheck::Verified => {}
            IdentityCheck::Unverifiable => tracing::info!(
                pass_id = %request.pass_id,
                session = %session,
                "Proceeding without reference record for session"
            ),
        }
    }

    let audit = audit(&table);

    Ok(PreparedBatch {
        pass_id: request.pass_id,
        location: profile.name.clone(),
        table,
        audit,
    })
}

/// Pipeline bound to a backend client
#[derive(Clone)]
pub struct ImportPipeline {
    client: RedcapClient,
}

impl ImportPipeline {
    pub fn new(client: RedcapClient) -> Self {
        Self { client }
    }

    /// Read the session and reference indices a site needs.
    ///
    /// Unscoped sites need neither, so no backend call is made for them.
    pub async fn fetch_snapshot(&self, profile: &LocationProfile) -> Result<BackendSnapshot> {
        if !profile.session_scoped {
            return Ok(BackendSnapshot::default());
        }

        let stored = self.client.export_records(&profile.measurements, &[]).await?;
        let sessions = SessionIndex::from_records(stored, dermcap_common::columns::SESSION);

        let reference = match &profile.reference {
            Some(reference) => {
                let fields = [reference.session_field.as_str(), reference.patient_field.as_str()];
                let records = self.client.export_records(&reference.project, &fields).await?;
                ReferenceIndex::from_records(
                    &records,
                    &reference.session_field,
                    &reference.patient_field,
                )
            }
            None => ReferenceIndex::new(),
        };

        tracing::debug!(
            location = %profile.name,
            stored_sessions = sessions.len(),
            reference_sessions = reference.len(),
            "Fetched backend snapshot"
        );

        Ok(BackendSnapshot { sessions, reference })
    }

    /// Full validation pass; nothing is written
    pub async fn validate(
        &self,
        request: &ImportRequest,
        profile: &LocationProfile,
    ) -> Result<PreparedBatch> {
        tracing::info!(
            pass_id = %request.pass_id,
            location = %profile.name,
            upi = %request.upi,
            session = ?request.session.map(|s| s.get()),
            rows = request.raw.len(),
            "Validation pass started"
        );

        let batch = self.run_checks(request, profile).await.map_err(|e| {
            tracing::warn!(pass_id = %request.pass_id, error = %e, "Validation pass failed");
            e
        })?;

        tracing::info!(
            pass_id = %request.pass_id,
            rows = batch.table.len(),
            undefined_metrics = batch.audit.warnings().count(),
            "Validation pass succeeded"
        );
        Ok(batch)
    }

    /// Fresh validation pass followed by the import call
    pub async fn upload(
        &self,
        request: &ImportRequest,
        profile: &LocationProfile,
    ) -> Result<(PreparedBatch, UploadResult)> {
        let batch = self.validate(request, profile).await?;
        let payload = batch.payload()?;

        tracing::info!(
            pass_id = %request.pass_id,
            location = %profile.name,
            rows = batch.table.len(),
            bytes = payload.len(),
            "Uploading batch"
        );

        let result = self
            .client
            .import_records(&profile.measurements, payload)
            .await
            .map_err(|e| {
                tracing::error!(pass_id = %request.pass_id, error = %e, "Upload failed");
                e
            })?;

        tracing::info!(
            pass_id = %request.pass_id,
            imported = ?result.imported_count,
            "Upload complete"
        );
        Ok((batch, result))
    }

    async fn run_checks(
        &self,
        request: &ImportRequest,
        profile: &LocationProfile,
    ) -> Result<PreparedBatch> {
        // Reject a bad file before spending any backend calls on it
        let table = map_request(request)?;
        let snapshot = self.fetch_snapshot(profile).await?;
        finish_batch(request, profile, table, &snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dermcap_common::location::ProjectConfig;
    use dermcap_common::{RawTable, SessionNumber, Upi};
    use uuid::Uuid;

    fn unscoped() -> LocationProfile {
        LocationProfile {
            name: "uganda".to_string(),
            display_name: None,
            session_scoped: false,
            operators: vec![],
            measurements: ProjectConfig {
                endpoint: "http://127.0.0.1:1/api/".to_string(),
                token_env: "UNUSED".to_string(),
                token: None,
            },
            reference: None,
        }
    }

    fn request(raw: RawTable) -> ImportRequest {
        ImportRequest {
            pass_id: Uuid::new_v4(),
            location: "uganda".to_string(),
            upi: Upi::new(4).unwrap(),
            session: None,
            operator: None,
            raw,
        }
    }

    #[test]
    fn test_header_only_file_rejected() {
        let headers = dermcap_common::columns::required_vendor_columns()
            .map(String::from)
            .collect();
        let raw = RawTable { headers, rows: vec![] };
        let err =
            prepare_batch(&request(raw), &unscoped(), &BackendSnapshot::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_location_mismatch_is_internal_error() {
        let headers: Vec<String> = dermcap_common::columns::required_vendor_columns()
            .map(String::from)
            .collect();
        let row = vec!["1".to_string(); headers.len()];
        let mut req = request(RawTable { headers, rows: vec![row] });
        req.location = "elsewhere".to_string();
        req.session = Some(SessionNumber::new(1).unwrap());

        let err = prepare_batch(&req, &unscoped(), &BackendSnapshot::default()).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[tokio::test]
    async fn test_unscoped_snapshot_needs_no_backend() {
        let client = RedcapClient::new(std::time::Duration::from_secs(1)).unwrap();
        let pipeline = ImportPipeline::new(client);
        let snapshot = pipeline.fetch_snapshot(&unscoped()).await.unwrap();
        assert_eq!(snapshot, BackendSnapshot::default());
    }
}
