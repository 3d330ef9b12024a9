//! Data-capture backend API client
//!
//! Two calls against a REDCap-style API, both form-encoded POSTs to the
//! project endpoint:
//! - record export (`action=export`, JSON), used to build the session and reference indices
//! - record import (`action=import`, CSV), used for the final upload
//!
//! Neither call is retried. Transport failures and 5xx statuses come back as
//! [`Error::BackendUnavailable`]; a 4xx status means the backend refused the
//! request and comes back as [`Error::BackendRejected`]. Both carry whatever
//! status and text the backend produced.

use std::time::Duration;

use dermcap_common::location::ProjectConfig;
use dermcap_common::{Error, Result, StoredRecord};
use serde_json::Value;

use crate::models::UploadResult;

const USER_AGENT: &str = concat!("dermcap-ki/", env!("CARGO_PKG_VERSION"));

/// Backend API client
#[derive(Clone)]
pub struct RedcapClient {
    http_client: reqwest::Client,
}

impl RedcapClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self { http_client })
    }

    /// Export every record of a project as text-valued rows.
    ///
    /// `fields` restricts the export; empty means all fields.
    pub async fn export_records(
        &self,
        project: &ProjectConfig,
        fields: &[&str],
    ) -> Result<Vec<StoredRecord>> {
        let token = project.resolve_token()?;

        let mut params: Vec<(String, String)> = vec![
            ("token".into(), token),
            ("content".into(), "record".into()),
            ("action".into(), "export".into()),
            ("format".into(), "json".into()),
            ("type".into(), "flat".into()),
            ("returnFormat".into(), "json".into()),
        ];
        for (i, field) in fields.iter().enumerate() {
            params.push((format!("fields[{}]", i), field.to_string()));
        }

        tracing::debug!(endpoint = %project.endpoint, fields = ?fields, "Exporting records");

        let (status, body) = self.post_form(&project.endpoint, &params).await?;
        if !(200..300).contains(&status) {
            tracing::error!(endpoint = %project.endpoint, status, body = %body, "Export failed");
            return Err(status_error(status, body));
        }

        let records = parse_export(&body).map_err(|e| Error::BackendUnavailable {
            status: Some(status),
            body: format!("Unexpected export response ({}): {}", e, truncate(&body, 200)),
        })?;

        tracing::info!(endpoint = %project.endpoint, records = records.len(), "Exported records");
        Ok(records)
    }

    /// Import a CSV payload of flat records
    pub async fn import_records(
        &self,
        project: &ProjectConfig,
        csv: String,
    ) -> Result<UploadResult> {
        let token = project.resolve_token()?;

        let params: Vec<(String, String)> = vec![
            ("token".into(), token),
            ("content".into(), "record".into()),
            ("action".into(), "import".into()),
            ("format".into(), "csv".into()),
            ("type".into(), "flat".into()),
            ("overwriteBehavior".into(), "normal".into()),
            ("forceAutoNumber".into(), "true".into()),
            ("data".into(), csv),
            ("dateFormat".into(), "MDY".into()),
            ("returnContent".into(), "count".into()),
            ("returnFormat".into(), "json".into()),
        ];

        let (status, body) = self.post_form(&project.endpoint, &params).await?;
        if !(200..300).contains(&status) {
            tracing::error!(endpoint = %project.endpoint, status, body = %body, "Import failed");
            return Err(status_error(status, body));
        }

        let result = UploadResult::new(status, body);
        tracing::info!(
            endpoint = %project.endpoint,
            status,
            imported = ?result.imported_count,
            "Import accepted"
        );
        Ok(result)
    }

    async fn post_form(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<(u16, String)> {
        let response = self
            .http_client
            .post(endpoint)
            .form(params)
            .send()
            .await
            .map_err(|e| Error::BackendUnavailable {
                status: None,
                body: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| Error::BackendUnavailable {
            status: Some(status),
            body: format!("Failed to read response body: {}", e),
        })?;
        Ok((status, body))
    }
}

/// Error for a non-success status: 4xx is a refusal, anything else an outage
fn status_error(status: u16, body: String) -> Error {
    if (400..500).contains(&status) {
        Error::BackendRejected { status, body }
    } else {
        Error::BackendUnavailable {
            status: Some(status),
            body,
        }
    }
}

/// Parse a JSON export (array of flat objects) into text-valued records
fn parse_export(body: &str) -> std::result::Result<Vec<StoredRecord>, String> {
    let value: Value = serde_json::from_str(body).map_err(|e| e.to_string())?;
    let rows = value
        .as_array()
        .ok_or_else(|| "expected a JSON array".to_string())?;

    rows.iter()
        .map(|row| -> std::result::Result<StoredRecord, String> {
            let object = row
                .as_object()
                .ok_or_else(|| "expected an array of objects".to_string())?;
            let record: StoredRecord = object
                .iter()
                .map(|(k, v)| (k.clone(), value_text(v)))
                .collect();
            Ok(record)
        })
        .collect()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
