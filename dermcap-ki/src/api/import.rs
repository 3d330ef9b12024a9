//! Import workflow API handlers
//!
//! POST /api/preview, POST /api/upload
//!
//! Both take `multipart/form-data` with fields `location`, `upi`, `session`
//! (optional), `operator` (optional) and `file` (the vendor CSV). Upload
//! never relies on an earlier preview: it runs its own full pass first.

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{ImportForm, ImportRequest, UploadResult},
    services::AuditReport,
    AppState,
};

/// POST /api/preview response
#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub pass_id: Uuid,
    pub location: String,
    /// Total canonical rows that would be uploaded
    pub rows: usize,
    /// Canonical output header
    pub columns: Vec<String>,
    /// First rows of the canonical table, aligned with `columns`
    pub preview: Vec<Vec<String>>,
    /// Review-only derived metrics
    pub audit: AuditReport,
}

/// POST /api/upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub pass_id: Uuid,
    pub location: String,
    pub rows: usize,
    pub upload: UploadResult,
}

/// POST /api/preview
///
/// Validate the submission and show the transformed rows. Nothing is written.
pub async fn preview_import(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<PreviewResponse>> {
    let form = read_form(multipart).await?;
    let profile = state.config.location(&form.location)?;
    let request = ImportRequest::from_form(&form, profile)?;

    let batch = state.pipeline.validate(&request, profile).await?;

    Ok(Json(PreviewResponse {
        pass_id: batch.pass_id,
        location: batch.location.clone(),
        rows: batch.table.len(),
        columns: batch.table.header().into_iter().map(String::from).collect(),
        preview: batch.table.preview(state.config.preview_rows),
        audit: batch.audit,
    }))
}

/// POST /api/upload
///
/// Validate the submission again and, if every check passes, import it.
pub async fn upload_import(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let form = read_form(multipart).await?;
    let profile = state.config.location(&form.location)?;
    let request = ImportRequest::from_form(&form, profile)?;

    let (batch, upload) = state.pipeline.upload(&request, profile).await?;

    Ok(Json(UploadResponse {
        pass_id: batch.pass_id,
        location: batch.location,
        rows: batch.table.len(),
        upload,
    }))
}

/// Collect the operator form fields; unknown fields are ignored
async fn read_form(mut multipart: Multipart) -> ApiResult<ImportForm> {
    let mut form = ImportForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed form data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                form.file_name = field.file_name().map(String::from);
                form.file = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?
                    .to_vec();
            }
            "location" | "upi" | "session" | "operator" => {
                let text = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read field '{}': {}", name, e))
                })?;
                match name.as_str() {
                    "location" => form.location = text,
                    "upi" => form.upi = text,
                    "session" => form.session = Some(text),
                    _ => form.operator = Some(text),
                }
            }
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }

    tracing::debug!(
        location = %form.location,
        file_name = ?form.file_name,
        bytes = form.file.len(),
        "Received import form"
    );
    Ok(form)
}

/// Build import routes
pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/api/preview", post(preview_import))
        .route("/api/upload", post(upload_import))
}
