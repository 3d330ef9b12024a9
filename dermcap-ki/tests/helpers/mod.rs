//! Shared test helpers for dermcap-ki integration tests
//!
//! - Vendor CSV fixtures built from the canonical column list
//! - In-process mock of the data-capture backend API on an ephemeral port
//! - Site configuration pointing at the mock
//! - Hand-built `multipart/form-data` requests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Form, Json, Router,
};
use dermcap_common::columns::{required_vendor_columns, WAVELENGTH_COUNT};
use dermcap_common::config::TomlConfig;
use dermcap_common::CanonicalTable;
use http_body_util::BodyExt;
use serde_json::{json, Value};

pub const MEASUREMENT_TOKEN: &str = "measurement-token";
pub const REFERENCE_TOKEN: &str = "reference-token";

const BOUNDARY: &str = "dermcap-test-boundary";

// =============================================================================
// Vendor fixtures
// =============================================================================

/// One device row: (group, L*, b*); every other column gets a plausible value
pub type VendorRow<'a> = (&'a str, f64, f64);

/// Vendor export with all required columns
pub fn vendor_csv(rows: &[VendorRow]) -> Vec<u8> {
    vendor_csv_without(&[], rows)
}

/// Vendor export with the named columns left out
pub fn vendor_csv_without(dropped: &[&str], rows: &[VendorRow]) -> Vec<u8> {
    let keep: Vec<&str> = required_vendor_columns()
        .filter(|c| !dropped.contains(c))
        .collect();

    let mut out = keep.join(",");
    out.push_str("\r\n");
    for (i, (group, lab_l, lab_b)) in rows.iter().enumerate() {
        let cells: Vec<String> = keep
            .iter()
            .map(|column| vendor_cell(column, i, group, *lab_l, *lab_b))
            .collect();
        out.push_str(&cells.join(","));
        out.push_str("\r\n");
    }
    out.into_bytes()
}

fn vendor_cell(column: &str, row: usize, group: &str, lab_l: f64, lab_b: f64) -> String {
    match column {
        "Group" => group.to_string(),
        "Data Name" => format!("M{:03}", row + 1),
        "Comment" => String::new(),
        "Date" => "10/19/2026".to_string(),
        "Time" => format!("09:{:02}:00", row),
        "Melanin Index" => "412.5".to_string(),
        "Hb Index" => "301".to_string(),
        "Hb SO2 Index(%)" => "63.2".to_string(),
        "Hue" => "5.2YR".to_string(),
        "Value" => "5.8".to_string(),
        "Chroma" => "3.1".to_string(),
        "L*" => lab_l.to_string(),
        "a*" => "11.4".to_string(),
        "b*" => lab_b.to_string(),
        wavelength => {
            // Reflectance rises gently across the visible range
            let nm: f64 = wavelength.parse().unwrap_or(400.0);
            format!("{:.1}", 12.0 + (nm - 400.0) / 10.0 * (30.0 / WAVELENGTH_COUNT as f64))
        }
    }
}

// =============================================================================
// Mock backend
// =============================================================================

/// Recorded state of the mock backend
#[derive(Debug, Default)]
pub struct MockState {
    /// Rows returned by an export with [`MEASUREMENT_TOKEN`]
    pub measurements: Vec<Value>,
    /// Rows returned by an export with [`REFERENCE_TOKEN`]
    pub reference: Vec<Value>,
    /// Number of export calls received
    pub exports: usize,
    /// Form parameters of every import call received
    pub imports: Vec<Vec<(String, String)>>,
    /// When set, every call answers with this status
    pub fail_status: Option<u16>,
    /// When set, import calls answer with this status and body; exports still succeed
    pub import_failure: Option<(u16, String)>,
}

impl MockState {
    /// Value of `name` in the most recent import call
    pub fn last_import_param(&self, name: &str) -> Option<String> {
        self.imports.last().and_then(|params| {
            params
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        })
    }
}

pub struct MockBackend {
    pub endpoint: String,
    pub state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub async fn start(state: MockState) -> Self {
        let state = Arc::new(Mutex::new(state));
        let app = Router::new()
            .route("/api/", post(mock_api))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Should bind ephemeral port");
        let addr = listener.local_addr().expect("Should have local address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Mock backend failed");
        });

        Self {
            endpoint: format!("http://{}/api/", addr),
            state,
        }
    }

    pub fn exports(&self) -> usize {
        self.state.lock().unwrap().exports
    }

    pub fn imports(&self) -> usize {
        self.state.lock().unwrap().imports.len()
    }

    /// The most recent import payload decoded back into canonical records
    pub fn last_payload(&self) -> CanonicalTable {
        let data = self
            .state
            .lock()
            .unwrap()
            .last_import_param("data")
            .expect("Should have received an import");
        CanonicalTable::from_csv(data.as_bytes()).expect("Payload should decode")
    }
}

async fn mock_api(
    State(state): State<Arc<Mutex<MockState>>>,
    Form(params): Form<Vec<(String, String)>>,
) -> Response {
    let mut state = state.lock().unwrap();
    let param = |name: &str| {
        params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    };

    if let Some(status) = state.fail_status {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, "Service temporarily unavailable").into_response();
    }

    let token = param("token").to_string();
    match param("action") {
        "export" => {
            state.exports += 1;
            let rows = match token.as_str() {
                MEASUREMENT_TOKEN => state.measurements.clone(),
                REFERENCE_TOKEN => state.reference.clone(),
                _ => {
                    return (
                        StatusCode::FORBIDDEN,
                        Json(json!({"error": "You do not have permissions to use the API"})),
                    )
                        .into_response()
                }
            };
            Json(Value::Array(rows)).into_response()
        }
        "import" => {
            if let Some((status, body)) = state.import_failure.clone() {
                let status =
                    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                return (status, body).into_response();
            }
            let count = CanonicalTable::from_csv(param("data").as_bytes())
                .map(|t| t.len())
                .unwrap_or(0);
            state.imports.push(params.clone());
            Json(json!({ "count": count })).into_response()
        }
        other => {
            (StatusCode::BAD_REQUEST, format!("Unsupported action: {}", other)).into_response()
        }
    }
}

/// Stored measurement row as the backend exports it
pub fn stored_measurement(record_id: u32, upi: u64, session: u32) -> Value {
    json!({
        "record_id": record_id.to_string(),
        "upi": upi.to_string(),
        "session": session.to_string(),
        "group": "Forearm",
    })
}

/// Reference row linking a session to its patient; sessions come back as numbers
pub fn reference_row(session: u32, upi: u64) -> Value {
    json!({ "session": session, "upi": upi.to_string() })
}

// =============================================================================
// Configuration
// =============================================================================

/// Two sites against one mock: session-scoped `ucsf` and operator-recording `uganda`
pub fn test_config(endpoint: &str) -> TomlConfig {
    let toml = format!(
        r#"
preview_rows = 2
request_timeout_secs = 5

[[locations]]
name = "ucsf"
display_name = "UCSF"
session_scoped = true

[locations.measurements]
endpoint = "{endpoint}"
token_env = "DERMCAP_TEST_UNSET_UCSF_TOKEN"
token = "{measurement}"

[locations.reference]
endpoint = "{endpoint}"
token_env = "DERMCAP_TEST_UNSET_UCSF_REFERENCE_TOKEN"
token = "{reference}"

[[locations]]
name = "uganda"
display_name = "Mbarara"
operators = ["Achieng", "Okello"]

[locations.measurements]
endpoint = "{endpoint}"
token_env = "DERMCAP_TEST_UNSET_UGANDA_TOKEN"
token = "{measurement}"
"#,
        endpoint = endpoint,
        measurement = MEASUREMENT_TOKEN,
        reference = REFERENCE_TOKEN,
    );
    TomlConfig::from_toml_str(&toml).expect("Test config should be valid")
}

// =============================================================================
// Requests
// =============================================================================

/// Multipart POST with text fields and an optional CSV file part
pub fn multipart_request(uri: &str, fields: &[(&str, &str)], file: Option<&[u8]>) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some(file) = file {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"file\"; filename=\"km.csv\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: text/csv\r\n\r\n");
        body.extend_from_slice(file);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Extract JSON body from response
pub async fn extract_json(body: Body) -> Value {
    let bytes = body.collect().await.expect("Should read body").to_bytes();
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}
