//! Backend response to an import call

use serde::Serialize;

/// Status and body returned by the backend's import endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadResult {
    pub status: u16,
    /// Raw response text, JSON or plain
    pub body: String,
    /// Parsed from a `{"count": N}` body when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported_count: Option<u64>,
}

impl UploadResult {
    pub fn new(status: u16, body: String) -> Self {
        let imported_count = parse_count(&body);
        Self {
            status,
            body,
            imported_count,
        }
    }
}

fn parse_count(body: &str) -> Option<u64> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("count")? {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
