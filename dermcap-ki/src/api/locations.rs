//! Location listing for the operator form
//!
//! GET /api/locations returns what the form needs to render its choices.
//! Endpoints and credentials are never included.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LocationSummary {
    pub name: String,
    pub display_name: String,
    pub session_scoped: bool,
    /// Empty when the site does not record operators
    pub operators: Vec<String>,
}

/// GET /api/locations
pub async fn list_locations(State(state): State<AppState>) -> Json<Vec<LocationSummary>> {
    let locations = state
        .config
        .locations
        .iter()
        .map(|l| LocationSummary {
            name: l.name.clone(),
            display_name: l.display_name().to_string(),
            session_scoped: l.session_scoped,
            operators: l.operators.clone(),
        })
        .collect();
    Json(locations)
}

pub fn location_routes() -> Router<AppState> {
    Router::new().route("/api/locations", get(list_locations))
}
