//! dermcap-ki library - KM Import module
//!
//! Validates colorimeter/spectrophotometer exports from the study sites and
//! uploads them to the site's data-capture project.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use chrono::{DateTime, Utc};
use dermcap_common::config::TomlConfig;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod models;
pub mod services;

pub use error::{ApiError, ApiResult};

use services::{ImportPipeline, RedcapClient};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Validated site configuration
    pub config: Arc<TomlConfig>,
    /// Validation pipeline with its backend client
    pub pipeline: ImportPipeline,
    /// Service start time, for the health endpoint
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: TomlConfig) -> dermcap_common::Result<Self> {
        let client = RedcapClient::new(Duration::from_secs(config.request_timeout_secs))?;
        Ok(Self {
            config: Arc::new(config),
            pipeline: ImportPipeline::new(client),
            startup_time: Utc::now(),
        })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::location_routes())
        .merge(api::import_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
