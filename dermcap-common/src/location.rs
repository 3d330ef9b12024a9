//! Per-site configuration
//!
//! Sites differ in their operator lists, backend projects and credentials,
//! and in whether measurements are grouped into numbered sessions. All of
//! that lives in one [`LocationProfile`] per site rather than in branches.

use serde::Deserialize;

use crate::{Error, Result};

/// One project on the data-capture backend
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// API endpoint URL, e.g. `https://redcap.example.org/api/`
    pub endpoint: String,

    /// Name of the environment variable holding the project token
    pub token_env: String,

    /// Token kept in the config file (used when `token_env` is unset)
    #[serde(default)]
    pub token: Option<String>,
}

impl ProjectConfig {
    /// Resolve the project token: environment variable first, then config file.
    ///
    /// Resolved on every call so a rotated secret takes effect immediately.
    pub fn resolve_token(&self) -> Result<String> {
        if let Ok(token) = std::env::var(&self.token_env) {
            if is_valid_token(&token) {
                return Ok(token.trim().to_string());
            }
        }

        if let Some(token) = &self.token {
            if is_valid_token(token) {
                return Ok(token.trim().to_string());
            }
        }

        Err(Error::Config(format!(
            "No API token for {}. Set the {} environment variable or add `token` to the config file",
            self.endpoint, self.token_env
        )))
    }
}

fn is_valid_token(token: &str) -> bool {
    !token.trim().is_empty()
}

/// Reference project mapping sessions to the patient they belong to
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceConfig {
    #[serde(flatten)]
    pub project: ProjectConfig,

    /// Field holding the session number
    #[serde(default = "default_session_field")]
    pub session_field: String,

    /// Field holding the patient identifier
    #[serde(default = "default_patient_field")]
    pub patient_field: String,
}

fn default_session_field() -> String {
    "session".to_string()
}

fn default_patient_field() -> String {
    "upi".to_string()
}

/// Configuration record for one measurement site
#[derive(Debug, Clone, Deserialize)]
pub struct LocationProfile {
    /// Short identifier used in requests (e.g. `ucsf`)
    pub name: String,

    /// Human-readable site name; defaults to `name`
    #[serde(default)]
    pub display_name: Option<String>,

    /// Whether measurements at this site belong to numbered sessions.
    /// Unscoped sites store a blank session and skip both backend checks.
    #[serde(default)]
    pub session_scoped: bool,

    /// Operators allowed to submit data; empty if the site does not record operators
    #[serde(default)]
    pub operators: Vec<String>,

    /// Project receiving the uploaded measurements
    pub measurements: ProjectConfig,

    /// Independent session → patient source of record
    #[serde(default)]
    pub reference: Option<ReferenceConfig>,
}

impl LocationProfile {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Whether uploads from this site carry an `operator` column
    pub fn records_operator(&self) -> bool {
        !self.operators.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("Location name must not be empty".to_string()));
        }
        if self.measurements.endpoint.trim().is_empty() {
            return Err(Error::Config(format!(
                "Location '{}': measurements endpoint must not be empty",
                self.name
            )));
        }
        if self.session_scoped && self.reference.is_none() {
            return Err(Error::Config(format!(
                "Location '{}' is session-scoped but has no [reference] project",
                self.name
            )));
        }
        if let Some(reference) = &self.reference {
            if reference.project.endpoint.trim().is_empty() {
                return Err(Error::Config(format!(
                    "Location '{}': reference endpoint must not be empty",
                    self.name
                )));
            }
        }
        if self.operators.iter().any(|o| o.trim().is_empty()) {
            return Err(Error::Config(format!(
                "Location '{}': operator names must not be blank",
                self.name
            )));
        }
        Ok(())
    }
}
