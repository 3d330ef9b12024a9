//! Bootstrap configuration loading
//!
//! Config file resolution priority order:
//! 1. Command-line argument / `DERMCAP_CONFIG` (handled by the binary's argument parser)
//! 2. User config: `~/.config/dermcap/<module>.toml`
//! 3. System config: `/etc/dermcap/<module>.toml`
//!
//! Unlike ports and log levels, sites and their backend projects have no
//! sensible built-in default, so a missing config file is an error.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::location::LocationProfile;
use crate::{Error, Result};

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Address to bind the HTTP server to
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Rows of the transformed table shown back to the operator before upload
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// Timeout for each call to the data-capture backend
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Measurement sites served by this instance
    #[serde(default)]
    pub locations: Vec<LocationProfile>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5790
}

fn default_preview_rows() -> usize {
    5
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Read config {} failed: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!(
            path = %path.display(),
            locations = config.locations.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.locations.is_empty() {
            return Err(Error::Config(
                "At least one [[locations]] entry is required".to_string(),
            ));
        }
        if self.preview_rows == 0 {
            warn!("preview_rows = 0: operators will not see any transformed rows before upload");
        }

        let mut seen = HashSet::new();
        for location in &self.locations {
            location.validate()?;
            if !seen.insert(location.name.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate location name: {}",
                    location.name
                )));
            }
        }
        Ok(())
    }

    /// Look up a location profile by name
    pub fn location(&self, name: &str) -> Result<&LocationProfile> {
        let name = name.trim();
        self.locations
            .iter()
            .find(|l| l.name == name)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown location: {}", name)))
    }
}

/// Locates the config file for one module
pub struct ConfigFileResolver {
    module_name: String,
}

impl ConfigFileResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
        }
    }

    /// Resolve the config path, preferring an explicit path when given
    pub fn resolve(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }

        let file_name = format!("{}.toml", self.module_name);
        let candidates = self.candidates(&file_name);
        candidates
            .iter()
            .find(|p| p.exists())
            .cloned()
            .ok_or_else(|| {
                Error::Config(format!(
                    "No config file found. Looked in: {}",
                    candidates
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }

    fn candidates(&self, file_name: &str) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("dermcap").join(file_name));
        }
        if cfg!(unix) {
            candidates.push(PathBuf::from("/etc/dermcap").join(file_name));
        }
        candidates
    }
}
