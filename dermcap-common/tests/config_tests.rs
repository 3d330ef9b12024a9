//! Configuration loading tests
//!
//! Tests the implementation of:
//! - Loading a full site configuration from disk
//! - Errors for unreadable, malformed and inconsistent files
//! - Token resolution from the environment at call time
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that set token variables are marked with #[serial].

use std::env;
use std::io::Write;

use dermcap_common::config::{ConfigFileResolver, TomlConfig};
use dermcap_common::Error;
use serial_test::serial;
use tempfile::NamedTempFile;

const FULL: &str = r#"
host = "0.0.0.0"
port = 6001
preview_rows = 10
request_timeout_secs = 12

[logging]
level = "debug"

[[locations]]
name = "ucsf"
display_name = "UCSF Dermatology"
session_scoped = true

[locations.measurements]
endpoint = "https://redcap.example.org/api/"
token_env = "DERMCAP_CFGTEST_UCSF_TOKEN"

[locations.reference]
endpoint = "https://redcap.example.org/api/"
token_env = "DERMCAP_CFGTEST_UCSF_REFERENCE_TOKEN"
token = "reference-from-file"
session_field = "visit_number"
patient_field = "mrn_upi"

[[locations]]
name = "uganda"
operators = ["Achieng", "Okello"]

[locations.measurements]
endpoint = "https://redcap.example.ug/api/"
token_env = "DERMCAP_CFGTEST_UGANDA_TOKEN"
token = "uganda-from-file"
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Should create temp file");
    file.write_all(content.as_bytes()).expect("Should write config");
    file
}

#[test]
fn test_load_full_config() {
    let file = write_config(FULL);
    let config = TomlConfig::load(file.path()).unwrap();

    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(config.port, 6001);
    assert_eq!(config.preview_rows, 10);
    assert_eq!(config.request_timeout_secs, 12);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.locations.len(), 2);

    let ucsf = config.location("ucsf").unwrap();
    assert_eq!(ucsf.display_name(), "UCSF Dermatology");
    assert!(ucsf.session_scoped);
    assert!(!ucsf.records_operator());
    let reference = ucsf.reference.as_ref().unwrap();
    assert_eq!(reference.session_field, "visit_number");
    assert_eq!(reference.patient_field, "mrn_upi");

    let uganda = config.location("uganda").unwrap();
    assert_eq!(uganda.display_name(), "uganda");
    assert!(!uganda.session_scoped);
    assert!(uganda.records_operator());
    assert!(uganda.reference.is_none());
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = TomlConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_malformed_toml_is_config_error() {
    let file = write_config("[[locations]\nname = ");
    let err = TomlConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_scoped_site_without_reference_rejected() {
    let file = write_config(
        r#"
[[locations]]
name = "ucsf"
session_scoped = true

[locations.measurements]
endpoint = "https://redcap.example.org/api/"
token_env = "DERMCAP_CFGTEST_UCSF_TOKEN"
"#,
    );
    let err = TomlConfig::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("session-scoped"));
}

#[test]
fn test_resolver_uses_explicit_path() {
    let file = write_config(FULL);
    let path = ConfigFileResolver::new("dermcap-ki")
        .resolve(Some(file.path()))
        .unwrap();
    assert!(TomlConfig::load(&path).is_ok());
}

#[test]
#[serial]
fn test_env_token_overrides_file_token() {
    let file = write_config(FULL);
    let config = TomlConfig::load(file.path()).unwrap();
    let uganda = &config.location("uganda").unwrap().measurements;

    env::remove_var("DERMCAP_CFGTEST_UGANDA_TOKEN");
    assert_eq!(uganda.resolve_token().unwrap(), "uganda-from-file");

    env::set_var("DERMCAP_CFGTEST_UGANDA_TOKEN", "rotated-token");
    assert_eq!(uganda.resolve_token().unwrap(), "rotated-token");

    env::remove_var("DERMCAP_CFGTEST_UGANDA_TOKEN");
}

#[test]
#[serial]
fn test_unresolvable_token_names_variable() {
    let file = write_config(FULL);
    let config = TomlConfig::load(file.path()).unwrap();
    let ucsf = &config.location("ucsf").unwrap().measurements;

    env::remove_var("DERMCAP_CFGTEST_UCSF_TOKEN");
    let err = ucsf.resolve_token().unwrap_err();
    assert!(err.to_string().contains("DERMCAP_CFGTEST_UCSF_TOKEN"));
}
