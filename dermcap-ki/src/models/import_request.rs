//! Operator submission and the validated request built from it
//!
//! The pipeline never reads form state directly. Every pass is driven by one
//! immutable [`ImportRequest`], so the same inputs always produce the same
//! outcome.

use dermcap_common::{Error, LocationProfile, Operator, RawTable, Result, SessionNumber, Upi};
use uuid::Uuid;

/// Form fields exactly as submitted, before any validation
#[derive(Debug, Clone, Default)]
pub struct ImportForm {
    pub location: String,
    pub upi: String,
    pub session: Option<String>,
    pub operator: Option<String>,
    pub file_name: Option<String>,
    pub file: Vec<u8>,
}

/// Validated input to one pipeline pass
#[derive(Debug, Clone)]
pub struct ImportRequest {
    /// Correlates this pass's log lines and response
    pub pass_id: Uuid,
    pub location: String,
    pub upi: Upi,
    pub session: Option<SessionNumber>,
    pub operator: Option<Operator>,
    pub raw: RawTable,
}

impl ImportRequest {
    /// Check the submitted fields against the site's profile and read the file.
    ///
    /// - `upi` must be a positive integer
    /// - `session` is required at session-scoped sites and refused elsewhere
    /// - `operator` must be on the allow-list when the site keeps one, and absent otherwise
    pub fn from_form(form: &ImportForm, profile: &LocationProfile) -> Result<Self> {
        let upi = Upi::parse(&form.upi)?;

        let session_text = non_blank(form.session.as_deref());
        let session = match (profile.session_scoped, session_text) {
            (true, Some(s)) => Some(SessionNumber::parse(s)?),
            (true, None) => {
                return Err(Error::InvalidInput(format!(
                    "Session # is required for {}",
                    profile.display_name()
                )))
            }
            (false, Some(_)) => {
                return Err(Error::InvalidInput(format!(
                    "{} does not record sessions; leave Session # empty",
                    profile.display_name()
                )))
            }
            (false, None) => None,
        };

        let operator_text = non_blank(form.operator.as_deref());
        let operator = match (profile.records_operator(), operator_text) {
            (true, Some(name)) => Some(Operator::from_allow_list(name, &profile.operators)?),
            (true, None) => {
                return Err(Error::InvalidInput("Operator is required".to_string()))
            }
            (false, Some(name)) => {
                return Err(Error::InvalidInput(format!(
                    "{} does not record operators (got '{}')",
                    profile.display_name(),
                    name
                )))
            }
            (false, None) => None,
        };

        if form.file.is_empty() {
            return Err(Error::InvalidInput("No measurement file uploaded".to_string()));
        }
        let raw = RawTable::from_bytes(&form.file)?;

        Ok(Self {
            pass_id: Uuid::new_v4(),
            location: profile.name.clone(),
            upi,
            session,
            operator,
            raw,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dermcap_common::location::{ProjectConfig, ReferenceConfig};

    fn project() -> ProjectConfig {
        ProjectConfig {
            endpoint: "http://127.0.0.1:1/api/".to_string(),
            token_env: "UNUSED".to_string(),
            token: Some("t".to_string()),
        }
    }

    fn scoped_profile() -> LocationProfile {
        LocationProfile {
            name: "ucsf".to_string(),
            display_name: Some("UCSF".to_string()),
            session_scoped: true,
            operators: vec![],
            measurements: project(),
            reference: Some(ReferenceConfig {
                project: project(),
                session_field: "session".to_string(),
                patient_field: "upi".to_string(),
            }),
        }
    }

    fn unscoped_profile() -> LocationProfile {
        LocationProfile {
            name: "uganda".to_string(),
            display_name: None,
            session_scoped: false,
            operators: vec!["Achieng".to_string(), "Okello".to_string()],
            measurements: project(),
            reference: None,
        }
    }

    fn form(session: Option<&str>, operator: Option<&str>) -> ImportForm {
        ImportForm {
            location: "ucsf".to_string(),
            upi: "501".to_string(),
            session: session.map(String::from),
            operator: operator.map(String::from),
            file_name: Some("km.csv".to_string()),
            file: b"Group\nA\n".to_vec(),
        }
    }

    #[test]
    fn test_scoped_site_requires_session() {
        let request = ImportRequest::from_form(&form(Some("9"), None), &scoped_profile()).unwrap();
        assert_eq!(request.session.map(|s| s.get()), Some(9));
        assert!(request.operator.is_none());

        let err = ImportRequest::from_form(&form(Some(" "), None), &scoped_profile()).unwrap_err();
        assert!(err.to_string().contains("Session # is required"));
    }

    #[test]
    fn test_unscoped_site_refuses_session() {
        let with_session = form(Some("3"), Some("Okello"));
        assert!(ImportRequest::from_form(&with_session, &unscoped_profile()).is_err());

        let request =
            ImportRequest::from_form(&form(None, Some("Okello")), &unscoped_profile()).unwrap();
        assert!(request.session.is_none());
        assert_eq!(request.operator.unwrap().as_str(), "Okello");
    }

    #[test]
    fn test_operator_rules() {
        assert!(ImportRequest::from_form(&form(None, None), &unscoped_profile()).is_err());
        let unlisted = form(None, Some("Someone"));
        assert!(ImportRequest::from_form(&unlisted, &unscoped_profile()).is_err());
        let unexpected = form(Some("9"), Some("Okello"));
        assert!(ImportRequest::from_form(&unexpected, &scoped_profile()).is_err());
    }

    #[test]
    fn test_empty_file_rejected() {
        let mut f = form(Some("9"), None);
        f.file.clear();
        assert!(matches!(
            ImportRequest::from_form(&f, &scoped_profile()),
            Err(Error::InvalidInput(_))
        ));
    }
}
