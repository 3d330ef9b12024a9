//! Identity Cross-Checker
//!
//! Compares the entered (patient, session) pair with an independent source of
//! record before anything is uploaded.
//!
//! # Rules
//! - Session present in the reference and none of its patients match → hard stop
//! - Session present and one of its patients matches → verified
//! - Session absent from the reference → unverifiable, allowed to proceed
//!
//! Identifiers from the two sources arrive in different forms (`10`, `"10"`,
//! `" 10 "`, `10.0`), so both sides go through [`normalize_identifier`].

use std::collections::{BTreeMap, BTreeSet};

use dermcap_common::{Error, Result, SessionNumber, StoredRecord, Upi};

/// Trimmed text form of an identifier; integral decimals lose their `.0`
pub fn normalize_identifier(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some((whole, fraction)) = trimmed.split_once('.') {
        if !whole.is_empty()
            && whole.bytes().all(|b| b.is_ascii_digit())
            && !fraction.is_empty()
            && fraction.bytes().all(|b| b == b'0')
        {
            return whole.to_string();
        }
    }
    trimmed.to_string()
}

/// Reference mapping: session → patient identifiers recorded for it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceIndex {
    patients_by_session: BTreeMap<String, BTreeSet<String>>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from exported reference records; rows without a session are skipped
    pub fn from_records(
        records: &[StoredRecord],
        session_field: &str,
        patient_field: &str,
    ) -> Self {
        let mut index = Self::new();
        for record in records {
            let session = record.get(session_field).map(String::as_str).unwrap_or("");
            let patient = record.get(patient_field).map(String::as_str).unwrap_or("");
            index.insert(session, patient);
        }
        index
    }

    pub fn insert(&mut self, session: &str, patient: &str) {
        let session = normalize_identifier(session);
        let patient = normalize_identifier(patient);
        // A session row with no patient says nothing about identity
        if session.is_empty() || patient.is_empty() {
            return;
        }
        self.patients_by_session.entry(session).or_default().insert(patient);
    }

    /// Patients on record for `session`, or `None` if the session is unknown
    pub fn expected_patients(&self, session: &str) -> Option<&BTreeSet<String>> {
        self.patients_by_session.get(&normalize_identifier(session))
    }

    pub fn len(&self) -> usize {
        self.patients_by_session.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients_by_session.is_empty()
    }
}

/// Result of a passing identity check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityCheck {
    /// Reference record confirms the pair
    Verified,
    /// No reference record for the session
    Unverifiable,
}

/// Reject the pair if the reference records the session for someone else
pub fn check_identity(
    upi: Upi,
    session: SessionNumber,
    index: &ReferenceIndex,
) -> Result<IdentityCheck> {
    let candidate = normalize_identifier(&upi.to_string());

    match index.expected_patients(&session.to_string()) {
        None => {
            tracing::info!(
                upi = %upi,
                session = %session,
                "Session not in reference index; identity unverifiable"
            );
            Ok(IdentityCheck::Unverifiable)
        }
        Some(patients) if patients.contains(&candidate) => {
            tracing::debug!(upi = %upi, session = %session, "Identity verified against reference");
            Ok(IdentityCheck::Verified)
        }
        Some(patients) => {
            tracing::warn!(
                upi = %upi,
                session = %session,
                expected = ?patients,
                "Identity mismatch against reference"
            );
            Err(Error::IdentityMismatch {
                upi: upi.get(),
                session: session.get(),
                expected: patients.iter().cloned().collect(),
            })
        }
    }
}
