//! Duplicate Guard
//!
//! Refuses an upload when the measurement project already holds data for the
//! target session. The stored rows are handed back so the operator can compare
//! them with the file in hand; nothing is overwritten or merged.
//!
//! The check is a read followed later by a separate write. Two submissions
//! for the same session that both read before either writes will both pass.
//! The backend offers no conditional import, so this stays best-effort.

use std::collections::BTreeMap;

use dermcap_common::{Error, Result, SessionNumber, StoredRecord};

use super::identity_checker::normalize_identifier;

/// Sessions already uploaded, with the stored rows for each
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionIndex {
    records_by_session: BTreeMap<String, Vec<StoredRecord>>,
}

impl SessionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group exported measurement records by session; rows without one are ignored
    pub fn from_records(records: Vec<StoredRecord>, session_field: &str) -> Self {
        let mut index = Self::new();
        for record in records {
            let session = record
                .get(session_field)
                .map(|s| normalize_identifier(s))
                .unwrap_or_default();
            if session.is_empty() {
                continue;
            }
            index.records_by_session.entry(session).or_default().push(record);
        }
        index
    }

    pub fn contains(&self, session: SessionNumber) -> bool {
        self.records_by_session.contains_key(&session.to_string())
    }

    /// Stored rows for `session` (empty if none)
    pub fn records_for(&self, session: SessionNumber) -> &[StoredRecord] {
        self.records_by_session
            .get(&session.to_string())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.records_by_session.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records_by_session.is_empty()
    }
}

/// Allow the upload only if `session` has no stored data
pub fn check_session(session: SessionNumber, index: &SessionIndex) -> Result<()> {
    if !index.contains(session) {
        tracing::debug!(session = %session, "No stored data for session");
        return Ok(());
    }

    let conflicting = index.records_for(session).to_vec();
    tracing::warn!(
        session = %session,
        stored_rows = conflicting.len(),
        "Session already uploaded; refusing duplicate"
    );
    Err(Error::DuplicateSession {
        session: session.get(),
        conflicting,
    })
}
