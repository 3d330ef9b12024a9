//! Schema Mapper
//!
//! Projects the vendor table onto the fixed measurement columns, renames them
//! to canonical field names and stamps every row with the caller's patient,
//! session and operator.
//!
//! # Algorithm
//! 1. Locate every required vendor column by header name (input order is irrelevant,
//!    extra columns are ignored)
//! 2. If any are missing, fail with all missing names at once
//! 3. Type each row's cells and assign `record_id` = zero-based row position

use dermcap_common::columns::MEASUREMENT_COLUMNS;
use dermcap_common::{
    CanonicalRecord, CanonicalTable, Error, MeasurementRow, Operator, RawTable, Result,
    SessionNumber, Upi,
};

/// Metadata broadcast to every row of one upload
#[derive(Debug, Clone)]
pub struct RecordIdentity {
    pub upi: Upi,
    pub session: Option<SessionNumber>,
    /// `Some` exactly when the site records operators; adds the `operator` column
    pub operator: Option<Operator>,
}

/// Build the canonical table. `raw` is only borrowed; callers keep the original.
pub fn map_records(raw: &RawTable, identity: &RecordIdentity) -> Result<CanonicalTable> {
    let mut positions = Vec::with_capacity(MEASUREMENT_COLUMNS.len());
    let mut missing = Vec::new();
    for (vendor, _) in MEASUREMENT_COLUMNS.iter() {
        match raw.column_index(vendor) {
            Some(i) => positions.push(i),
            None => missing.push(vendor.to_string()),
        }
    }
    if !missing.is_empty() {
        tracing::warn!(missing = ?missing, "Input file is missing required columns");
        return Err(Error::SchemaMismatch { missing });
    }

    let vendor_names: Vec<&str> = MEASUREMENT_COLUMNS.iter().map(|(v, _)| *v).collect();

    let mut records = Vec::with_capacity(raw.len());
    for row in 0..raw.len() {
        let cells: Vec<&str> = positions.iter().map(|&col| raw.cell(row, col)).collect();
        let measurement = MeasurementRow::from_cells(row, &cells, &vendor_names)?;
        records.push(CanonicalRecord {
            record_id: row,
            upi: identity.upi,
            session: identity.session,
            operator: identity.operator.clone(),
            measurement,
        });
    }

    tracing::debug!(rows = records.len(), "Mapped vendor rows to canonical schema");

    Ok(CanonicalTable {
        with_operator: identity.operator.is_some(),
        records,
    })
}
