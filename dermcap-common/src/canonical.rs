//! Canonical records: the unit persisted to the measurement project
//!
//! A [`CanonicalTable`] is built fresh for every upload attempt and never
//! edited afterwards. [`CanonicalTable::to_csv`] produces the import payload;
//! [`CanonicalTable::from_csv`] reads that payload back with the same schema.

use std::collections::BTreeMap;

use crate::columns::{self, MEASUREMENT_COLUMNS};
use crate::identifiers::{Operator, SessionNumber, Upi};
use crate::measurement::MeasurementRow;
use crate::{Error, Result};

/// A record as exported from the backend: field name → text value
pub type StoredRecord = BTreeMap<String, String>;

/// Measurement row annotated with patient/session metadata
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    /// Zero-based row position within the uploaded file
    pub record_id: usize,
    pub upi: Upi,
    pub session: Option<SessionNumber>,
    pub operator: Option<Operator>,
    pub measurement: MeasurementRow,
}

impl CanonicalRecord {
    /// Cells in canonical header order
    pub fn cells(&self, with_operator: bool) -> Vec<String> {
        let mut cells = vec![
            self.record_id.to_string(),
            self.upi.to_string(),
            self.session.map(|s| s.to_string()).unwrap_or_default(),
        ];
        if with_operator {
            cells.push(
                self.operator
                    .as_ref()
                    .map(|o| o.as_str().to_string())
                    .unwrap_or_default(),
            );
        }
        cells.extend(self.measurement.cells());
        cells
    }
}

/// Ordered batch of canonical records sharing one output header
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTable {
    /// Whether the `operator` column is part of the output
    pub with_operator: bool,
    pub records: Vec<CanonicalRecord>,
}

impl CanonicalTable {
    pub fn header(&self) -> Vec<&'static str> {
        columns::canonical_header(self.with_operator)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Cells of the first `n` records, aligned with [`CanonicalTable::header`]
    pub fn preview(&self, n: usize) -> Vec<Vec<String>> {
        self.records
            .iter()
            .take(n)
            .map(|record| record.cells(self.with_operator))
            .collect()
    }

    /// Encode as the import payload: UTF-8, header row, no extra index column
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.header())?;
        for record in &self.records {
            writer.write_record(record.cells(self.with_operator))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| Error::Internal(format!("CSV buffer flush failed: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| Error::Internal(format!("CSV output is not UTF-8: {}", e)))
    }

    /// Decode a payload produced by [`CanonicalTable::to_csv`].
    ///
    /// The `operator` column is optional; every other canonical column is
    /// required and its absence is reported as a schema mismatch.
    pub fn from_csv(data: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().from_reader(data);
        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let position = |name: &str| headers.iter().position(|h| h == name);

        let required = canonical_required();
        let missing: Vec<String> = required
            .iter()
            .copied()
            .filter(|name| position(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::SchemaMismatch { missing });
        }

        // Checked above
        let index: Vec<usize> = required.iter().copied().filter_map(position).collect();
        let operator_index = position(columns::OPERATOR);
        let measurement_names: Vec<&str> = MEASUREMENT_COLUMNS.iter().map(|(_, c)| *c).collect();

        let mut records = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let cell = |i: usize| record.get(i).unwrap_or("");

            let record_id = cell(index[0]).trim().parse::<usize>().map_err(|_| Error::InvalidValue {
                row,
                column: columns::RECORD_ID.to_string(),
                value: cell(index[0]).to_string(),
            })?;
            let upi = Upi::parse(cell(index[1]))?;
            let session = match cell(index[2]).trim() {
                "" => None,
                s => Some(SessionNumber::parse(s)?),
            };
            let operator = operator_index
                .map(cell)
                .filter(|s| !s.trim().is_empty())
                .map(Operator::from_stored);

            let cells: Vec<&str> = index[3..].iter().map(|&i| cell(i)).collect();
            let measurement = MeasurementRow::from_cells(row, &cells, &measurement_names)?;

            records.push(CanonicalRecord {
                record_id,
                upi,
                session,
                operator,
                measurement,
            });
        }

        Ok(Self {
            with_operator: operator_index.is_some(),
            records,
        })
    }
}

fn canonical_required() -> Vec<&'static str> {
    columns::canonical_header(false)
}
