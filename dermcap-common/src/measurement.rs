//! Vendor measurement export: raw table and typed measurement rows

use std::io::Read;

use crate::columns::{MEASUREMENT_COLUMNS, REFLECTANCE_OFFSET, WAVELENGTH_COUNT};
use crate::{Error, Result};

/// Vendor CSV as read from disk: header names plus untyped cells.
///
/// Header names are trimmed and stripped of a leading byte-order mark. Rows
/// may be shorter or longer than the header (vendor exports often end every
/// line with a stray delimiter); missing cells read as empty.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Read a vendor export. Non-UTF-8 bytes are replaced rather than rejected.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .byte_headers()?
            .iter()
            .map(|h| {
                String::from_utf8_lossy(h)
                    .trim_start_matches('\u{feff}')
                    .trim()
                    .to_string()
            })
            .collect();

        let mut rows = Vec::new();
        for record in csv_reader.byte_records() {
            let record = record?;
            // Blank trailing lines come through as a single empty field
            if record.len() == 1 && record[0].is_empty() {
                continue;
            }
            rows.push(
                record
                    .iter()
                    .map(|cell| String::from_utf8_lossy(cell).into_owned())
                    .collect(),
            );
        }

        tracing::debug!(columns = headers.len(), rows = rows.len(), "Read vendor table");

        Ok(Self { headers, rows })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(bytes)
    }

    /// Position of the first header equal to `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell at (`row`, `column`), empty if the row is short
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One device measurement with typed summary indices and reflectance samples.
///
/// Hue is Munsell notation (e.g. `5.2YR`), so it stays text. Numeric cells
/// left blank by the device read as `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRow {
    pub group: String,
    pub data_name: String,
    pub comment: String,
    pub date: String,
    pub time: String,
    pub melanin_index: Option<f64>,
    pub hb_index: Option<f64>,
    pub hb_so2_index: Option<f64>,
    pub hue: String,
    pub value: Option<f64>,
    pub chroma: Option<f64>,
    pub lab_l: Option<f64>,
    pub lab_a: Option<f64>,
    pub lab_b: Option<f64>,
    pub reflectance: [Option<f64>; WAVELENGTH_COUNT],
}

impl MeasurementRow {
    /// Build a row from cells laid out in [`MEASUREMENT_COLUMNS`] order.
    ///
    /// `names` supplies the column name used in error messages (vendor or
    /// canonical, depending on which file the cells came from); `row` is the
    /// zero-based data row number.
    pub fn from_cells(row: usize, cells: &[&str], names: &[&str]) -> Result<Self> {
        if cells.len() != MEASUREMENT_COLUMNS.len() || names.len() != MEASUREMENT_COLUMNS.len() {
            return Err(Error::Internal(format!(
                "Expected {} measurement cells, got {}",
                MEASUREMENT_COLUMNS.len(),
                cells.len()
            )));
        }

        let text = |i: usize| cells[i].to_string();
        let number = |i: usize| parse_number(row, names[i], cells[i]);

        let mut reflectance = [None; WAVELENGTH_COUNT];
        for (i, sample) in reflectance.iter_mut().enumerate() {
            *sample = number(REFLECTANCE_OFFSET + i)?;
        }

        Ok(Self {
            group: text(0),
            data_name: text(1),
            comment: text(2),
            date: text(3),
            time: text(4),
            melanin_index: number(5)?,
            hb_index: number(6)?,
            hb_so2_index: number(7)?,
            hue: text(8),
            value: number(9)?,
            chroma: number(10)?,
            lab_l: number(11)?,
            lab_a: number(12)?,
            lab_b: number(13)?,
            reflectance,
        })
    }

    /// Cells in [`MEASUREMENT_COLUMNS`] order, numbers in shortest round-trip form
    pub fn cells(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(MEASUREMENT_COLUMNS.len());
        cells.push(self.group.clone());
        cells.push(self.data_name.clone());
        cells.push(self.comment.clone());
        cells.push(self.date.clone());
        cells.push(self.time.clone());
        cells.push(format_number(self.melanin_index));
        cells.push(format_number(self.hb_index));
        cells.push(format_number(self.hb_so2_index));
        cells.push(self.hue.clone());
        cells.push(format_number(self.value));
        cells.push(format_number(self.chroma));
        cells.push(format_number(self.lab_l));
        cells.push(format_number(self.lab_a));
        cells.push(format_number(self.lab_b));
        cells.extend(self.reflectance.iter().map(|s| format_number(*s)));
        cells
    }
}

fn parse_number(row: usize, column: &str, cell: &str) -> Result<Option<f64>> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    // `f64::from_str` accepts "NaN" and "inf"; a device reading never is either
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(Error::InvalidValue {
            row,
            column: column.to_string(),
            value: cell.to_string(),
        }),
    }
}

fn format_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
