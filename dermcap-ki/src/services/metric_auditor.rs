//! Derived-Metric Auditor
//!
//! Computes the individual typology angle (ITA) of every row for operator
//! review, and its spread within each group label.
//!
//! ITA = arctan((L* − 50) / b*) × 180/π
//!
//! The result is audit-only. It is computed from a borrowed table and is never
//! written into the canonical records or the upload payload.
//!
//! A b* of exactly zero (or a blank L*/b* cell) leaves the angle undefined.
//! That is reported as NaN with an [`UndefinedMetricWarning`]; it never stops
//! the pipeline.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use dermcap_common::CanonicalTable;
use serde::Serialize;

const RADIANS_TO_DEGREES: f64 = 180.0 / PI;

/// Individual typology angle in degrees; NaN when `lab_b` is zero
pub fn individual_typology_angle(lab_l: f64, lab_b: f64) -> f64 {
    if lab_b == 0.0 {
        return f64::NAN;
    }
    ((lab_l - 50.0) / lab_b).atan() * RADIANS_TO_DEGREES
}

/// Non-fatal notice that a row's angle could not be computed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UndefinedMetricWarning {
    pub record_id: usize,
    pub reason: String,
}

/// One row of the audit view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRow {
    pub record_id: usize,
    pub group: String,
    /// Degrees; serialized as `null` when undefined
    pub ita: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<UndefinedMetricWarning>,
}

/// Spread (max − min) of the angle across rows sharing a group label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSpread {
    pub group: String,
    pub rows: usize,
    /// NaN when no row in the group has a defined angle
    pub spread: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuditReport {
    pub rows: Vec<AuditRow>,
    pub groups: Vec<GroupSpread>,
}

impl AuditReport {
    pub fn warnings(&self) -> impl Iterator<Item = &UndefinedMetricWarning> {
        self.rows.iter().filter_map(|r| r.warning.as_ref())
    }
}

pub fn audit(table: &CanonicalTable) -> AuditReport {
    let rows: Vec<AuditRow> = table
        .records
        .iter()
        .map(|record| {
            let m = &record.measurement;
            let (ita, reason) = match (m.lab_l, m.lab_b) {
                (Some(l), Some(b)) => {
                    let ita = individual_typology_angle(l, b);
                    let reason = (!ita.is_finite())
                        .then(|| format!("b* = {} gives no defined angle", b));
                    (ita, reason)
                }
                _ => (f64::NAN, Some("L* or b* is blank".to_string())),
            };
            AuditRow {
                record_id: record.record_id,
                group: m.group.clone(),
                ita,
                warning: reason.map(|reason| UndefinedMetricWarning {
                    record_id: record.record_id,
                    reason,
                }),
            }
        })
        .collect();

    // group → (rows, min, max) over defined angles
    let mut by_group: BTreeMap<&str, (usize, Option<(f64, f64)>)> = BTreeMap::new();
    for row in &rows {
        let entry = by_group.entry(row.group.as_str()).or_insert((0, None));
        entry.0 += 1;
        if row.ita.is_finite() {
            entry.1 = Some(match entry.1 {
                Some((lo, hi)) => (lo.min(row.ita), hi.max(row.ita)),
                None => (row.ita, row.ita),
            });
        }
    }

    let groups = by_group
        .into_iter()
        .map(|(group, (count, range))| GroupSpread {
            group: group.to_string(),
            rows: count,
            spread: range.map(|(lo, hi)| hi - lo).unwrap_or(f64::NAN),
        })
        .collect();

    let report = AuditReport { rows, groups };
    let undefined = report.warnings().count();
    if undefined > 0 {
        tracing::info!(undefined, "Some rows have no defined typology angle");
    }
    report
}
