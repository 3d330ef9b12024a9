//! # dermcap Common Library
//!
//! Shared code for dermcap services including:
//! - Vendor column list and canonical rename table
//! - Raw and canonical measurement tables with their CSV codecs
//! - Validated patient/session/operator identifiers
//! - Per-location profiles and bootstrap configuration loading

pub mod canonical;
pub mod columns;
pub mod config;
pub mod error;
pub mod identifiers;
pub mod location;
pub mod measurement;

pub use canonical::{CanonicalRecord, CanonicalTable, StoredRecord};
pub use error::{Error, Result};
pub use identifiers::{Operator, SessionNumber, Upi};
pub use location::LocationProfile;
pub use measurement::{MeasurementRow, RawTable};
