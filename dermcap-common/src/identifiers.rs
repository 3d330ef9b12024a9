//! Validated operator inputs
//!
//! Patient and session identifiers are typed in by hand at the measurement
//! station, so everything arriving here is text that still needs checking.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Unique patient identifier (always a positive integer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Upi(u64);

impl Upi {
    pub fn new(value: u64) -> Result<Self> {
        if value == 0 {
            return Err(Error::InvalidInput(
                "Unique Patient ID must be a positive integer".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Parse a form field value
    pub fn parse(input: &str) -> Result<Self> {
        let value = parse_positive(input, "Unique Patient ID")?;
        Self::new(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Upi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Measurement visit number (always a positive integer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionNumber(u32);

impl SessionNumber {
    pub fn new(value: u32) -> Result<Self> {
        if value == 0 {
            return Err(Error::InvalidInput(
                "Session # must be a positive integer".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Parse a form field value
    pub fn parse(input: &str) -> Result<Self> {
        let value = parse_positive(input, "Session #")?;
        let value = u32::try_from(value)
            .map_err(|_| Error::InvalidInput(format!("Session # out of range: {}", input.trim())))?;
        Self::new(value)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SessionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operator name, checked against a location's allow-list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Operator(String);

impl Operator {
    /// Accept `name` only if it appears verbatim (after trimming) in `allowed`
    pub fn from_allow_list(name: &str, allowed: &[String]) -> Result<Self> {
        let name = name.trim();
        if allowed.iter().any(|a| a == name) {
            Ok(Self(name.to_string()))
        } else {
            Err(Error::InvalidInput(format!(
                "Unknown operator '{}' (expected one of: {})",
                name,
                allowed.join(", ")
            )))
        }
    }

    /// Operator name read back from a stored record
    pub(crate) fn from_stored(name: &str) -> Self {
        Self(name.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn parse_positive(input: &str, field: &str) -> Result<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!("{} is required", field)));
    }
    trimmed.parse::<u64>().map_err(|_| {
        Error::InvalidInput(format!(
            "{} must be a positive integer, got '{}'",
            field, trimmed
        ))
    })
}
