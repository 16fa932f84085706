//! Time-based expiry: `expires_at = created_at + value × unit`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const MINUTE_MS: i64 = 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryUnit {
    Minutes,
    Hours,
    Days,
}

impl ExpiryUnit {
    pub const fn millis(self) -> i64 {
        match self {
            ExpiryUnit::Minutes => MINUTE_MS,
            ExpiryUnit::Hours => 60 * MINUTE_MS,
            ExpiryUnit::Days => 24 * 60 * MINUTE_MS,
        }
    }

    fn suffix(self) -> char {
        match self {
            ExpiryUnit::Minutes => 'm',
            ExpiryUnit::Hours => 'h',
            ExpiryUnit::Days => 'd',
        }
    }
}

impl FromStr for ExpiryUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "min" | "mins" | "minute" | "minutes" => Ok(ExpiryUnit::Minutes),
            "h" | "hr" | "hrs" | "hour" | "hours" => Ok(ExpiryUnit::Hours),
            "d" | "day" | "days" => Ok(ExpiryUnit::Days),
            other => Err(Error::Validation(format!(
                "unknown expiry unit {other:?} (expected minutes, hours or days)"
            ))),
        }
    }
}

/// A positive number of minutes, hours or days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryDuration {
    value: u32,
    unit: ExpiryUnit,
}

impl ExpiryDuration {
    pub fn new(value: u32, unit: ExpiryUnit) -> Result<Self> {
        if value == 0 {
            return Err(Error::Validation(
                "expiry duration must be a positive integer".into(),
            ));
        }
        Ok(Self { value, unit })
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn unit(&self) -> ExpiryUnit {
        self.unit
    }

    /// `None` only on overflow.
    pub fn as_millis(&self) -> Option<i64> {
        i64::from(self.value).checked_mul(self.unit.millis())
    }
}

impl fmt::Display for ExpiryDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

/// Accepts `30m`, `2h`, `7d`, `15 minutes`, `1 day`.
impl FromStr for ExpiryDuration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| Error::Validation(format!("expiry {s:?} is missing a unit")))?;
        let (digits, unit) = s.split_at(split);
        let value: u32 = digits
            .parse()
            .map_err(|_| Error::Validation(format!("expiry {s:?} must start with a number")))?;
        ExpiryDuration::new(value, unit.parse()?)
    }
}

/// Absolute expiry timestamp (epoch millis) for a note created at
/// `created_at_ms`. `None` if the result would overflow.
pub fn expires_at(created_at_ms: i64, duration: ExpiryDuration) -> Option<i64> {
    duration
        .as_millis()
        .and_then(|ms| created_at_ms.checked_add(ms))
}
