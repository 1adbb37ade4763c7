//! Typed route values.

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};

/// Date-time layout of the invariant culture (`MM/dd/yyyy HH:mm:ss zzz`).
const INVARIANT_DATE_TIME: &str = "%m/%d/%Y %H:%M:%S %:z";

/// A value captured by routing.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteValue {
    /// Text, rendered verbatim.
    String(String),
    /// Integer, rendered in plain decimal.
    Int(i64),
    /// Floating point, rendered in shortest round-trip form.
    Float(f64),
    /// Boolean, rendered as `True` or `False`.
    Bool(bool),
    /// Date-time with offset, rendered as `MM/dd/yyyy HH:mm:ss zzz`.
    DateTime(DateTime<FixedOffset>),
}

impl RouteValue {
    /// Format the value independently of any user culture.
    ///
    /// Numbers use `.` as decimal separator, booleans are `True`/`False` and
    /// date-times use `MM/dd/yyyy HH:mm:ss zzz`.
    pub fn to_invariant_string(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format_invariant_float(*f),
            Self::Bool(true) => "True".to_string(),
            Self::Bool(false) => "False".to_string(),
            Self::DateTime(dt) => dt.format(INVARIANT_DATE_TIME).to_string(),
        }
    }
}

/// Shortest round-trip rendering. Decimal exponents below -4 or from 15 up
/// switch to scientific notation with a signed, two-digit minimum exponent
/// (`1E+21`, `1E-07`).
fn format_invariant_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f.is_sign_positive() {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else {
        let scientific = format!("{f:e}");
        let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
        let exponent: i32 = exponent.parse().unwrap_or(0);
        if f != 0.0 && !(-4..15).contains(&exponent) {
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{mantissa}E{sign}{:02}", exponent.abs())
        } else {
            f.to_string()
        }
    }
}

impl fmt::Display for RouteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_invariant_string())
    }
}

impl From<&str> for RouteValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for RouteValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for RouteValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for RouteValue {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for RouteValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for RouteValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<DateTime<FixedOffset>> for RouteValue {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self::DateTime(dt)
    }
}

impl From<DateTime<Utc>> for RouteValue {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt.into())
    }
}
