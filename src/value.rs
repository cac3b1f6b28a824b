//! Cell values and the parsing rules shared by filtering, sorting and loading.

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A single field value read off a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CellValue {
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Numeric view of the value. Text is parsed leniently, everything else
    /// that isn't a number yields None.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Text(s) => parse_numeric(s),
            _ => None,
        }
    }

    /// Day-resolution date view of the value.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::DateTime(dt) => Some(dt.date()),
            CellValue::Text(s) => parse_date(s),
            _ => None,
        }
    }

    /// Canonical string form used by text filters, global search and rendering.
    /// Null has no string form.
    pub fn to_display(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            other => Some(other.to_string()),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            CellValue::Bool(_) => 0,
            CellValue::Number(_) => 1,
            CellValue::Date(_) | CellValue::DateTime(_) => 2,
            CellValue::Text(_) => 3,
            CellValue::Null => 4,
        }
    }

    /// Total order over non-null values used by the sort engine.
    ///
    /// Values of the same family compare naturally (text case-insensitively);
    /// mixed families fall back to a fixed family order.
    pub fn sort_cmp(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Number(a), CellValue::Number(b)) => a.total_cmp(b),
            (CellValue::Bool(a), CellValue::Bool(b)) => a.cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a
                .trim()
                .to_lowercase()
                .cmp(&b.trim().to_lowercase()),
            (
                CellValue::Date(_) | CellValue::DateTime(_),
                CellValue::Date(_) | CellValue::DateTime(_),
            ) => date_key(self).cmp(&date_key(other)),
            (a, b) => a.type_rank().cmp(&b.type_rank()),
        }
    }
}

fn date_key(value: &CellValue) -> Option<NaiveDateTime> {
    match value {
        CellValue::Date(d) => d.and_hms_opt(0, 0, 0),
        CellValue::DateTime(dt) => Some(*dt),
        _ => None,
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::DateTime(dt)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Null)
    }
}

/// Parse a string that may contain a formatted number.
///
/// Handles:
/// - Regular numbers: "123.45", "-123.45", "1.23e-5"
/// - Thousands separators: "1,234.56"
/// - Currency: "$1,234.56", "-$1,234.56", "($12)"
/// - Percentages: "15%", "15.5%" (returns 0.15, 0.155)
///
/// Non-finite results are rejected.
pub fn parse_numeric(s: &str) -> Option<f64> {
    let trimmed = s.trim();

    if trimmed.is_empty() {
        return None;
    }

    let finite = |n: f64| if n.is_finite() { Some(n) } else { None };

    if let Ok(n) = trimmed.parse::<f64>() {
        return finite(n);
    }

    if let Some(without_pct) = trimmed.strip_suffix('%') {
        let cleaned: String = without_pct.trim().chars().filter(|c| *c != ',').collect();
        if let Ok(n) = cleaned.parse::<f64>() {
            return finite(n / 100.0);
        }
    }

    let currency_chars = ['$', '€', '£', '¥'];

    // -$123 or ($123)
    let (is_negative, body) = if let Some(rest) = trimmed.strip_prefix('-') {
        (true, rest)
    } else if trimmed.starts_with('(') && trimmed.ends_with(')') && trimmed.len() >= 2 {
        (true, &trimmed[1..trimmed.len() - 1])
    } else {
        (false, trimmed)
    };

    let body = body.trim();
    if let Some(symbol) = currency_chars.iter().find(|&&c| body.starts_with(c)) {
        let cleaned: String = body[symbol.len_utf8()..]
            .chars()
            .filter(|c| *c != ',')
            .collect();
        if let Ok(n) = cleaned.trim().parse::<f64>() {
            return finite(if is_negative { -n } else { n });
        }
    }

    let cleaned: String = trimmed.chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().and_then(finite)
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Parse a date-like string down to day resolution.
///
/// Accepts ISO dates, a few common separators, naive datetimes and RFC 3339
/// timestamps (offset discarded).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    parse_datetime(s).map(|dt| dt.date())
}

/// Parse a date-like string, keeping the time of day when present.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }

    chrono::DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.naive_local())
}
