//! Datetime coercion with format fallback and spreadsheet serial dates.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::warn;

use crate::input::CellValue;

use super::CoercionError;

/// Formats carrying a time component, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
];

/// Date-only formats, tried in order. Month-first wins over day-first.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%Y.%m.%d",
    "%d.%m.%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
];

/// Day zero of spreadsheet serial dates.
fn spreadsheet_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Parse a datetime in any of the commonly seen renderings.
///
/// `UTC`/`GMT` suffixes are dropped and offsets are normalized to UTC.
/// Compact `YYYYMMDD` strings are not accepted so that plain integers never
/// read as dates.
pub fn parse_flexible(raw: &str) -> Result<NaiveDateTime, CoercionError> {
    let cleaned = raw.replace("UTC", "").replace("GMT", "");
    let s = cleaned.trim();
    if s.is_empty() {
        return Err(CoercionError::Empty);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(dt);
            }
        }
    }
    Err(CoercionError::NotDatetime(raw.to_string()))
}

/// Parse with an explicit `strftime` format. Date-only formats yield midnight.
pub fn parse_with_format(raw: &str, format: &str) -> Result<NaiveDateTime, CoercionError> {
    let s = raw.trim();
    NaiveDateTime::parse_from_str(s, format)
        .or_else(|_| NaiveDate::parse_from_str(s, format).map(|d| d.and_time(NaiveTime::MIN)))
        .map_err(|_| CoercionError::NotDatetime(raw.to_string()))
}

/// Strict single-value check used by type classification: native temporal
/// cells and text in a recognised datetime rendering. Numbers never qualify.
pub fn parse_strict(value: &CellValue) -> Result<NaiveDateTime, CoercionError> {
    match value {
        CellValue::Date(_) | CellValue::DateTime(_) => {
            value.as_datetime().ok_or(CoercionError::Empty)
        }
        CellValue::Text(s) => parse_flexible(s),
        CellValue::Null => Err(CoercionError::Empty),
        other => Err(CoercionError::NotDatetime(other.render())),
    }
}

/// Whether text looks like a spreadsheet serial day number (5-6 digits,
/// optional fraction).
pub fn is_spreadsheet_serial(raw: &str) -> bool {
    let s = raw.trim();
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (s, None),
    };
    (5..=6).contains(&whole.len())
        && whole.bytes().all(|b| b.is_ascii_digit())
        && frac.is_none_or(|f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
}

/// Convert a serial day number (days since 1899-12-30) to a timestamp.
pub fn from_spreadsheet_serial(days: f64) -> Result<NaiveDateTime, CoercionError> {
    if !days.is_finite() {
        return Err(CoercionError::NotDatetime(days.to_string()));
    }
    let millis = (days * 86_400_000.0).round();
    if millis.abs() > 1e15 {
        return Err(CoercionError::NotDatetime(days.to_string()));
    }
    spreadsheet_epoch()
        .checked_add_signed(Duration::milliseconds(millis as i64))
        .ok_or_else(|| CoercionError::NotDatetime(days.to_string()))
}

/// Seconds since the Unix epoch, treating naive timestamps as UTC.
pub fn epoch_seconds(dt: &NaiveDateTime) -> i64 {
    dt.and_utc().timestamp()
}

/// Coerce a column to timestamps.
///
/// With an explicit `format`, values are parsed with it first; if more than
/// half of the non-null values fail, the column is re-parsed flexibly.
/// Without a format, a column holding any spreadsheet serial number is read
/// entirely as serial days; otherwise values are parsed flexibly.
/// Values that fail become `None`.
pub fn coerce_datetime(values: &[CellValue], format: Option<&str>) -> Vec<Option<NaiveDateTime>> {
    if let Some(fmt) = format {
        let parsed: Vec<Option<NaiveDateTime>> = values
            .iter()
            .map(|v| match v {
                CellValue::Text(s) => parse_with_format(s, fmt).ok(),
                other => other.as_datetime(),
            })
            .collect();

        let present = values.iter().filter(|v| !v.is_null()).count();
        let failed = values
            .iter()
            .zip(&parsed)
            .filter(|(v, p)| !v.is_null() && p.is_none())
            .count();
        if present > 0 && failed * 2 > present {
            warn!(
                format = fmt,
                failed, present, "explicit datetime format failed for most values, parsing flexibly"
            );
            return values.iter().map(flexible_cell).collect();
        }
        return parsed;
    }

    let serial = values
        .iter()
        .any(|v| matches!(v, CellValue::Text(s) if is_spreadsheet_serial(s)));
    if serial {
        return values
            .iter()
            .map(|v| match v {
                CellValue::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(|d| from_spreadsheet_serial(d).ok()),
                CellValue::Int(i) => from_spreadsheet_serial(*i as f64).ok(),
                CellValue::Float(f) => from_spreadsheet_serial(*f).ok(),
                other => other.as_datetime(),
            })
            .collect();
    }

    values.iter().map(flexible_cell).collect()
}

fn flexible_cell(value: &CellValue) -> Option<NaiveDateTime> {
    match value {
        CellValue::Text(s) => parse_flexible(s).ok(),
        other => other.as_datetime(),
    }
}
