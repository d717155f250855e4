//! Best-effort conversion of raw cells to canonical numeric, datetime and
//! boolean forms.
//!
//! Single values return a [`CoercionError`] on failure; column-level helpers
//! map failures to `None` and keep going, leaving the caller to decide what a
//! high failure rate means.

mod datetime;
mod numeric;

use thiserror::Error;

use crate::input::CellValue;

pub use datetime::{
    coerce_datetime, epoch_seconds, from_spreadsheet_serial, is_spreadsheet_serial,
    parse_flexible, parse_strict, parse_with_format,
};
pub use numeric::{coerce_numeric, decimal_places_of, parse_number, round2, round_to, to_number};

/// Why a single value could not be coerced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("value is empty")]
    Empty,

    #[error("'{0}' is not a number")]
    NotNumeric(String),

    #[error("'{0}' is not a recognised date or datetime")]
    NotDatetime(String),

    #[error("'{0}' is not a boolean")]
    NotBoolean(String),
}

/// Tokens accepted as booleans during type classification (case-insensitive).
const BOOLEAN_TOKENS: &[&str] = &["true", "false", "t", "f", "yes", "no", "y", "n", "1", "0"];

/// Tokens that read as `true` when a boolean column is made numeric.
const TRUE_TOKENS: &[&str] = &["true", "yes", "y", "1", "t"];

/// Whether the cell renders as one of the boolean tokens. Floats render
/// as `1.0`/`0.0` and never match.
pub fn is_boolean_token(value: &CellValue) -> bool {
    match value {
        CellValue::Bool(_) => true,
        CellValue::Int(0) | CellValue::Int(1) => true,
        CellValue::Text(s) => {
            let lower = s.trim().to_lowercase();
            BOOLEAN_TOKENS.contains(&lower.as_str())
        }
        _ => false,
    }
}

/// Coerce a cell to a boolean.
pub fn to_bool(value: &CellValue) -> Result<bool, CoercionError> {
    match value {
        CellValue::Null => Err(CoercionError::Empty),
        CellValue::Bool(b) => Ok(*b),
        _ if is_boolean_token(value) => {
            let lower = value.render().trim().to_lowercase();
            Ok(TRUE_TOKENS.contains(&lower.as_str()))
        }
        other => Err(CoercionError::NotBoolean(other.render())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_tokens() {
        for token in ["TRUE", "no", "Y", "f", "1", "0"] {
            assert!(is_boolean_token(&CellValue::Text(token.into())), "{token}");
        }
        assert!(is_boolean_token(&CellValue::Int(1)));
        assert!(!is_boolean_token(&CellValue::Int(2)));
        assert!(!is_boolean_token(&CellValue::Text("maybe".into())));
        assert!(!is_boolean_token(&CellValue::Float(1.0)));
        assert!(!is_boolean_token(&CellValue::Float(0.0)));
    }

    #[test]
    fn test_to_bool() {
        assert_eq!(to_bool(&CellValue::Text("Yes".into())), Ok(true));
        assert_eq!(to_bool(&CellValue::Text("n".into())), Ok(false));
        assert_eq!(to_bool(&CellValue::Int(1)), Ok(true));
        assert!(matches!(to_bool(&CellValue::Float(0.0)), Err(CoercionError::NotBoolean(_))));
        assert!(matches!(
            to_bool(&CellValue::Text("maybe".into())),
            Err(CoercionError::NotBoolean(_))
        ));
    }
}
