//! Numeric coercion tolerant of human-entered formats.
//!
//! Handles currency symbols (`$`, `£`, `€`, `¥`), thousands separators,
//! parenthesised negatives (`(100)` is `-100`) and trailing percentages
//! (`25%` is `0.25`).

use crate::input::CellValue;

use super::CoercionError;

const CURRENCY_SYMBOLS: &[char] = &['$', '£', '€', '¥'];

/// Parse a rendered number.
pub fn parse_number(raw: &str) -> Result<f64, CoercionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoercionError::Empty);
    }

    let (negative, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let mut cleaned: String = body
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',' && !c.is_whitespace())
        .collect();

    let percent = cleaned.contains('%');
    if percent {
        cleaned.retain(|c| c != '%');
    }

    let mut value: f64 = cleaned
        .parse()
        .map_err(|_| CoercionError::NotNumeric(raw.to_string()))?;
    if !value.is_finite() {
        return Err(CoercionError::NotNumeric(raw.to_string()));
    }

    if negative {
        value = -value;
    }
    if percent {
        value /= 100.0;
    }
    Ok(value)
}

/// Coerce a single cell to a number.
pub fn to_number(value: &CellValue) -> Result<f64, CoercionError> {
    match value {
        CellValue::Null => Err(CoercionError::Empty),
        CellValue::Int(i) => Ok(*i as f64),
        CellValue::Float(v) if v.is_finite() => Ok(*v),
        CellValue::Float(_) => Err(CoercionError::Empty),
        CellValue::Text(s) => parse_number(s),
        other => Err(CoercionError::NotNumeric(other.render())),
    }
}

/// Round half away from zero to `decimal_places`.
pub fn round_to(value: f64, decimal_places: u32) -> f64 {
    let factor = 10f64.powi(decimal_places as i32);
    let rounded = (value * factor).round() / factor;
    if rounded.is_finite() { rounded } else { value }
}

/// Round to two decimals, the precision used for every reported percentage.
pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

/// Coerce a whole column. Values that fail become `None`; rounding is applied
/// only when `decimal_places` is given.
pub fn coerce_numeric(values: &[CellValue], decimal_places: Option<u32>) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|v| {
            to_number(v)
                .ok()
                .map(|n| decimal_places.map(|dp| round_to(n, dp)).unwrap_or(n))
        })
        .collect()
}

/// Number of digits after the decimal point in a rendered number.
pub fn decimal_places_of(rendered: &str) -> usize {
    let body = rendered.split(['e', 'E']).next().unwrap_or(rendered);
    body.split_once('.')
        .map(|(_, frac)| frac.chars().take_while(char::is_ascii_digit).count())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_formats() {
        let parsed: Vec<f64> = ["$100", "(50)", "25%", "1,200.5"]
            .iter()
            .map(|s| parse_number(s).unwrap())
            .collect();
        assert_eq!(parsed, vec![100.0, -50.0, 0.25, 1200.5]);
    }

    #[test]
    fn test_currency_and_whitespace() {
        assert_eq!(parse_number(" € 1 234,50 ").unwrap(), 123450.0);
        assert_eq!(parse_number("£-3.5").unwrap(), -3.5);
        assert_eq!(parse_number("(¥1,000)").unwrap(), -1000.0);
        assert_eq!(parse_number("(12.5%)").unwrap(), -0.125);
    }

    #[test]
    fn test_failures_are_errors_not_panics() {
        assert_eq!(parse_number(""), Err(CoercionError::Empty));
        assert!(matches!(parse_number("abc"), Err(CoercionError::NotNumeric(_))));
        assert!(matches!(parse_number("inf"), Err(CoercionError::NotNumeric(_))));
        assert!(matches!(parse_number("1e999"), Err(CoercionError::NotNumeric(_))));
    }

    #[test]
    fn test_native_cells() {
        assert_eq!(to_number(&CellValue::Int(4)).unwrap(), 4.0);
        assert_eq!(to_number(&CellValue::Float(2.5)).unwrap(), 2.5);
        assert!(to_number(&CellValue::Bool(true)).is_err());
        assert!(to_number(&CellValue::Null).is_err());
    }

    #[test]
    fn test_column_rounding_only_when_requested() {
        let values = vec![
            CellValue::Text("1.23456".into()),
            CellValue::Text("oops".into()),
        ];
        assert_eq!(coerce_numeric(&values, None), vec![Some(1.23456), None]);
        assert_eq!(coerce_numeric(&values, Some(2)), vec![Some(1.23), None]);
    }

    #[test]
    fn test_decimal_places_of() {
        assert_eq!(decimal_places_of("1.250"), 3);
        assert_eq!(decimal_places_of("42"), 0);
        assert_eq!(decimal_places_of("1.5e-7"), 1);
    }
}
