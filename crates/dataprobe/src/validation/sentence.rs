//! Plain-English rule sentences.
//!
//! ```text
//! the 'age' column should not be null
//! the 'age' column should be between 0 and 120
//! the 'name' column should not be empty
//! the 'price' column should be greater than 0
//! the 'discount' column should be less than 50
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::error::{ProbeError, Result};

use super::rule::{ExpectationType, ValidationRule};

#[derive(Debug, Clone, Copy)]
enum SentenceKind {
    NotNull,
    Between,
    NotEmpty,
    GreaterThan,
    LessThan,
}

const NUMBER: &str = r"(-?\d+(?:\.\d+)?)";

static SENTENCE_PATTERNS: Lazy<Vec<(Regex, SentenceKind)>> = Lazy::new(|| {
    [
        (r"should not be null".to_string(), SentenceKind::NotNull),
        (format!(r"should be between {NUMBER} and {NUMBER}"), SentenceKind::Between),
        (r"should not be empty".to_string(), SentenceKind::NotEmpty),
        (format!(r"should be greater than {NUMBER}"), SentenceKind::GreaterThan),
        (format!(r"should be less than {NUMBER}"), SentenceKind::LessThan),
    ]
    .into_iter()
    .filter_map(|(tail, kind)| {
        Regex::new(&format!(r"(?i)the '(.+)' column {tail}"))
            .ok()
            .map(|re| (re, kind))
    })
    .collect()
});

/// Turn one sentence into a rule. Matching ignores case; the column name
/// keeps the case it was written in.
pub fn parse_rule_sentence(sentence: &str) -> Result<ValidationRule> {
    for (regex, kind) in SENTENCE_PATTERNS.iter() {
        let Some(caps) = regex.captures(sentence) else {
            continue;
        };
        let column = &caps[1];
        let number = |i: usize| caps[i].parse::<f64>().unwrap_or_default();
        return Ok(match kind {
            SentenceKind::NotNull => ValidationRule::not_null(column),
            SentenceKind::Between => ValidationRule::between(column, number(2), number(3)),
            SentenceKind::NotEmpty => {
                ValidationRule::new(ExpectationType::NotBeEmpty).with_kwarg("column", column)
            }
            SentenceKind::GreaterThan => ValidationRule::greater_than(column, number(2)),
            SentenceKind::LessThan => ValidationRule::less_than(column, number(2)),
        });
    }
    Err(ProbeError::InvalidRule {
        expectation_type: "sentence".to_string(),
        message: format!("could not parse rule: {sentence}"),
    })
}

/// Parse one sentence per line. Blank lines and `#` comments are ignored;
/// lines that do not parse are logged and skipped.
pub fn parse_rule_sentences(text: &str) -> Vec<ValidationRule> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| match parse_rule_sentence(line) {
            Ok(rule) => Some(rule),
            Err(err) => {
                warn!(line, error = %err, "skipping rule sentence");
                None
            }
        })
        .collect()
}
