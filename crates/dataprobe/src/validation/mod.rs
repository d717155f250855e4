//! Declarative rule validation over tabular datasets.

mod engine;
mod expectations;
mod frame;
mod report;
mod rule;
mod sentence;

pub use engine::{RuleValidationEngine, rename_references};
pub use expectations::{
    BetweenExpectation, Expectation, GreaterThanExpectation, LessThanExpectation,
    NotEmptyExpectation, NotNullExpectation, PairEqualExpectation, RegexExpectation,
    default_expectations,
};
pub use frame::{Frame, space_renames};
pub use report::{
    ExceptionInfo, PARTIAL_UNEXPECTED_LIMIT, ResultDetail, RowOutcome, RuleResult,
    ValidationReport, ValidationStatistics,
};
pub use rule::{ExpectationType, RuleMeta, ValidationRule};
pub use sentence::{parse_rule_sentence, parse_rule_sentences};
