//! Arithmetic expressions over columns.
//!
//! Column names may contain spaces; they are located in the raw text before
//! tokenizing and swapped for numeric synthetic columns, so
//! `unit price * quantity` works without quoting.

mod ast;
mod evaluator;
mod lexer;

use thiserror::Error;

pub use ast::{BinaryOp, Expr, parse};
pub use evaluator::{Evaluation, ExpressionEvaluator, replace_whole_word, synthetic_name};
pub use lexer::{Token, tokenize};

/// Why an expression could not be parsed or evaluated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("expression is empty")]
    Empty,

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unterminated backtick quote starting at position {0}")]
    UnterminatedQuote(usize),

    #[error("name '{0}' is not a column")]
    UnknownIdentifier(String),

    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),
}
