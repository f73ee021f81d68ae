//! Error kind definitions for the translation core.

use std::fmt;

/// Crate-wide `Result` type using [`TranslateError`] as the error.
pub type Result<T> = std::result::Result<T, TranslateError>;

/// The single error type surfaced by lexing, parsing, and lowering.
///
/// Every variant maps to one exact trigger and (mostly) one fixed message
/// text, reproduced verbatim for compatibility with the system this
/// translator is modeled on — including its one real typo
/// ("suported") in the join-type message.
#[derive(Debug, Clone, PartialEq)]
pub enum TranslateError {
    /// A front-end syntax error (unexpected token, missing keyword, …).
    Syntax(String),
    /// Double-equals (`==`) or other unparseable token sequence.
    UnsupportedSql,
    /// Sub-select appears in the SELECT list.
    UnsupportedSelectExpression,
    /// Sub-select appears in the FROM clause.
    UnsupportedSubselect,
    /// A non-column/CASE/subtraction expression in a plain SELECT item.
    UnsupportedProjection,
    /// Same trigger as `UnsupportedProjection` but raised by the
    /// validator's final sweep over a non-grouped SELECT list, which
    /// carries its own historical message text.
    IllegalSelectExpression,
    /// DISTINCT over `*` or more than one column.
    UnsupportedDistinct,
    /// Multiple tables in FROM without a JOIN keyword.
    UnsupportedJoin,
    /// `NOT LIKE`.
    UnsupportedLike,
    /// Aggregate function called with zero or more than one argument.
    UnsupportedFunctionArity(String),
    /// Aggregate function name outside `{count, sum, avg, min, max}`.
    UnknownFunction(String),
    /// LIMIT/OFFSET exceeds `i32::MAX`.
    ValueOutOfRange(String),
    /// A DATE-typed value could not be parsed by any recognized format.
    BadDate(String),
    /// A natural-language date phrase ("45 days ago") could not be parsed.
    BadNaturalLanguageDate(String),
    /// A NUMBER-typed value could not be parsed as an integer or float.
    BadNumber(String),
    /// A `$regex` pattern failed to compile.
    BadRegex(String),
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslateError::Syntax(msg) => write!(f, "{}", msg),
            TranslateError::UnsupportedSql => write!(
                f,
                "unable to parse complete sql string. one reason for this is the use of double equals (==)."
            ),
            TranslateError::UnsupportedSelectExpression => {
                write!(f, "Unsupported subselect expression")
            }
            TranslateError::UnsupportedSubselect => {
                write!(f, "Only one simple table name is supported.")
            }
            TranslateError::UnsupportedProjection => {
                write!(f, "Unsupported project expression")
            }
            TranslateError::IllegalSelectExpression => write!(
                f,
                "illegal expression(s) found in select clause. Only column names supported"
            ),
            TranslateError::UnsupportedDistinct => {
                write!(f, "cannot run distinct one more than one column")
            }
            TranslateError::UnsupportedJoin => write!(f, "Join type not suported"),
            TranslateError::UnsupportedLike => write!(f, "NOT LIKE queries not supported"),
            TranslateError::UnsupportedFunctionArity(name) => {
                write!(f, "{} function can only have one parameter", name)
            }
            TranslateError::UnknownFunction(name) => {
                write!(f, "could not understand function: {}", name)
            }
            TranslateError::ValueOutOfRange(value) => {
                write!(f, "{}: value is too large", value)
            }
            TranslateError::BadDate(value) => {
                write!(f, "could not convert {} to a date", value)
            }
            TranslateError::BadNaturalLanguageDate(value) => {
                write!(f, "could not natural language date: {}", value)
            }
            TranslateError::BadNumber(value) => {
                write!(f, "could not convert {} to a number", value)
            }
            TranslateError::BadRegex(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TranslateError {}

impl From<bson::ser::Error> for TranslateError {
    fn from(err: bson::ser::Error) -> Self {
        TranslateError::Syntax(format!("BSON serialization error: {}", err))
    }
}

impl From<regex::Error> for TranslateError {
    fn from(err: regex::Error) -> Self {
        TranslateError::BadRegex(err.to_string())
    }
}

impl From<chrono::ParseError> for TranslateError {
    fn from(err: chrono::ParseError) -> Self {
        TranslateError::BadDate(err.to_string())
    }
}
