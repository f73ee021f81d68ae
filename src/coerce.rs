//! Value Coercer (§4.1): turns a literal AST node into a typed BSON value,
//! guided by the declared [`FieldType`] of the column it is compared to.

use bson::Bson;
use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::ast::{Expr, Literal};
use crate::config::FieldType;
use crate::error::{Result, TranslateError};

/// Coerce `expr` (a literal, or a bare column reference used as a value)
/// against `field_type`, producing the BSON value that belongs in a
/// filter or projection document.
pub fn coerce(expr: &Expr, field_type: FieldType) -> Result<Bson> {
    match expr {
        Expr::Literal(literal) => coerce_literal(literal, field_type),
        Expr::Column(parts) => Ok(Bson::String(parts.join("."))),
        Expr::Signed(inner) => {
            let value = coerce(inner, field_type)?;
            negate(value)
        }
        other => Err(TranslateError::Syntax(format!(
            "cannot coerce expression {:?} to a value",
            other
        ))),
    }
}

fn negate(value: Bson) -> Result<Bson> {
    match value {
        Bson::Int64(v) => Ok(Bson::Int64(-v)),
        Bson::Double(v) => Ok(Bson::Double(-v)),
        other => Err(TranslateError::Syntax(format!(
            "cannot negate non-numeric value {:?}",
            other
        ))),
    }
}

fn coerce_literal(literal: &Literal, field_type: FieldType) -> Result<Bson> {
    match field_type {
        FieldType::Unknown => coerce_unknown(literal),
        FieldType::String => coerce_string(literal),
        FieldType::Number => coerce_number(literal),
        FieldType::Date => coerce_date(literal),
        FieldType::Boolean => coerce_boolean(literal),
    }
}

fn coerce_unknown(literal: &Literal) -> Result<Bson> {
    match literal {
        Literal::Long(v) => Ok(Bson::Int64(*v)),
        Literal::Double(v) => Ok(Bson::Double(*v)),
        Literal::Boolean(v) => Ok(Bson::Boolean(*v)),
        Literal::Null => Ok(Bson::Null),
        Literal::String(text) => {
            let unescaped = unescape_quotes(text);
            match unescaped.to_ascii_lowercase().as_str() {
                "true" => Ok(Bson::Boolean(true)),
                "false" => Ok(Bson::Boolean(false)),
                _ => Ok(Bson::String(unescaped)),
            }
        }
    }
}

fn coerce_string(literal: &Literal) -> Result<Bson> {
    match literal {
        Literal::String(text) => Ok(Bson::String(unescape_quotes(text))),
        Literal::Long(v) => Ok(Bson::String(v.to_string())),
        Literal::Double(v) => Ok(Bson::String(v.to_string())),
        Literal::Boolean(v) => Ok(Bson::String(v.to_string())),
        Literal::Null => Ok(Bson::Null),
    }
}

fn coerce_number(literal: &Literal) -> Result<Bson> {
    let text = match literal {
        Literal::Long(v) => return Ok(Bson::Int64(*v)),
        Literal::Double(v) => return Ok(Bson::Double(*v)),
        Literal::String(text) => unescape_quotes(text),
        Literal::Boolean(_) | Literal::Null => {
            return Err(TranslateError::BadNumber(format!("{:?}", literal)));
        }
    };

    if let Ok(v) = text.parse::<i64>() {
        return Ok(Bson::Int64(v));
    }
    if let Ok(v) = text.parse::<f64>() {
        return Ok(Bson::Double(v));
    }
    if let Ok(v) = text.parse::<f32>() {
        return Ok(Bson::Double(v as f64));
    }
    Err(TranslateError::BadNumber(text))
}

fn coerce_boolean(literal: &Literal) -> Result<Bson> {
    match literal {
        Literal::Boolean(v) => Ok(Bson::Boolean(*v)),
        Literal::String(text) => {
            let unescaped = unescape_quotes(text);
            unescaped
                .parse::<bool>()
                .map(Bson::Boolean)
                .map_err(|_| TranslateError::BadDate(format!("could not convert {} to a boolean", unescaped)))
        }
        Literal::Long(v) => Ok(Bson::Boolean(*v != 0)),
        other => Err(TranslateError::BadDate(format!(
            "could not convert {:?} to a boolean",
            other
        ))),
    }
}

fn coerce_date(literal: &Literal) -> Result<Bson> {
    let text = match literal {
        Literal::String(text) => unescape_quotes(text),
        other => {
            return Err(TranslateError::BadDate(format!("{:?}", other)));
        }
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
        return Ok(Bson::DateTime(bson::DateTime::from_millis(
            dt.timestamp_millis(),
        )));
    }
    if let Ok(date) = NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
        return Ok(date_to_bson(date));
    }
    if let Ok(date) = NaiveDate::parse_from_str(&text, "%Y%m%d") {
        return Ok(date_to_bson(date));
    }
    if text.trim().to_ascii_lowercase().ends_with("ago") {
        return parse_natural_language_date(&text)
            .map(|date| date_to_bson(date.date_naive()))
            .ok_or(TranslateError::BadNaturalLanguageDate(text));
    }

    Err(TranslateError::BadDate(text))
}

fn date_to_bson(date: NaiveDate) -> Bson {
    let datetime = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
    Bson::DateTime(bson::DateTime::from_millis(
        datetime.and_utc().timestamp_millis(),
    ))
}

/// A small hand-written grammar for "<N> <unit(s)> ago" phrasings. There is
/// no corpus-supplied natural-language date crate to reach for, so this is
/// the one deliberately hand-rolled piece of the coercer (see DESIGN.md).
fn parse_natural_language_date(text: &str) -> Option<DateTime<Utc>> {
    let lowered = text.trim().to_ascii_lowercase();
    let stripped = lowered.strip_suffix("ago")?.trim();
    let mut parts = stripped.split_whitespace();
    let amount: i64 = parts.next()?.parse().ok()?;
    let unit = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let duration = match unit.trim_end_matches('s') {
        "second" => Duration::seconds(amount),
        "minute" => Duration::minutes(amount),
        "hour" => Duration::hours(amount),
        "day" => Duration::days(amount),
        "week" => Duration::weeks(amount),
        "month" => Duration::days(amount * 30),
        "year" => Duration::days(amount * 365),
        _ => return None,
    };

    Utc::now().checked_sub_signed(duration)
}

fn unescape_quotes(text: &str) -> String {
    text.replace("''", "'").replace("\"\"", "\"")
}

/// Validate a LIMIT/OFFSET value against the Int32 ceiling (§4.1).
pub fn check_int32_range(value: i64) -> Result<i64> {
    if value > i64::from(i32::MAX) {
        Err(TranslateError::ValueOutOfRange(value.to_string()))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_recognizes_boolean_text() {
        let value = coerce(&Expr::Literal(Literal::String("true".to_string())), FieldType::Unknown).unwrap();
        assert_eq!(value, Bson::Boolean(true));
    }

    #[test]
    fn string_type_coerces_quoted_number() {
        let value = coerce(&Expr::Literal(Literal::String("1".to_string())), FieldType::Number).unwrap();
        assert_eq!(value, Bson::Int64(1));
    }

    #[test]
    fn string_type_collapses_doubled_quotes() {
        let value = coerce(
            &Expr::Literal(Literal::String("it''s".to_string())),
            FieldType::String,
        )
        .unwrap();
        assert_eq!(value, Bson::String("it's".to_string()));
    }

    #[test]
    fn number_type_rejects_non_numeric_text() {
        let err = coerce(
            &Expr::Literal(Literal::String("nope".to_string())),
            FieldType::Number,
        )
        .unwrap_err();
        assert!(matches!(err, TranslateError::BadNumber(_)));
    }

    #[test]
    fn number_type_rejects_boolean_literal() {
        let err = coerce(&Expr::Literal(Literal::Boolean(true)), FieldType::Number).unwrap_err();
        assert!(matches!(err, TranslateError::BadNumber(_)));
    }

    #[test]
    fn date_type_parses_iso_date() {
        let value = coerce(
            &Expr::Literal(Literal::String("2020-01-02".to_string())),
            FieldType::Date,
        )
        .unwrap();
        assert!(matches!(value, Bson::DateTime(_)));
    }

    #[test]
    fn date_type_parses_compact_date() {
        let value = coerce(
            &Expr::Literal(Literal::String("20200102".to_string())),
            FieldType::Date,
        )
        .unwrap();
        assert!(matches!(value, Bson::DateTime(_)));
    }

    #[test]
    fn date_type_parses_natural_language_ago() {
        let value = coerce(
            &Expr::Literal(Literal::String("45 days ago".to_string())),
            FieldType::Date,
        )
        .unwrap();
        assert!(matches!(value, Bson::DateTime(_)));
    }

    #[test]
    fn date_type_fails_on_garbage() {
        let err = coerce(
            &Expr::Literal(Literal::String("not a date".to_string())),
            FieldType::Date,
        )
        .unwrap_err();
        assert!(matches!(err, TranslateError::BadDate(_)));
    }

    #[test]
    fn date_type_fails_on_unrecognized_natural_language_unit() {
        let err = coerce(
            &Expr::Literal(Literal::String("45 fortnights ago".to_string())),
            FieldType::Date,
        )
        .unwrap_err();
        assert!(matches!(err, TranslateError::BadNaturalLanguageDate(_)));
    }

    #[test]
    fn check_int32_range_rejects_overflow() {
        let err = check_int32_range(i64::from(i32::MAX) + 1).unwrap_err();
        assert!(matches!(err, TranslateError::ValueOutOfRange(_)));
    }

    #[test]
    fn check_int32_range_accepts_max() {
        assert_eq!(
            check_int32_range(i64::from(i32::MAX)).unwrap(),
            i64::from(i32::MAX)
        );
    }

    #[test]
    fn signed_literal_negates_number() {
        let value = coerce(
            &Expr::Signed(Box::new(Expr::Literal(Literal::Long(5)))),
            FieldType::Unknown,
        )
        .unwrap();
        assert_eq!(value, Bson::Int64(-5));
    }
}
