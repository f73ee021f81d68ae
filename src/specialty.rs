//! Specialty Recognizers (§4.2): pattern-match WHERE sub-expressions that
//! have a MongoDB-native form instead of a generic comparison.

use bson::{oid::ObjectId, Bson};
use regex::Regex;

use crate::ast::{CompareOp, Expr, Literal};
use crate::coerce;
use crate::config::FieldType;
use crate::error::{Result, TranslateError};

/// The outcome of attempting to recognize a specialty pattern: either it
/// doesn't apply (`None`) or it produces the filter fragment for `col`.
pub enum Recognized {
    /// `(column path, filter value to place at that key)`.
    Match(Vec<String>, Bson),
}

/// Try every specialty pattern against a top-level comparison. Returns
/// `Ok(None)` when none match, so the caller falls through to the
/// generic comparison lowering in the Where Lowerer.
pub fn recognize_comparison(op: CompareOp, left: &Expr, right: &Expr) -> Result<Option<Recognized>> {
    if let Some(result) = recognize_regex_match_call(left, right)? {
        return Ok(Some(result));
    }
    if let Some(result) = recognize_date_function(op, left, right)? {
        return Ok(Some(result));
    }
    if let Some(result) = recognize_object_id(op, left, right)? {
        return Ok(Some(result));
    }
    if let Some(result) = recognize_bindata(op, left, right)? {
        return Ok(Some(result));
    }
    if let Some(result) = recognize_date_literal(op, left, right)? {
        return Ok(Some(result));
    }
    Ok(None)
}

/// `regexMatch(col, 'pat' [, 'opts'])` as a bare boolean call, or compared
/// to `true`/`false`.
pub fn recognize_regex_match_call(left: &Expr, right: &Expr) -> Result<Option<Recognized>> {
    let (call, expect_true) = match (left, right) {
        (Expr::Function { name, .. }, Expr::Literal(Literal::Boolean(value)))
            if name.eq_ignore_ascii_case("regexMatch") =>
        {
            (left, *value)
        }
        _ => return Ok(None),
    };

    build_regex_match(call, expect_true)
}

/// A free-standing `regexMatch(...)` call with no comparison at all.
pub fn recognize_regex_match_bare(call: &Expr) -> Result<Option<Recognized>> {
    match call {
        Expr::Function { name, .. } if name.eq_ignore_ascii_case("regexMatch") => {
            build_regex_match(call, true)
        }
        _ => Ok(None),
    }
}

fn build_regex_match(call: &Expr, expect_true: bool) -> Result<Option<Recognized>> {
    let Expr::Function { args, .. } = call else {
        return Ok(None);
    };
    if !expect_true {
        return Err(TranslateError::Syntax(
            "regexMatch comparison to false is not supported".to_string(),
        ));
    }
    if args.len() < 2 || args.len() > 3 {
        return Ok(None);
    }
    let column = match args[0].column_name() {
        Some(name) => name,
        None => return Ok(None),
    };
    let pattern = match &args[1] {
        Expr::Literal(Literal::String(pattern)) => pattern.clone(),
        _ => return Ok(None),
    };

    Regex::new(&pattern)?;

    let mut doc = bson::Document::new();
    doc.insert("$regex", Bson::String(pattern));
    if let Some(Expr::Literal(Literal::String(opts))) = args.get(2) {
        doc.insert("$options", Bson::String(opts.clone()));
    }

    Ok(Some(Recognized::Match(
        column.split('.').map(str::to_string).collect(),
        Bson::Document(doc),
    )))
}

/// `date(col, 'fmt') OP 'literal'`.
fn recognize_date_function(op: CompareOp, left: &Expr, right: &Expr) -> Result<Option<Recognized>> {
    let Expr::Function { name, args } = left else {
        return Ok(None);
    };
    if !name.eq_ignore_ascii_case("date") || args.len() != 2 {
        return Ok(None);
    }
    let column = match args[0].column_name() {
        Some(name) => name,
        None => return Ok(None),
    };

    let mongo_op = compare_op_key(op)?;
    let value = coerce::coerce(right, FieldType::Date)?;

    let mut doc = bson::Document::new();
    doc.insert(mongo_op, value);

    Ok(Some(Recognized::Match(
        column.split('.').map(str::to_string).collect(),
        Bson::Document(doc),
    )))
}

/// `col OP date('literal')` — the mirror image of [`recognize_date_function`]
/// where the function call is on the right-hand side.
fn recognize_date_literal(op: CompareOp, left: &Expr, right: &Expr) -> Result<Option<Recognized>> {
    let column = match left.column_name() {
        Some(name) => name,
        None => return Ok(None),
    };
    let Expr::Function { name, args } = right else {
        return Ok(None);
    };
    if !name.eq_ignore_ascii_case("date") || args.len() != 1 {
        return Ok(None);
    }

    let mongo_op = compare_op_key(op)?;
    let value = coerce::coerce(&args[0], FieldType::Date)?;

    let mut doc = bson::Document::new();
    doc.insert(mongo_op, value);

    Ok(Some(Recognized::Match(
        column.split('.').map(str::to_string).collect(),
        Bson::Document(doc),
    )))
}

/// `OBJECTID('col') OP 'hex24'`.
fn recognize_object_id(op: CompareOp, left: &Expr, right: &Expr) -> Result<Option<Recognized>> {
    let Expr::Function { name, args } = left else {
        return Ok(None);
    };
    if !name.eq_ignore_ascii_case("OBJECTID") || args.len() != 1 {
        return Ok(None);
    }
    let column = match args[0].column_name() {
        Some(name) => name,
        None => return Ok(None),
    };
    let hex = match right {
        Expr::Literal(Literal::String(hex)) => hex.clone(),
        _ => return Ok(None),
    };

    let oid = ObjectId::parse_str(&hex)
        .map_err(|_| TranslateError::Syntax(format!("invalid ObjectId: {}", hex)))?;

    let value = match op {
        CompareOp::Eq => Bson::ObjectId(oid),
        CompareOp::Ne => {
            let mut doc = bson::Document::new();
            doc.insert("$ne", Bson::ObjectId(oid));
            Bson::Document(doc)
        }
        _ => {
            return Err(TranslateError::Syntax(
                "OBJECTID only supports = and !=".to_string(),
            ));
        }
    };

    Ok(Some(Recognized::Match(
        column.split('.').map(str::to_string).collect(),
        value,
    )))
}

/// `OBJECTID('col') IN (...)`/`NOT IN`.
pub fn recognize_object_id_in(left: &Expr, items: &[Expr], negated: bool) -> Result<Option<Recognized>> {
    let Expr::Function { name, args } = left else {
        return Ok(None);
    };
    if !name.eq_ignore_ascii_case("OBJECTID") || args.len() != 1 {
        return Ok(None);
    }
    let column = match args[0].column_name() {
        Some(name) => name,
        None => return Ok(None),
    };

    let mut oids = Vec::with_capacity(items.len());
    for item in items {
        let hex = match item {
            Expr::Literal(Literal::String(hex)) => hex.clone(),
            _ => return Ok(None),
        };
        let oid = ObjectId::parse_str(&hex)
            .map_err(|_| TranslateError::Syntax(format!("invalid ObjectId: {}", hex)))?;
        oids.push(Bson::ObjectId(oid));
    }

    let key = if negated { "$nin" } else { "$in" };
    let mut doc = bson::Document::new();
    doc.insert(key, Bson::Array(oids));

    Ok(Some(Recognized::Match(
        column.split('.').map(str::to_string).collect(),
        Bson::Document(doc),
    )))
}

/// `col = Bindata('base64')`.
fn recognize_bindata(op: CompareOp, left: &Expr, right: &Expr) -> Result<Option<Recognized>> {
    let column = match left.column_name() {
        Some(name) => name,
        None => return Ok(None),
    };
    let Expr::Function { name, args } = right else {
        return Ok(None);
    };
    if !name.eq_ignore_ascii_case("Bindata") || args.len() != 1 {
        return Ok(None);
    }
    if op != CompareOp::Eq {
        return Err(TranslateError::Syntax(
            "Bindata comparisons only support =".to_string(),
        ));
    }
    let base64 = match &args[0] {
        Expr::Literal(Literal::String(base64)) => base64.clone(),
        _ => return Ok(None),
    };

    let mut binary = bson::Document::new();
    binary.insert("$binary", Bson::String(base64));
    binary.insert("$type", Bson::String("03".to_string()));

    let mut doc = bson::Document::new();
    doc.insert("$eq", Bson::Document(binary));

    Ok(Some(Recognized::Match(
        column.split('.').map(str::to_string).collect(),
        Bson::Document(doc),
    )))
}

fn compare_op_key(op: CompareOp) -> Result<&'static str> {
    match op {
        CompareOp::Eq => Ok("$eq"),
        CompareOp::Gt => Ok("$gt"),
        CompareOp::Ge => Ok("$gte"),
        CompareOp::Lt => Ok("$lt"),
        CompareOp::Le => Ok("$lte"),
        CompareOp::Ne => Ok("$ne"),
        _ => Err(TranslateError::Syntax(
            "unsupported operator for this specialty comparison".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    fn col(name: &str) -> Expr {
        Expr::Column(vec![name.to_string()])
    }

    #[test]
    fn recognizes_regex_match_true() {
        let call = Expr::Function {
            name: "regexMatch".to_string(),
            args: vec![col("name"), Expr::Literal(Literal::String("A.*".to_string()))],
        };
        let result = recognize_regex_match_call(&call, &Expr::Literal(Literal::Boolean(true)))
            .unwrap()
            .unwrap();
        match result {
            Recognized::Match(path, _) => assert_eq!(path, vec!["name".to_string()]),
        }
    }

    #[test]
    fn rejects_regex_match_false() {
        let call = Expr::Function {
            name: "regexMatch".to_string(),
            args: vec![col("name"), Expr::Literal(Literal::String("A.*".to_string()))],
        };
        let err = recognize_regex_match_call(&call, &Expr::Literal(Literal::Boolean(false)))
            .unwrap_err();
        assert!(matches!(err, TranslateError::Syntax(_)));
    }

    #[test]
    fn rejects_invalid_regex() {
        let call = Expr::Function {
            name: "regexMatch".to_string(),
            args: vec![col("name"), Expr::Literal(Literal::String("(".to_string()))],
        };
        let err = recognize_regex_match_call(&call, &Expr::Literal(Literal::Boolean(true)))
            .unwrap_err();
        assert!(matches!(err, TranslateError::BadRegex(_)));
    }

    #[test]
    fn recognizes_object_id_equality() {
        let call = Expr::Function {
            name: "OBJECTID".to_string(),
            args: vec![col("_id")],
        };
        let hex = Expr::Literal(Literal::String("507f1f77bcf86cd799439011".to_string()));
        let result = recognize_object_id(CompareOp::Eq, &call, &hex).unwrap().unwrap();
        match result {
            Recognized::Match(path, value) => {
                assert_eq!(path, vec!["_id".to_string()]);
                assert!(matches!(value, Bson::ObjectId(_)));
            }
        }
    }

    #[test]
    fn recognizes_bindata_equality() {
        let col_expr = col("payload");
        let call = Expr::Function {
            name: "Bindata".to_string(),
            args: vec![Expr::Literal(Literal::String("AAAA".to_string()))],
        };
        let result = recognize_bindata(CompareOp::Eq, &col_expr, &call).unwrap().unwrap();
        match result {
            Recognized::Match(path, _) => assert_eq!(path, vec!["payload".to_string()]),
        }
    }

    #[test]
    fn recognizes_date_function_comparison() {
        let call = Expr::Function {
            name: "date".to_string(),
            args: vec![col("created"), Expr::Literal(Literal::String("%Y-%m-%d".to_string()))],
        };
        let literal = Expr::Literal(Literal::String("2020-01-02".to_string()));
        let result = recognize_date_function(CompareOp::Gt, &call, &literal)
            .unwrap()
            .unwrap();
        match result {
            Recognized::Match(path, _) => assert_eq!(path, vec!["created".to_string()]),
        }
    }

    #[test]
    fn non_specialty_call_returns_none() {
        let call = Expr::Function {
            name: "toUpper".to_string(),
            args: vec![col("name")],
        };
        let result = recognize_comparison(CompareOp::Eq, &call, &Expr::Literal(Literal::Boolean(true)))
            .unwrap();
        assert!(result.is_none());
    }
}
