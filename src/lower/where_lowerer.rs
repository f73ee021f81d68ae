//! Where Lowerer (C3): recursive descent over a WHERE expression AST,
//! one match arm per node variant (the tagged-union visitor of §9).

use bson::{Bson, Document};

use crate::ast::{CompareOp, Expr, LogicalOp};
use crate::coerce;
use crate::config::FieldTypeMap;
use crate::error::{Result, TranslateError};
use crate::specialty::{self, Recognized};

/// Lower a WHERE (or ON) expression to a MongoDB filter document.
pub fn lower(expr: &Expr, field_types: &FieldTypeMap) -> Result<Document> {
    match expr {
        Expr::Comparison { op, left, right } => lower_comparison(*op, left, right, field_types),
        Expr::InList {
            left,
            items,
            negated,
        } => lower_in_list(left, items, *negated, field_types),
        Expr::IsNull { expr, negated } => lower_is_null(expr, *negated),
        Expr::Logical { op, left, right } => lower_logical(*op, left, right, field_types),
        Expr::Not(inner) => lower_not(inner, field_types),
        Expr::Parens { inner, negated } => lower_parens(inner, *negated, field_types),
        Expr::Function { name, args } => lower_bare_function(name, args, field_types),
        Expr::Column(parts) => {
            let mut doc = Document::new();
            doc.insert(parts.join("."), Bson::Boolean(true));
            Ok(doc)
        }
        other => Err(TranslateError::Syntax(format!(
            "unsupported expression in WHERE clause: {:?}",
            other
        ))),
    }
}

fn lower_comparison(op: CompareOp, left: &Expr, right: &Expr, field_types: &FieldTypeMap) -> Result<Document> {
    if matches!(op, CompareOp::Like | CompareOp::NotLike) {
        return lower_like(op, left, right);
    }

    if let Some(Recognized::Match(path, value)) = specialty::recognize_comparison(op, left, right)? {
        let mut doc = Document::new();
        doc.insert(path.join("."), value);
        return Ok(doc);
    }

    if matches!(op, CompareOp::Eq | CompareOp::Ne) {
        let mongo_op = if op == CompareOp::Eq { "$eq" } else { "$ne" };

        if matches!(left, Expr::Function { .. }) || matches!(right, Expr::Function { .. }) {
            let lhs = expr_to_agg_operand(left, field_types)?;
            let rhs = expr_to_agg_operand(right, field_types)?;
            return Ok(wrap_expr(mongo_op, lhs, rhs));
        }

        if let (Some(l), Some(r)) = (left.column_name(), right.column_name()) {
            return Ok(wrap_expr(
                mongo_op,
                Bson::String(format!("${}", l)),
                Bson::String(format!("${}", r)),
            ));
        }
    }

    let (column, field_type, value_expr, reversed) = resolve_operand_order(left, right, field_types)?;
    let op = if reversed { flip(op) } else { op };
    let value = coerce::coerce(value_expr, field_type)?;

    let mut doc = Document::new();
    match op {
        CompareOp::Eq => {
            doc.insert(column, value);
        }
        CompareOp::Ne => {
            doc.insert(column, doc_with("$ne", value));
        }
        CompareOp::Gt => {
            doc.insert(column, doc_with("$gt", value));
        }
        CompareOp::Lt => {
            doc.insert(column, doc_with("$lt", value));
        }
        CompareOp::Ge => {
            doc.insert(column, doc_with("$gte", value));
        }
        CompareOp::Le => {
            doc.insert(column, doc_with("$lte", value));
        }
        CompareOp::Like | CompareOp::NotLike => unreachable!("handled above"),
    }
    Ok(doc)
}

fn lower_like(op: CompareOp, left: &Expr, right: &Expr) -> Result<Document> {
    if op == CompareOp::NotLike {
        return Err(TranslateError::UnsupportedLike);
    }
    let column = left
        .column_name()
        .ok_or_else(|| TranslateError::Syntax("LIKE requires a column on the left".to_string()))?;
    let pattern = match right {
        Expr::Literal(crate::ast::Literal::String(text)) => text.clone(),
        _ => {
            return Err(TranslateError::Syntax(
                "LIKE requires a string literal pattern".to_string(),
            ));
        }
    };
    let mut doc = Document::new();
    doc.insert(column, doc_with("$regex", Bson::String(translate_like_pattern(&pattern))));
    Ok(doc)
}

/// Translate SQL `LIKE` wildcards into an anchored regular expression:
/// `%` → any run, `_` → exactly one character, `[...]` character classes
/// are preserved and suffixed with `{1}`. Everything else is escaped.
pub fn translate_like_pattern(pattern: &str) -> String {
    let mut result = String::from("^");
    let mut literal = String::new();
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '%' => {
                flush_literal(&mut result, &mut literal);
                result.push_str(".*");
            }
            '_' => {
                flush_literal(&mut result, &mut literal);
                result.push_str(".{1}");
            }
            '[' => {
                flush_literal(&mut result, &mut literal);
                result.push('[');
                while let Some(next) = chars.next() {
                    result.push(next);
                    if next == ']' {
                        break;
                    }
                }
                result.push_str("{1}");
            }
            other => literal.push(other),
        }
    }
    flush_literal(&mut result, &mut literal);
    result.push('$');
    result
}

fn flush_literal(result: &mut String, literal: &mut String) {
    if !literal.is_empty() {
        result.push_str(&regex::escape(literal));
        literal.clear();
    }
}

fn lower_in_list(left: &Expr, items: &[Expr], negated: bool, field_types: &FieldTypeMap) -> Result<Document> {
    if let Some(Recognized::Match(path, value)) = specialty::recognize_object_id_in(left, items, negated)? {
        let mut doc = Document::new();
        doc.insert(path.join("."), value);
        return Ok(doc);
    }

    let key = if negated { "$nin" } else { "$in" };

    if let Some(column) = left.column_name() {
        let field_type = field_types.get(&column);
        let values = items
            .iter()
            .map(|item| coerce::coerce(item, field_type))
            .collect::<Result<Vec<_>>>()?;
        let mut doc = Document::new();
        doc.insert(column, doc_with(key, Bson::Array(values)));
        return Ok(doc);
    }

    if let Expr::Function { name, args } = left {
        let function = lower_function_body(name, args, field_types)?;
        let values = items
            .iter()
            .map(|item| lower_function_arg(item, field_types))
            .collect::<Result<Vec<_>>>()?;
        let fin_key = if negated { "$fnin" } else { "$fin" };
        let mut inner = Document::new();
        inner.insert("function", Bson::Document(function));
        inner.insert("list", Bson::Array(values));
        let mut doc = Document::new();
        doc.insert(fin_key, Bson::Document(inner));
        return Ok(doc);
    }

    Err(TranslateError::Syntax(
        "IN requires a column or function call on the left".to_string(),
    ))
}

fn lower_is_null(expr: &Expr, negated: bool) -> Result<Document> {
    let column = expr
        .column_name()
        .ok_or_else(|| TranslateError::Syntax("IS NULL requires a column".to_string()))?;
    let mut doc = Document::new();
    doc.insert(column, doc_with("$exists", Bson::Boolean(negated)));
    Ok(doc)
}

fn lower_logical(op: LogicalOp, left: &Expr, right: &Expr, field_types: &FieldTypeMap) -> Result<Document> {
    let operands = flatten_logical(op, left, right);
    let lowered = operands
        .into_iter()
        .map(|operand| lower(operand, field_types).map(Bson::Document))
        .collect::<Result<Vec<_>>>()?;

    let key = match op {
        LogicalOp::And => "$and",
        LogicalOp::Or => "$or",
    };
    let mut doc = Document::new();
    doc.insert(key, Bson::Array(lowered));
    Ok(doc)
}

fn flatten_logical<'a>(op: LogicalOp, left: &'a Expr, right: &'a Expr) -> Vec<&'a Expr> {
    let mut operands = match left {
        Expr::Logical {
            op: inner_op,
            left: inner_left,
            right: inner_right,
        } if *inner_op == op => flatten_logical(op, inner_left, inner_right),
        other => vec![other],
    };
    operands.push(right);
    operands
}

fn lower_not(inner: &Expr, field_types: &FieldTypeMap) -> Result<Document> {
    if let Some(column) = inner.column_name() {
        let mut doc = Document::new();
        doc.insert(column, doc_with("$ne", Bson::Boolean(true)));
        return Ok(doc);
    }
    let lowered = lower(inner, field_types)?;
    let mut doc = Document::new();
    doc.insert("$nor", Bson::Array(vec![Bson::Document(lowered)]));
    Ok(doc)
}

fn lower_parens(inner: &Expr, negated: bool, field_types: &FieldTypeMap) -> Result<Document> {
    let lowered = lower(inner, field_types)?;
    if negated {
        let mut doc = Document::new();
        doc.insert("$nor", Bson::Array(vec![Bson::Document(lowered)]));
        Ok(doc)
    } else {
        Ok(lowered)
    }
}

fn lower_bare_function(name: &str, args: &[Expr], field_types: &FieldTypeMap) -> Result<Document> {
    if let Some(Recognized::Match(path, value)) =
        specialty::recognize_regex_match_bare(&Expr::Function {
            name: name.to_string(),
            args: args.to_vec(),
        })?
    {
        let mut doc = Document::new();
        doc.insert(path.join("."), value);
        return Ok(doc);
    }
    lower_function_body(name, args, field_types)
}

fn lower_function_body(name: &str, args: &[Expr], field_types: &FieldTypeMap) -> Result<Document> {
    let value = match args.len() {
        0 => Bson::Null,
        1 => lower_function_arg(&args[0], field_types)?,
        _ => Bson::Array(
            args.iter()
                .map(|arg| lower_function_arg(arg, field_types))
                .collect::<Result<Vec<_>>>()?,
        ),
    };
    let mut doc = Document::new();
    doc.insert(format!("${}", name), value);
    Ok(doc)
}

fn lower_function_arg(expr: &Expr, field_types: &FieldTypeMap) -> Result<Bson> {
    match expr {
        Expr::Function { name, args } => Ok(Bson::Document(lower_function_body(name, args, field_types)?)),
        Expr::Column(parts) => Ok(Bson::String(format!("${}", parts.join(".")))),
        Expr::Literal(_) | Expr::Signed(_) => coerce::coerce(expr, crate::config::FieldType::Unknown),
        other => Err(TranslateError::Syntax(format!(
            "unsupported function argument: {:?}",
            other
        ))),
    }
}

/// Coerce an operand for use inside `$expr` — columns become `$col`
/// references, function calls lower recursively, literals coerce as
/// untyped values (there is no column to consult a `FieldType` for).
fn expr_to_agg_operand(expr: &Expr, field_types: &FieldTypeMap) -> Result<Bson> {
    lower_function_arg(expr, field_types)
}

fn resolve_operand_order<'a>(
    left: &'a Expr,
    right: &'a Expr,
    field_types: &FieldTypeMap,
) -> Result<(String, crate::config::FieldType, &'a Expr, bool)> {
    if let Some(column) = left.column_name() {
        let field_type = field_types.get(&column);
        return Ok((column, field_type, right, false));
    }
    if let Some(column) = right.column_name() {
        let field_type = field_types.get(&column);
        return Ok((column, field_type, left, true));
    }
    Err(TranslateError::Syntax(
        "comparison requires a column operand".to_string(),
    ))
}

fn flip(op: CompareOp) -> CompareOp {
    match op {
        CompareOp::Gt => CompareOp::Lt,
        CompareOp::Lt => CompareOp::Gt,
        CompareOp::Ge => CompareOp::Le,
        CompareOp::Le => CompareOp::Ge,
        other => other,
    }
}

fn wrap_expr(op: &str, lhs: Bson, rhs: Bson) -> Document {
    let mut inner = Document::new();
    inner.insert(op, Bson::Array(vec![lhs, rhs]));
    let mut doc = Document::new();
    doc.insert("$expr", inner);
    doc
}

fn doc_with(key: &str, value: Bson) -> Document {
    let mut doc = Document::new();
    doc.insert(key, value);
    doc
}
