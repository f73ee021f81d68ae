//! Select Lowerer (C4): SELECT items to projection / alias-projection
//! documents (§4.4). `in_group_by` controls whether CASE column operands
//! are prefixed `$_id.` (grouped pipelines) or `$` (plain projections) —
//! the resolved open question recorded in DESIGN.md.

use bson::{Bson, Document};

use crate::ast::{Expr, Literal, SelectItem};
use crate::coerce;
use crate::config::{FieldType, FieldTypeMap};
use crate::error::{Result, TranslateError};

/// Aggregate function names recognized by the Group Lowerer; the Select
/// Lowerer needs the same list to skip them when building a plain
/// projection (they are handled separately by C5).
pub fn is_aggregate_function(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "count" | "sum" | "avg" | "min" | "max"
    )
}

/// Build the `{col: 1, ...}`/alias projection for a non-grouped SELECT
/// list. Returns `(projection, has_alias)`.
pub fn lower_select_list(
    items: &[SelectItem],
    from_alias: Option<&str>,
    field_types: &FieldTypeMap,
    in_group_by: bool,
) -> Result<(Document, bool)> {
    let mut projection = Document::new();
    let mut has_alias = false;
    let mut user_included_id = false;
    let mut has_columns = false;

    for item in items {
        match item {
            SelectItem::AllColumns => {}
            SelectItem::Expr { expr, alias } => {
                has_columns = true;
                let expr = expr.strip_table_alias(from_alias);
                if expr.column_name().as_deref() == Some("_id") {
                    user_included_id = true;
                }
                let (key, value) = lower_select_item(&expr, alias.as_deref(), field_types, in_group_by)?;
                if alias.is_some() {
                    has_alias = true;
                }
                projection.insert(key, value);
            }
        }
    }

    if has_columns && !user_included_id {
        projection.insert("_id", Bson::Int32(0));
    }

    Ok((projection, has_alias))
}

fn lower_select_item(
    expr: &Expr,
    alias: Option<&str>,
    field_types: &FieldTypeMap,
    in_group_by: bool,
) -> Result<(String, Bson)> {
    match expr {
        Expr::Column(parts) => {
            let column = parts.join(".");
            match alias {
                Some(alias) => Ok((alias.to_string(), Bson::String(format!("${}", column)))),
                None => Ok((column, Bson::Int32(1))),
            }
        }
        Expr::Case { branches, else_branch } => {
            let key = alias
                .map(str::to_string)
                .or_else(|| expr.column_name())
                .ok_or_else(|| TranslateError::UnsupportedProjection)?;
            let value = lower_case(branches, else_branch.as_deref(), field_types, in_group_by)?;
            Ok((key, value))
        }
        Expr::Subtract { left, right } => {
            let key = alias
                .map(str::to_string)
                .ok_or_else(|| TranslateError::UnsupportedProjection)?;
            let value = lower_subtract(left, right, field_types, in_group_by)?;
            Ok((key, value))
        }
        _ => Err(TranslateError::UnsupportedProjection),
    }
}

/// Lower a CASE expression that appears as its own SELECT item in a
/// grouped aggregation — column operands are prefixed `$_id.` since the
/// `$group` stage has already collapsed them into `_id`. Used by the
/// Group/Aggregate Lowerer (C5), which doesn't otherwise call into this
/// module.
pub(crate) fn lower_case_grouped(
    branches: &[(Expr, Expr)],
    else_branch: Option<&Expr>,
    field_types: &FieldTypeMap,
) -> Result<Bson> {
    lower_case(branches, else_branch, field_types, true)
}

fn lower_case(
    branches: &[(Expr, Expr)],
    else_branch: Option<&Expr>,
    field_types: &FieldTypeMap,
    in_group_by: bool,
) -> Result<Bson> {
    let mut case_branches = Vec::with_capacity(branches.len());
    for (when, then) in branches {
        let condition = lower_case_condition(when, field_types, in_group_by)?;
        let result = lower_case_operand(then, field_types, in_group_by)?;
        let mut branch = Document::new();
        branch.insert("case", condition);
        branch.insert("then", result);
        case_branches.push(Bson::Document(branch));
    }

    let default = match else_branch {
        Some(expr) => lower_case_operand(expr, field_types, in_group_by)?,
        None => Bson::Null,
    };

    let mut switch = Document::new();
    switch.insert("branches", Bson::Array(case_branches));
    switch.insert("default", default);
    let mut doc = Document::new();
    doc.insert("$switch", switch);
    Ok(Bson::Document(doc))
}

fn lower_case_condition(expr: &Expr, field_types: &FieldTypeMap, in_group_by: bool) -> Result<Bson> {
    match expr {
        Expr::Comparison { op, left, right } => {
            let mongo_op = compare_op_key(*op)?;
            let lhs = lower_case_operand(left, field_types, in_group_by)?;
            let rhs = lower_case_operand(right, field_types, in_group_by)?;
            let mut inner = Document::new();
            inner.insert(mongo_op, Bson::Array(vec![lhs, rhs]));
            Ok(Bson::Document(inner))
        }
        other => lower_case_operand(other, field_types, in_group_by),
    }
}

fn compare_op_key(op: crate::ast::CompareOp) -> Result<&'static str> {
    use crate::ast::CompareOp::*;
    match op {
        Eq => Ok("$eq"),
        Ne => Ok("$ne"),
        Gt => Ok("$gt"),
        Lt => Ok("$lt"),
        Ge => Ok("$gte"),
        Le => Ok("$lte"),
        Like | NotLike => Err(TranslateError::UnsupportedProjection),
    }
}

fn lower_case_operand(expr: &Expr, field_types: &FieldTypeMap, in_group_by: bool) -> Result<Bson> {
    match expr {
        Expr::Column(parts) => {
            let column = parts.join(".");
            let prefix = if in_group_by { "$_id." } else { "$" };
            Ok(Bson::String(format!("{}{}", prefix, column)))
        }
        Expr::Literal(_) | Expr::Signed(_) => coerce::coerce(expr, FieldType::Unknown),
        Expr::Subtract { left, right } => lower_subtract(left, right, field_types, in_group_by),
        Expr::Case { branches, else_branch } => lower_case(branches, else_branch.as_deref(), field_types, in_group_by),
        _ => Err(TranslateError::UnsupportedProjection),
    }
}

fn lower_subtract(left: &Expr, right: &Expr, field_types: &FieldTypeMap, in_group_by: bool) -> Result<Bson> {
    let lhs = lower_subtract_operand(left, field_types, in_group_by)?;
    let rhs = lower_subtract_operand(right, field_types, in_group_by)?;
    let mut doc = Document::new();
    doc.insert("$subtract", Bson::Array(vec![lhs, rhs]));
    Ok(Bson::Document(doc))
}

fn lower_subtract_operand(expr: &Expr, field_types: &FieldTypeMap, in_group_by: bool) -> Result<Bson> {
    match expr {
        Expr::Column(parts) => {
            let prefix = if in_group_by { "$_id." } else { "$" };
            Ok(Bson::String(format!("{}{}", prefix, parts.join("."))))
        }
        Expr::Literal(literal) => coerce_projection_literal(literal),
        Expr::Signed(inner) => lower_subtract_operand(inner, field_types, in_group_by),
        _ => Err(TranslateError::UnsupportedProjection),
    }
}

fn coerce_projection_literal(literal: &Literal) -> Result<Bson> {
    coerce::coerce(&Expr::Literal(literal.clone()), FieldType::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CompareOp, Literal};

    fn col(name: &str) -> Expr {
        Expr::Column(vec![name.to_string()])
    }

    #[test]
    fn plain_column_projects_as_one() {
        let items = vec![SelectItem::Expr {
            expr: col("name"),
            alias: None,
        }];
        let (doc, has_alias) = lower_select_list(&items, None, &FieldTypeMap::new(), false).unwrap();
        assert_eq!(doc.get_i32("name").unwrap(), 1);
        assert!(!has_alias);
    }

    #[test]
    fn aliased_column_strips_table_alias() {
        let items = vec![SelectItem::Expr {
            expr: Expr::Column(vec!["c".to_string(), "field".to_string()]),
            alias: Some("a".to_string()),
        }];
        let (doc, has_alias) = lower_select_list(&items, Some("c"), &FieldTypeMap::new(), false).unwrap();
        assert!(has_alias);
        assert_eq!(doc.get_str("a").unwrap(), "$field");
        assert_eq!(doc.get_i32("_id").unwrap(), 0);
    }

    #[test]
    fn case_expression_lowers_to_switch() {
        let case_expr = Expr::Case {
            branches: vec![(
                Expr::Comparison {
                    op: CompareOp::Eq,
                    left: Box::new(col("a")),
                    right: Box::new(Expr::Literal(Literal::Long(1))),
                },
                Expr::Literal(Literal::String("x".to_string())),
            )],
            else_branch: Some(Box::new(Expr::Literal(Literal::String("y".to_string())))),
        };
        let items = vec![SelectItem::Expr {
            expr: case_expr,
            alias: Some("label".to_string()),
        }];
        let (doc, _) = lower_select_list(&items, None, &FieldTypeMap::new(), false).unwrap();
        let switch = doc.get_document("label").unwrap().get_document("$switch").unwrap();
        assert_eq!(switch.get_array("branches").unwrap().len(), 1);
    }

    #[test]
    fn case_column_operand_prefixed_with_group_id_when_grouped() {
        let case_expr = Expr::Case {
            branches: vec![(
                Expr::Comparison {
                    op: CompareOp::Eq,
                    left: Box::new(col("a")),
                    right: Box::new(Expr::Literal(Literal::Long(1))),
                },
                col("a"),
            )],
            else_branch: None,
        };
        let items = vec![SelectItem::Expr {
            expr: case_expr,
            alias: Some("label".to_string()),
        }];
        let (doc, _) = lower_select_list(&items, None, &FieldTypeMap::new(), true).unwrap();
        let switch = doc.get_document("label").unwrap().get_document("$switch").unwrap();
        let branch = switch.get_array("branches").unwrap()[0].as_document().unwrap();
        assert_eq!(branch.get_str("then").unwrap(), "$_id.a");
    }

    #[test]
    fn subtract_lowers_with_dollar_prefixed_columns() {
        let items = vec![SelectItem::Expr {
            expr: Expr::Subtract {
                left: Box::new(col("a")),
                right: Box::new(col("b")),
            },
            alias: Some("diff".to_string()),
        }];
        let (doc, _) = lower_select_list(&items, None, &FieldTypeMap::new(), false).unwrap();
        let subtract = doc.get_document("diff").unwrap().get_array("$subtract").unwrap();
        assert_eq!(subtract[0], Bson::String("$a".to_string()));
        assert_eq!(subtract[1], Bson::String("$b".to_string()));
    }

    #[test]
    fn unsupported_projection_expression_fails() {
        let items = vec![SelectItem::Expr {
            expr: Expr::Literal(Literal::Long(1)),
            alias: None,
        }];
        let err = lower_select_list(&items, None, &FieldTypeMap::new(), false).unwrap_err();
        assert_eq!(err, TranslateError::UnsupportedProjection);
    }
}
