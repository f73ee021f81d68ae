//! Validator (C8): semantic checks that run after the shape of a SELECT
//! statement has been decided, but before its pieces are handed back to
//! the caller (§4.8).
//!
//! Rules 2 (multi-table FROM), 3 (sub-select in FROM), 4 (sub-select in
//! SELECT list) and 6 (double-equals) are all structural and are instead
//! enforced by the parser front end (C0) the moment the offending token
//! appears — `TranslateError::UnsupportedJoin`/`UnsupportedSubselect`/
//! `UnsupportedSelectExpression`/`UnsupportedSql` come from
//! [`crate::parser`], not from here. This module covers the two rules
//! that can only be checked once the rest of the statement is known:
//! DISTINCT column arity (rule 1) and the "no GROUP BY" projection shape
//! (rule 5).

use crate::ast::{Expr, SelectItem, SelectStatement};
use crate::error::{Result, TranslateError};
use crate::lower::select_lowerer::is_aggregate_function;

/// Rule 1: `SELECT DISTINCT` must project exactly one non-`*` column.
pub fn validate_distinct(select: &SelectStatement) -> Result<()> {
    if !select.distinct {
        return Ok(());
    }

    if select.items.len() != 1 {
        return Err(TranslateError::UnsupportedDistinct);
    }

    match &select.items[0] {
        SelectItem::Expr { expr, .. } if expr.column_name().is_some() => Ok(()),
        _ => Err(TranslateError::UnsupportedDistinct),
    }
}

/// Rule 5: once a statement has been determined to need a plain `find`
/// shape (no GROUP BY, no alias, not a `COUNT(*)`), every SELECT item
/// must be a column, a CASE expression, or a subtraction. An aggregate
/// function reaching this point (e.g. `SELECT SUM(amount) FROM orders`
/// with no GROUP BY) has no way to express itself as a `find` projection
/// and is rejected here rather than surfacing the generic
/// `UnsupportedProjection` message the Select Lowerer would otherwise
/// raise for an expression shape it simply doesn't recognize.
pub fn validate_plain_select_shape(select: &SelectStatement) -> Result<()> {
    for item in &select.items {
        let SelectItem::Expr { expr, .. } = item else {
            continue;
        };
        if is_aggregate_call(expr) {
            return Err(TranslateError::IllegalSelectExpression);
        }
        if !is_plain_projectable(expr) {
            return Err(TranslateError::IllegalSelectExpression);
        }
    }
    Ok(())
}

fn is_aggregate_call(expr: &Expr) -> bool {
    matches!(expr, Expr::Function { name, .. } if is_aggregate_function(name))
}

fn is_plain_projectable(expr: &Expr) -> bool {
    match expr {
        Expr::Column(_) => true,
        Expr::Case { .. } => true,
        Expr::Subtract { .. } => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CompareOp, Literal};

    fn col(name: &str) -> Expr {
        Expr::Column(vec![name.to_string()])
    }

    fn base_select(items: Vec<SelectItem>) -> SelectStatement {
        SelectStatement {
            items,
            from_table: "t".to_string(),
            from_alias: None,
            where_clause: None,
            group_bys: Vec::new(),
            order_bys: Vec::new(),
            offset: None,
            limit: None,
            distinct: false,
            joins: None,
        }
    }

    #[test]
    fn distinct_with_single_column_passes() {
        let mut select = base_select(vec![SelectItem::Expr {
            expr: col("a"),
            alias: None,
        }]);
        select.distinct = true;
        assert!(validate_distinct(&select).is_ok());
    }

    #[test]
    fn distinct_with_multiple_columns_fails() {
        let mut select = base_select(vec![
            SelectItem::Expr {
                expr: col("a"),
                alias: None,
            },
            SelectItem::Expr {
                expr: col("b"),
                alias: None,
            },
        ]);
        select.distinct = true;
        let err = validate_distinct(&select).unwrap_err();
        assert_eq!(err, TranslateError::UnsupportedDistinct);
    }

    #[test]
    fn distinct_over_star_fails() {
        let mut select = base_select(vec![SelectItem::AllColumns]);
        select.distinct = true;
        let err = validate_distinct(&select).unwrap_err();
        assert_eq!(err, TranslateError::UnsupportedDistinct);
    }

    #[test]
    fn plain_select_rejects_bare_aggregate() {
        let select = base_select(vec![SelectItem::Expr {
            expr: Expr::Function {
                name: "sum".to_string(),
                args: vec![col("amount")],
            },
            alias: None,
        }]);
        let err = validate_plain_select_shape(&select).unwrap_err();
        assert_eq!(err, TranslateError::IllegalSelectExpression);
    }

    #[test]
    fn plain_select_accepts_columns_case_and_subtraction() {
        let select = base_select(vec![
            SelectItem::Expr {
                expr: col("a"),
                alias: None,
            },
            SelectItem::Expr {
                expr: Expr::Case {
                    branches: vec![(
                        Expr::Comparison {
                            op: CompareOp::Eq,
                            left: Box::new(col("a")),
                            right: Box::new(Expr::Literal(Literal::Long(1))),
                        },
                        Expr::Literal(Literal::String("x".to_string())),
                    )],
                    else_branch: None,
                },
                alias: Some("label".to_string()),
            },
            SelectItem::Expr {
                expr: Expr::Subtract {
                    left: Box::new(col("a")),
                    right: Box::new(col("b")),
                },
                alias: Some("diff".to_string()),
            },
        ]);
        assert!(validate_plain_select_shape(&select).is_ok());
    }
}
