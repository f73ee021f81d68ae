//! Sort/Offset/Limit Lowerer (C6): builds `$sort`, rewriting sort keys
//! that reference grouped columns to `_id`/`_id.<col>` form (§4.6).

use bson::{Bson, Document};

use crate::ast::{Expr, OrderByItem, SelectItem};
use crate::error::{Result, TranslateError};
use crate::lower::select_lowerer::is_aggregate_function;

/// Build the `$sort` document for `order_bys`.
///
/// `from_alias` is stripped from a column ORDER BY target the same way
/// the Select/Group Lowerers strip it, so e.g. `ORDER BY c.sub.a` against
/// `FROM t AS c` matches the projection's `sub.a` key rather than
/// `c.sub.a`. `group_bys` is the statement's GROUP BY key list (for
/// `_id` rewriting); `select_items` is consulted to resolve a
/// function-call ORDER BY element back to its projection alias or
/// default key name.
pub fn lower_sort(
    order_bys: &[OrderByItem],
    group_bys: &[String],
    select_items: &[SelectItem],
    from_alias: Option<&str>,
) -> Result<Document> {
    let mut sort = Document::new();

    for item in order_bys {
        let key = resolve_sort_key(&item.expr, group_bys, select_items, from_alias)?;
        let direction = if item.ascending { 1 } else { -1 };
        sort.insert(key, Bson::Int32(direction));
    }

    Ok(sort)
}

fn resolve_sort_key(
    expr: &Expr,
    group_bys: &[String],
    select_items: &[SelectItem],
    from_alias: Option<&str>,
) -> Result<String> {
    if let Expr::Function { name, args } = expr {
        if is_aggregate_function(name) {
            return Ok(resolve_function_alias(name, args, select_items));
        }
    }

    let expr = expr.strip_table_alias(from_alias);
    let column = expr
        .column_name()
        .ok_or_else(|| TranslateError::Syntax("unsupported ORDER BY expression".to_string()))?;

    if group_bys.iter().any(|g| g == &column) {
        return Ok(rewrite_grouped_key(&column, group_bys));
    }

    Ok(column)
}

fn rewrite_grouped_key(column: &str, group_bys: &[String]) -> String {
    if group_bys.len() == 1 {
        "_id".to_string()
    } else {
        format!("_id.{}", column.replace('.', "_"))
    }
}

fn resolve_function_alias(name: &str, args: &[Expr], select_items: &[SelectItem]) -> String {
    for item in select_items {
        if let SelectItem::Expr {
            expr: Expr::Function {
                name: item_name,
                args: item_args,
            },
            alias,
        } = item
        {
            if item_name.eq_ignore_ascii_case(name) && item_args == args {
                if let Some(alias) = alias {
                    return alias.clone();
                }
            }
        }
    }

    let lowered = name.to_ascii_lowercase();
    if lowered == "count" {
        "count".to_string()
    } else {
        let suffix = args
            .first()
            .and_then(|arg| arg.column_name())
            .unwrap_or_else(|| "value".to_string())
            .replace('.', "_");
        format!("{}_{}", lowered, suffix)
    }
}
