//! Shape Selector & Assembler (C7): decides which [`Op`] a statement
//! lowers to and wires the other lowering components together to build
//! the final [`QueryPlan`] (§4.7).
//!
//! This is also where [`translate`] — the crate's top-level entry point —
//! lives: parse, validate, lower, assemble, in that order.

use crate::ast::{DeleteStatement, Expr, SelectItem, SelectStatement, Statement};
use crate::coerce;
use crate::config::FieldTypeMap;
use crate::error::Result;
use crate::join::{JoinPipeline, NoJoins};
use crate::lower::group_lowerer;
use crate::lower::select_lowerer::{self, is_aggregate_function};
use crate::lower::sort_lowerer;
use crate::lower::validator;
use crate::lower::where_lowerer;
use crate::parser;
use crate::plan::{Op, QueryPlan};

/// Parse, validate, lower and assemble a single SQL statement into a
/// [`QueryPlan`], using the default no-op join collaborator.
///
/// Statements with a `JOIN` clause always fail with
/// `TranslateError::UnsupportedJoin` through this entry point — callers
/// who need real join support must go through [`assemble_with_joins`]
/// with their own [`JoinPipeline`] implementation.
pub fn translate(sql: &str, field_types: &FieldTypeMap) -> Result<QueryPlan> {
    assemble_with_joins(sql, field_types, &NoJoins)
}

/// Like [`translate`], but with a caller-supplied [`JoinPipeline`]
/// collaborator for resolving join clauses into pipeline stages.
pub fn assemble_with_joins(
    sql: &str,
    field_types: &FieldTypeMap,
    joins: &dyn JoinPipeline,
) -> Result<QueryPlan> {
    let statement = parser::parse_statement(sql)?;
    let plan = match &statement {
        Statement::Select(select) => assemble_select(select, field_types, joins)?,
        Statement::Delete(delete) => assemble_delete(delete, field_types)?,
    };

    tracing::debug!(op = ?plan.op, collection = %plan.collection, "lowered sql statement");
    Ok(plan)
}

fn assemble_delete(delete: &DeleteStatement, field_types: &FieldTypeMap) -> Result<QueryPlan> {
    let mut plan = QueryPlan::new(delete.table.clone(), Op::Delete);
    if let Some(where_clause) = &delete.where_clause {
        plan.filter = where_lowerer::lower(where_clause, field_types)?;
    }
    Ok(plan)
}

fn assemble_select(
    select: &SelectStatement,
    field_types: &FieldTypeMap,
    joins: &dyn JoinPipeline,
) -> Result<QueryPlan> {
    validator::validate_distinct(select)?;

    let has_alias = select
        .items
        .iter()
        .any(|item| matches!(item, SelectItem::Expr { alias: Some(_), .. }));
    let has_joins = select.joins.as_ref().is_some_and(|j| !j.is_empty());
    let count_all = is_count_all(select);

    let op = if select.distinct {
        Op::Distinct
    } else if count_all {
        Op::Count
    } else if !select.group_bys.is_empty() || has_alias || has_joins {
        Op::Aggregate
    } else {
        Op::Find
    };

    let mut plan = QueryPlan::new(select.from_table.clone(), op);
    plan.group_bys = select.group_bys.clone();

    if let Some(where_clause) = &select.where_clause {
        plan.filter = where_lowerer::lower(where_clause, field_types)?;
    }

    if let Some(join_clauses) = &select.joins {
        plan.join_pipeline = joins.build(join_clauses)?;
    }

    match op {
        Op::Distinct => {
            plan.distinct = true;
            if let SelectItem::Expr { alias: Some(alias), .. } = &select.items[0] {
                tracing::warn!(
                    collection = %plan.collection,
                    alias = %alias,
                    "distinct() has no projection alias; discarding the SELECT item's alias"
                );
            }
            plan.projection = distinct_projection(select)?;
        }
        Op::Count => {
            plan.count_all = true;
        }
        Op::Find => {
            validator::validate_plain_select_shape(select)?;
            let (projection, _) = select_lowerer::lower_select_list(
                &select.items,
                select.from_alias.as_deref(),
                field_types,
                false,
            )?;
            plan.projection = projection;
            plan.sort = sort_lowerer::lower_sort(
                &select.order_bys,
                &[],
                &select.items,
                select.from_alias.as_deref(),
            )?;
        }
        Op::Aggregate => {
            if !select.group_bys.is_empty() || has_aggregate_item(&select.items) {
                let group_result = group_lowerer::lower_group(
                    &select.items,
                    &select.group_bys,
                    select.from_alias.as_deref(),
                    field_types,
                )?;
                plan.projection = group_result.group_stage;
                plan.alias_projection = group_result.alias_projection;
                plan.sort = sort_lowerer::lower_sort(
                    &select.order_bys,
                    &select.group_bys,
                    &select.items,
                    select.from_alias.as_deref(),
                )?;
            } else {
                let (projection, _) = select_lowerer::lower_select_list(
                    &select.items,
                    select.from_alias.as_deref(),
                    field_types,
                    false,
                )?;
                plan.alias_projection = projection;
                plan.sort = sort_lowerer::lower_sort(
                    &select.order_bys,
                    &[],
                    &select.items,
                    select.from_alias.as_deref(),
                )?;
            }
        }
        Op::Delete => unreachable!("delete statements are assembled separately"),
    }

    if let Some(offset) = select.offset {
        plan.offset = coerce::check_int32_range(offset)?;
    }
    if let Some(limit) = select.limit {
        plan.limit = coerce::check_int32_range(limit)?;
    }

    Ok(plan)
}

/// `SELECT COUNT(*) FROM ...` with no `GROUP BY` and no `DISTINCT` maps
/// to the bare `count` shape. `COUNT(col)` without a `GROUP BY` has no
/// equivalent `count()` call (it would need to filter out nulls) and
/// falls through to the aggregate/illegal-projection checks instead.
fn is_count_all(select: &SelectStatement) -> bool {
    if select.distinct || !select.group_bys.is_empty() || select.items.len() != 1 {
        return false;
    }

    match &select.items[0] {
        SelectItem::Expr {
            expr: Expr::Function { name, args },
            alias: None,
        } if name.eq_ignore_ascii_case("count") => {
            matches!(args.as_slice(), [Expr::Column(parts)] if parts.last().map(String::as_str) == Some("*"))
        }
        _ => false,
    }
}

fn has_aggregate_item(items: &[SelectItem]) -> bool {
    items.iter().any(|item| {
        matches!(
            item,
            SelectItem::Expr {
                expr: Expr::Function { name, .. },
                ..
            } if is_aggregate_function(name)
        )
    })
}

fn distinct_projection(select: &SelectStatement) -> Result<bson::Document> {
    let column = select.items[0]
        .clone()
        .into_expr()
        .and_then(|expr| expr.strip_table_alias(select.from_alias.as_deref()).column_name())
        .ok_or(crate::error::TranslateError::UnsupportedDistinct)?;

    let mut doc = bson::Document::new();
    doc.insert(column, bson::Bson::Int32(1));
    Ok(doc)
}

trait SelectItemExt {
    fn into_expr(self) -> Option<Expr>;
}

impl SelectItemExt for SelectItem {
    fn into_expr(self) -> Option<Expr> {
        match self {
            SelectItem::Expr { expr, .. } => Some(expr),
            SelectItem::AllColumns => None,
        }
    }
}
