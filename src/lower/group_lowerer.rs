//! Group/Aggregate Lowerer (C5): builds the `$group` stage and the
//! alias-projection that restores user-visible names afterward (§4.5).

use bson::{Bson, Document};

use crate::ast::{Expr, SelectItem};
use crate::config::FieldTypeMap;
use crate::error::{Result, TranslateError};
use crate::lower::select_lowerer::{is_aggregate_function, lower_case_grouped};

/// One non-aggregate key contributing to `_id`, keyed by its flattened
/// name (`a.b.c` → `a_b_c`) with the dotted path preserved for `$col`.
struct GroupKey {
    flattened: String,
    dotted: String,
}

/// One aggregate function item (`COUNT`, `SUM`, ...).
struct AggregateItem {
    key_name: String,
    op: &'static str,
    operand: Bson,
}

pub struct GroupResult {
    pub group_stage: Document,
    pub alias_projection: Document,
}

/// Build the `$group` stage and alias projection from the SELECT list and
/// `GROUP BY` columns.
pub fn lower_group(
    items: &[SelectItem],
    group_bys: &[String],
    from_alias: Option<&str>,
    field_types: &FieldTypeMap,
) -> Result<GroupResult> {
    let mut keys: Vec<GroupKey> = Vec::new();
    let mut key_aliases: Vec<Option<String>> = Vec::new();
    let mut aggregates: Vec<AggregateItem> = Vec::new();
    let mut computed: Vec<(String, Bson)> = Vec::new();

    for item in items {
        let SelectItem::Expr { expr, alias } = item else {
            continue;
        };
        let expr = expr.strip_table_alias(from_alias);

        if let Expr::Function { name, args } = &expr {
            if is_aggregate_function(name) {
                aggregates.push(lower_aggregate(name, args, alias.as_deref())?);
                continue;
            }
        }

        if let Some(column) = expr.column_name() {
            if !keys.iter().any(|k| k.dotted == column) {
                keys.push(GroupKey {
                    flattened: column.replace('.', "_"),
                    dotted: column.clone(),
                });
                key_aliases.push(alias.clone());
            }
            continue;
        }

        if let Expr::Case { branches, else_branch } = &expr {
            let key = alias
                .clone()
                .ok_or_else(|| TranslateError::UnsupportedProjection)?;
            let value = lower_case_grouped(branches, else_branch.as_deref(), field_types)?;
            computed.push((key, value));
        }
    }

    for group_by in group_bys {
        if !keys.iter().any(|k| k.dotted == *group_by) {
            keys.push(GroupKey {
                flattened: group_by.replace('.', "_"),
                dotted: group_by.clone(),
            });
            key_aliases.push(None);
        }
    }

    let id_value = build_id(&keys);

    let mut group_stage = Document::new();
    group_stage.insert("_id", id_value);
    for aggregate in &aggregates {
        let mut op_doc = Document::new();
        op_doc.insert(aggregate.op, aggregate.operand.clone());
        group_stage.insert(aggregate.key_name.clone(), op_doc);
    }

    let mut alias_projection = build_alias_projection(&keys, &key_aliases, &aggregates);
    for (key, value) in computed {
        alias_projection.insert(key, value);
    }

    Ok(GroupResult {
        group_stage,
        alias_projection,
    })
}

fn build_id(keys: &[GroupKey]) -> Bson {
    if keys.is_empty() {
        // No non-aggregate key at all: every row folds into a single
        // group, e.g. `SELECT SUM(amount) FROM orders` with no GROUP BY.
        Bson::Null
    } else if keys.len() == 1 {
        Bson::String(format!("${}", keys[0].dotted))
    } else {
        let mut doc = Document::new();
        for key in keys {
            doc.insert(key.flattened.clone(), Bson::String(format!("${}", key.dotted)));
        }
        Bson::Document(doc)
    }
}

fn build_alias_projection(
    keys: &[GroupKey],
    key_aliases: &[Option<String>],
    aggregates: &[AggregateItem],
) -> Document {
    let mut doc = Document::new();

    if keys.len() == 1 {
        let name = key_aliases[0].clone().unwrap_or_else(|| keys[0].dotted.clone());
        doc.insert(name, Bson::String("$_id".to_string()));
    } else {
        for (key, alias) in keys.iter().zip(key_aliases.iter()) {
            let name = alias.clone().unwrap_or_else(|| key.dotted.clone());
            doc.insert(name, Bson::String(format!("$_id.{}", key.flattened)));
        }
    }

    for aggregate in aggregates {
        doc.insert(aggregate.key_name.clone(), Bson::Int32(1));
    }

    doc.insert("_id", Bson::Int32(0));
    doc
}

fn lower_aggregate(name: &str, args: &[Expr], alias: Option<&str>) -> Result<AggregateItem> {
    let lowered_name = name.to_ascii_lowercase();
    let op = match lowered_name.as_str() {
        "count" => "$sum",
        "sum" => "$sum",
        "avg" => "$avg",
        "min" => "$min",
        "max" => "$max",
        _ => return Err(TranslateError::UnknownFunction(name.to_string())),
    };

    if args.len() != 1 {
        return Err(TranslateError::UnsupportedFunctionArity(name.to_string()));
    }

    let operand = if lowered_name == "count" {
        Bson::Int32(1)
    } else {
        match args[0].column_name() {
            Some(column) => Bson::String(format!("${}", column)),
            None => return Err(TranslateError::UnsupportedFunctionArity(name.to_string())),
        }
    };

    let default_key = if lowered_name == "count" {
        "count".to_string()
    } else {
        let suffix = args[0].column_name().unwrap_or_else(|| "value".to_string()).replace('.', "_");
        format!("{}_{}", lowered_name, suffix)
    };

    let key_name = alias.map(str::to_string).unwrap_or(default_key);

    Ok(AggregateItem {
        key_name,
        op,
        operand,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldTypeMap;

    fn count_star() -> SelectItem {
        SelectItem::Expr {
            expr: Expr::Function {
                name: "count".to_string(),
                args: vec![Expr::Column(vec!["*".to_string()])],
            },
            alias: None,
        }
    }

    #[test]
    fn single_group_key_uses_scalar_id() {
        let items = vec![
            SelectItem::Expr {
                expr: Expr::Column(vec!["agent_code".to_string()]),
                alias: None,
            },
            count_star(),
        ];
        let result = lower_group(
            &items,
            &["agent_code".to_string()],
            None,
            &FieldTypeMap::new(),
        )
        .unwrap();
        assert_eq!(
            result.group_stage.get_str("_id").unwrap(),
            "$agent_code"
        );
        assert_eq!(
            result.group_stage.get_document("count").unwrap().get_i32("$sum").unwrap(),
            1
        );
        assert_eq!(
            result.alias_projection.get_str("agent_code").unwrap(),
            "$_id"
        );
    }

    #[test]
    fn multi_key_group_flattens_dotted_names() {
        let items = vec![
            SelectItem::Expr {
                expr: Expr::Column(vec!["a".to_string(), "b".to_string(), "c".to_string()]),
                alias: None,
            },
            SelectItem::Expr {
                expr: Expr::Column(vec!["d".to_string()]),
                alias: None,
            },
        ];
        let result = lower_group(&items, &[], None, &FieldTypeMap::new()).unwrap();
        let id = result.group_stage.get_document("_id").unwrap();
        assert_eq!(id.get_str("a_b_c").unwrap(), "$a.b.c");
        assert_eq!(id.get_str("d").unwrap(), "$d");
    }

    #[test]
    fn unknown_function_name_fails() {
        let items = vec![SelectItem::Expr {
            expr: Expr::Function {
                name: "median".to_string(),
                args: vec![Expr::Column(vec!["x".to_string()])],
            },
            alias: None,
        }];
        let err = lower_group(&items, &[], None, &FieldTypeMap::new()).unwrap_err();
        assert_eq!(err, TranslateError::UnknownFunction("median".to_string()));
    }

    #[test]
    fn wrong_arity_fails() {
        let items = vec![SelectItem::Expr {
            expr: Expr::Function {
                name: "sum".to_string(),
                args: vec![],
            },
            alias: None,
        }];
        let err = lower_group(&items, &[], None, &FieldTypeMap::new()).unwrap_err();
        assert_eq!(
            err,
            TranslateError::UnsupportedFunctionArity("sum".to_string())
        );
    }

    #[test]
    fn no_keys_at_all_groups_the_whole_collection() {
        let items = vec![SelectItem::Expr {
            expr: Expr::Function {
                name: "sum".to_string(),
                args: vec![Expr::Column(vec!["amount".to_string()])],
            },
            alias: Some("total".to_string()),
        }];
        let result = lower_group(&items, &[], None, &FieldTypeMap::new()).unwrap();
        assert_eq!(result.group_stage.get("_id"), Some(&Bson::Null));
        assert_eq!(
            result.alias_projection.get_i32("total").unwrap(),
            1
        );
    }

    #[test]
    fn grouped_case_item_is_prefixed_with_group_id_and_added_to_alias_projection() {
        let case_expr = Expr::Case {
            branches: vec![(
                Expr::Comparison {
                    op: crate::ast::CompareOp::Eq,
                    left: Box::new(Expr::Column(vec!["agent_code".to_string()])),
                    right: Box::new(Expr::Literal(crate::ast::Literal::String("AW1".to_string()))),
                },
                Expr::Literal(crate::ast::Literal::String("preferred".to_string())),
            )],
            else_branch: Some(Box::new(Expr::Literal(crate::ast::Literal::String(
                "standard".to_string(),
            )))),
        };
        let items = vec![
            SelectItem::Expr {
                expr: Expr::Column(vec!["agent_code".to_string()]),
                alias: None,
            },
            SelectItem::Expr {
                expr: case_expr,
                alias: Some("tier".to_string()),
            },
        ];
        let result = lower_group(
            &items,
            &["agent_code".to_string()],
            None,
            &FieldTypeMap::new(),
        )
        .unwrap();
        let switch = result
            .alias_projection
            .get_document("tier")
            .unwrap()
            .get_document("$switch")
            .unwrap();
        let branch = switch.get_array("branches").unwrap()[0].as_document().unwrap();
        let condition = branch.get_document("case").unwrap().get_array("$eq").unwrap();
        assert_eq!(condition[0], Bson::String("$_id.agent_code".to_string()));
    }

    #[test]
    fn group_by_column_not_in_select_is_added() {
        let items = vec![count_star()];
        let result = lower_group(
            &items,
            &["agent_code".to_string()],
            None,
            &FieldTypeMap::new(),
        )
        .unwrap();
        assert_eq!(result.group_stage.get_str("_id").unwrap(), "$agent_code");
    }
}
