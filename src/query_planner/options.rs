//! `options` argument: sorting and pagination.

use serde_json::Value;

use super::errors::QueryPlannerError;
use super::plan_ctx::PlanCtx;
use crate::cypher_builder::{CypherExpr, OrderByItem, ParamValue, Pattern, WithClause};
use crate::graph_catalog::{FieldDescriptor, TypeDescriptor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub sort: Vec<SortKey>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListOptions {
    pub fn is_empty(&self) -> bool {
        self.sort.is_empty() && self.limit.is_none() && self.offset.is_none()
    }
}

pub fn parse_options(
    type_desc: &TypeDescriptor,
    value: Option<&Value>,
    path: &str,
) -> Result<Option<ListOptions>, QueryPlannerError> {
    let object = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(object)) => object,
        Some(other) => {
            return Err(QueryPlannerError::invalid_argument(
                path,
                format!("expected an options object, found {}", other),
            ))
        }
    };

    let mut options = ListOptions::default();
    for (key, value) in object {
        let key_path = format!("{}.{}", path, key);
        match key.as_str() {
            "sort" => options.sort = parse_sort(type_desc, value, &key_path)?,
            "limit" => options.limit = parse_bound(value, &key_path)?,
            "offset" => options.offset = parse_bound(value, &key_path)?,
            other => {
                return Err(QueryPlannerError::invalid_argument(
                    &key_path,
                    format!("unknown option `{}`", other),
                ))
            }
        }
    }
    Ok(Some(options))
}

fn parse_sort(
    type_desc: &TypeDescriptor,
    value: &Value,
    path: &str,
) -> Result<Vec<SortKey>, QueryPlannerError> {
    let items = match value {
        Value::Null => return Ok(vec![]),
        Value::Array(items) => items,
        other => {
            return Err(QueryPlannerError::invalid_argument(
                path,
                format!("expected a list of sort objects, found {}", other),
            ))
        }
    };
    let mut keys = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{}[{}]", path, i);
        let object = item.as_object().ok_or_else(|| {
            QueryPlannerError::invalid_argument(&item_path, "expected a sort object")
        })?;
        for (field, direction) in object {
            match type_desc.field(field) {
                Some(FieldDescriptor::Scalar(scalar)) if !scalar.is_list => {}
                _ => {
                    return Err(QueryPlannerError::invalid_argument(
                        &item_path,
                        format!(
                            "`{}` is not a sortable field of type `{}`",
                            field, type_desc.name
                        ),
                    ))
                }
            }
            let descending = match direction.as_str() {
                Some("ASC") => false,
                Some("DESC") => true,
                _ => {
                    return Err(QueryPlannerError::invalid_argument(
                        &item_path,
                        format!("sort direction must be ASC or DESC, found {}", direction),
                    ))
                }
            };
            keys.push(SortKey {
                field: field.clone(),
                descending,
            });
        }
    }
    Ok(keys)
}

fn parse_bound(value: &Value, path: &str) -> Result<Option<i64>, QueryPlannerError> {
    if value.is_null() {
        return Ok(None);
    }
    value
        .as_u64()
        .and_then(|n| i64::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| {
            QueryPlannerError::invalid_argument(
                path,
                format!("expected a non-negative integer, found {}", value),
            )
        })
}

fn bind_bounds(
    ctx: &mut PlanCtx<'_>,
    variable: &str,
    options: &ListOptions,
) -> (Option<CypherExpr>, Option<CypherExpr>) {
    let mut bind = |suffix: &str, bound: Option<i64>| {
        bound.map(|n| {
            CypherExpr::parameter(ctx.bind(&format!("{}_{}", variable, suffix), ParamValue::Integer(n)))
        })
    };
    let offset = bind("offset", options.offset);
    let limit = bind("limit", options.limit);
    (offset, limit)
}

/// `WITH v ORDER BY ... SKIP $v_offset LIMIT $v_limit` for a root list
pub fn root_with_clause(
    ctx: &mut PlanCtx<'_>,
    variable: &str,
    options: &ListOptions,
) -> Option<WithClause> {
    if options.is_empty() {
        return None;
    }
    let (skip, limit) = bind_bounds(ctx, variable, options);
    Some(WithClause {
        variables: vec![variable.to_string()],
        order_by: options
            .sort
            .iter()
            .map(|key| OrderByItem {
                expr: CypherExpr::property(variable, &key.field),
                descending: key.descending,
            })
            .collect(),
        skip,
        limit,
    })
}

/// `list[offset..offset + limit]`
fn slice(list: CypherExpr, offset: Option<CypherExpr>, limit: Option<CypherExpr>) -> CypherExpr {
    if offset.is_none() && limit.is_none() {
        return list;
    }
    let to = match (&offset, limit) {
        (Some(from), Some(limit)) => Some(CypherExpr::Add(Box::new(from.clone()), Box::new(limit))),
        (None, limit) => limit,
        (Some(_), None) => None,
    };
    CypherExpr::Slice {
        list: Box::new(list),
        from: offset.map(Box::new),
        to: to.map(Box::new),
    }
}

/// Nested relationship list, sorted and paged when options ask for it.
///
/// Unsorted lists slice the comprehension directly. Sorted lists collect the
/// matched nodes, order them with `apoc.coll.sortMulti`, slice, then project.
pub fn nested_list(
    ctx: &mut PlanCtx<'_>,
    variable: &str,
    pattern: Pattern,
    filter: Option<CypherExpr>,
    projection: CypherExpr,
    options: Option<ListOptions>,
) -> CypherExpr {
    let filter = filter.map(Box::new);
    let options = match options {
        Some(options) if !options.is_empty() => options,
        _ => {
            return CypherExpr::PatternComprehension {
                pattern,
                filter,
                projection: Box::new(projection),
            }
        }
    };
    let (offset, limit) = bind_bounds(ctx, variable, &options);

    if options.sort.is_empty() {
        let list = CypherExpr::PatternComprehension {
            pattern,
            filter,
            projection: Box::new(projection),
        };
        return slice(list, offset, limit);
    }

    let nodes = CypherExpr::PatternComprehension {
        pattern,
        filter,
        projection: Box::new(CypherExpr::variable(variable)),
    };
    let sort_keys = options
        .sort
        .iter()
        .map(|key| {
            // sortMulti sorts descending unless the key is prefixed with `^`
            let prefix = if key.descending { "" } else { "^" };
            CypherExpr::StringLiteral(format!("{}{}", prefix, key.field))
        })
        .collect();
    let sorted = CypherExpr::call("apoc.coll.sortMulti", vec![nodes, CypherExpr::List(sort_keys)]);
    CypherExpr::ListComprehension {
        variable: variable.to_string(),
        list: Box::new(slice(sorted, offset, limit)),
        filter: None,
        projection: Some(Box::new(projection)),
    }
}
