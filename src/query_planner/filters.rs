//! `where` argument compilation.
//!
//! Keys are `<field>` or `<field>_<OPERATOR>` for stored scalars,
//! `<relationship>[_SOME|_NONE|_ALL|_NOT]` for relationship existence, and
//! `AND` / `OR` lists of nested filters.

use serde_json::{Map, Value};

use super::errors::QueryPlannerError;
use super::plan_ctx::PlanCtx;
use super::projection::{pattern_direction, relationship_pattern};
use crate::auth::AuthOperation;
use crate::cypher_builder::{ComparisonOp, CypherExpr};
use crate::graph_catalog::{FieldDescriptor, RelationshipField, ScalarField, ScalarKind, TypeDescriptor};

/// Operator suffixes, longest first where one ends another.
const SUFFIXES: &[&str] = &[
    "_NOT_STARTS_WITH",
    "_NOT_ENDS_WITH",
    "_NOT_CONTAINS",
    "_NOT_INCLUDES",
    "_NOT_IN",
    "_STARTS_WITH",
    "_ENDS_WITH",
    "_CONTAINS",
    "_INCLUDES",
    "_MATCHES",
    "_SOME",
    "_NONE",
    "_ALL",
    "_NOT",
    "_LTE",
    "_GTE",
    "_LT",
    "_GT",
    "_IN",
];

/// Compile a `where` value on `variable` of `type_desc`. `None` when the filter
/// does not constrain anything.
pub(crate) fn compile_where<'a>(
    ctx: &mut PlanCtx<'a>,
    type_desc: &'a TypeDescriptor,
    variable: &str,
    value: Option<&Value>,
    path: &str,
) -> Result<Option<CypherExpr>, QueryPlannerError> {
    let object = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(object)) => object,
        Some(other) => {
            return Err(QueryPlannerError::invalid_argument(
                path,
                format!("expected a filter object, found {}", other),
            ))
        }
    };
    compile_object(ctx, type_desc, variable, object, path)
}

fn compile_object<'a>(
    ctx: &mut PlanCtx<'a>,
    type_desc: &'a TypeDescriptor,
    variable: &str,
    object: &Map<String, Value>,
    path: &str,
) -> Result<Option<CypherExpr>, QueryPlannerError> {
    let mut conditions = Vec::with_capacity(object.len());
    for (key, value) in object {
        let key_path = format!("{}.{}", path, key);
        match key.as_str() {
            "AND" | "OR" => {
                let items = value.as_array().ok_or_else(|| {
                    QueryPlannerError::invalid_argument(&key_path, "expected a list of filters")
                })?;
                let mut parts = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{}[{}]", key_path, i);
                    parts.push(compile_where(ctx, type_desc, variable, Some(item), &item_path)?);
                }
                if key == "AND" {
                    conditions.extend(parts.into_iter().flatten());
                } else if !parts.is_empty() {
                    conditions.push(CypherExpr::or_any(
                        parts
                            .into_iter()
                            .map(|p| p.unwrap_or(CypherExpr::Boolean(true)))
                            .collect(),
                    ));
                }
            }
            _ => {
                let (field, suffix) = split_key(type_desc, key).ok_or_else(|| {
                    QueryPlannerError::invalid_argument(
                        &key_path,
                        format!("`{}` is not a filter on type `{}`", key, type_desc.name),
                    )
                })?;
                let condition = match field {
                    FieldDescriptor::Scalar(scalar) => {
                        scalar_condition(ctx, scalar, variable, key, suffix, value, &key_path)?
                    }
                    FieldDescriptor::Relationship(rel) => {
                        relationship_condition(ctx, rel, variable, suffix, value, &key_path)?
                    }
                    FieldDescriptor::Computed(computed) => {
                        return Err(QueryPlannerError::invalid_argument(
                            &key_path,
                            format!("computed field `{}` cannot be filtered", computed.name),
                        ))
                    }
                };
                conditions.push(condition);
                // Filtering on a field reads it.
                if let Some(pred) = ctx.compile_auth(field.auth_rules(), variable, AuthOperation::Read) {
                    conditions.push(pred);
                }
            }
        }
    }
    Ok(CypherExpr::and_all(conditions))
}

fn split_key<'t>(type_desc: &'t TypeDescriptor, key: &str) -> Option<(&'t FieldDescriptor, &'static str)> {
    if let Some(field) = type_desc.field(key) {
        return Some((field, ""));
    }
    SUFFIXES.iter().find_map(|suffix| {
        key.strip_suffix(suffix)
            .and_then(|base| type_desc.field(base))
            .map(|field| (field, *suffix))
    })
}

fn is_orderable(kind: ScalarKind) -> bool {
    kind.is_numeric() || kind.is_textual() || matches!(kind, ScalarKind::Temporal(_))
}

fn scalar_condition(
    ctx: &mut PlanCtx<'_>,
    field: &ScalarField,
    variable: &str,
    key: &str,
    suffix: &str,
    value: &Value,
    path: &str,
) -> Result<CypherExpr, QueryPlannerError> {
    let property = CypherExpr::property(variable, &field.name);
    let hint = format!("{}_{}", variable, key);
    let invalid = |message: String| QueryPlannerError::invalid_argument(path, message);

    if value.is_null() {
        return match suffix {
            "" => Ok(CypherExpr::IsNull(Box::new(property))),
            "_NOT" => Ok(CypherExpr::IsNotNull(Box::new(property))),
            _ => Err(invalid(format!("`{}` does not accept null", key))),
        };
    }

    let (op, negated) = match suffix {
        "" => (ComparisonOp::Eq, false),
        "_NOT" => (ComparisonOp::Eq, true),
        "_IN" => (ComparisonOp::In, false),
        "_NOT_IN" => (ComparisonOp::In, true),
        "_INCLUDES" => (ComparisonOp::In, false),
        "_NOT_INCLUDES" => (ComparisonOp::In, true),
        "_LT" => (ComparisonOp::Lt, false),
        "_LTE" => (ComparisonOp::Lte, false),
        "_GT" => (ComparisonOp::Gt, false),
        "_GTE" => (ComparisonOp::Gte, false),
        "_CONTAINS" => (ComparisonOp::Contains, false),
        "_NOT_CONTAINS" => (ComparisonOp::Contains, true),
        "_STARTS_WITH" => (ComparisonOp::StartsWith, false),
        "_NOT_STARTS_WITH" => (ComparisonOp::StartsWith, true),
        "_ENDS_WITH" => (ComparisonOp::EndsWith, false),
        "_NOT_ENDS_WITH" => (ComparisonOp::EndsWith, true),
        "_MATCHES" => (ComparisonOp::RegexMatch, false),
        other => {
            return Err(invalid(format!(
                "operator `{}` does not apply to scalar field `{}`",
                other.trim_start_matches('_'),
                field.name
            )))
        }
    };

    let includes = matches!(suffix, "_INCLUDES" | "_NOT_INCLUDES");
    match op {
        ComparisonOp::In if includes && !field.is_list => {
            return Err(invalid(format!("`{}` is not a list field", field.name)))
        }
        ComparisonOp::In if !includes && (field.is_list || !value.is_array()) => {
            return Err(invalid(format!("`{}` expects a list of values", key)))
        }
        ComparisonOp::Lt | ComparisonOp::Lte | ComparisonOp::Gt | ComparisonOp::Gte
            if field.is_list || !is_orderable(field.kind) =>
        {
            return Err(invalid(format!("`{}` fields cannot be range-compared", field.kind)))
        }
        ComparisonOp::Contains
        | ComparisonOp::StartsWith
        | ComparisonOp::EndsWith
        | ComparisonOp::RegexMatch
            if field.is_list || !field.kind.is_textual() =>
        {
            return Err(invalid(format!("`{}` fields do not support string matching", field.kind)))
        }
        ComparisonOp::RegexMatch if !ctx.config().enable_regex => {
            return Err(invalid("regular expression filters are disabled".to_string()))
        }
        ComparisonOp::Eq if field.is_list != value.is_array() => {
            return Err(invalid(format!(
                "`{}` expects {}",
                key,
                if field.is_list { "a list" } else { "a single value" }
            )))
        }
        _ if includes && value.is_array() => {
            return Err(invalid(format!("`{}` expects a single value", key)))
        }
        _ => {}
    }

    let param = ctx.bind_literal(&hint, field.kind, value, path)?;
    let comparison = if includes {
        CypherExpr::compare(param, op, property)
    } else {
        CypherExpr::compare(property, op, param)
    };
    Ok(if negated {
        CypherExpr::negate(comparison)
    } else {
        comparison
    })
}

fn relationship_condition<'a>(
    ctx: &mut PlanCtx<'a>,
    rel: &'a RelationshipField,
    variable: &str,
    suffix: &str,
    value: &Value,
    path: &str,
) -> Result<CypherExpr, QueryPlannerError> {
    let quantifier = match suffix {
        "" | "_SOME" => "SOME",
        "_NONE" | "_NOT" => "NONE",
        "_ALL" => "ALL",
        other => {
            return Err(QueryPlannerError::invalid_argument(
                path,
                format!(
                    "operator `{}` does not apply to relationship `{}`",
                    other.trim_start_matches('_'),
                    rel.name
                ),
            ))
        }
    };
    let target = ctx.schema().resolve_type(&rel.target)?;
    let direction = pattern_direction(rel, None, path)?;
    let inner = ctx.fresh_variable(variable, &format!("{}_{}", rel.name, quantifier));
    let pattern = relationship_pattern(variable, rel, direction, &inner);
    // Only related nodes the caller may read take part in the quantifier.
    let visible = ctx.compile_auth(&target.auth, &inner, AuthOperation::Read);
    let exists = |filter: Option<CypherExpr>| CypherExpr::Exists {
        pattern: pattern.clone(),
        filter: CypherExpr::and_all(filter.into_iter().chain(visible.clone()).collect()).map(Box::new),
    };

    if value.is_null() {
        // `rel: null` asks for no related node, `rel_NOT: null` for at least one.
        return match suffix {
            "" => Ok(CypherExpr::negate(exists(None))),
            "_NOT" => Ok(exists(None)),
            _ => Err(QueryPlannerError::invalid_argument(
                path,
                format!("`{}{}` does not accept null", rel.name, suffix),
            )),
        };
    }

    let nested = compile_where(ctx, target, &inner, Some(value), path)?;
    Ok(match quantifier {
        "SOME" => exists(nested),
        "NONE" => CypherExpr::negate(exists(nested)),
        _ => match nested {
            Some(nested) => CypherExpr::And(vec![
                exists(None),
                CypherExpr::negate(exists(Some(CypherExpr::negate(nested)))),
            ]),
            None => exists(None),
        },
    })
}
