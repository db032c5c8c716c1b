//! Aggregate selections: root `<plural>Aggregate` and nested
//! `<relationship>Aggregate` fields.

use log::debug;

use super::errors::QueryPlannerError;
use super::plan_ctx::PlanCtx;
use super::projection::{check_arguments, pattern_direction, relationship_pattern};
use super::{filters, ROOT_VARIABLE};
use crate::auth::AuthOperation;
use crate::cypher_builder::aggregation_registry::{get_aggregation_op, ops_for_kind};
use crate::cypher_builder::{
    Clause, CypherExpr, CypherQuery, CypherQueryBuilder, MatchClause, NodePattern, Pattern,
    ReturnItem, ToCypher,
};
use crate::graph_catalog::{FieldDescriptor, RelationshipField, ScalarField, TypeDescriptor};
use crate::selection::SelectionNode;

const COUNT: &str = "count";
const NODE: &str = "node";

/// Aggregations of one selected scalar field of `type_desc`, plus the
/// field-level authorization that field carries.
fn field_aggregate<'a>(
    ctx: &mut PlanCtx<'a>,
    type_desc: &'a TypeDescriptor,
    variable: &str,
    selection: &SelectionNode,
    path: &str,
) -> Result<(CypherExpr, Option<CypherExpr>), QueryPlannerError> {
    let field_path = format!("{}.{}", path, selection.response_key());
    let scalar = match ctx.schema().resolve_field(&type_desc.name, &selection.name)? {
        FieldDescriptor::Scalar(scalar) if !scalar.is_list => scalar,
        _ => {
            return Err(QueryPlannerError::invalid_argument(
                &field_path,
                format!("`{}` cannot be aggregated", selection.name),
            ))
        }
    };
    check_arguments(selection, &[], &field_path)?;
    let auth = ctx.compile_auth(&scalar.auth, variable, AuthOperation::Read);
    Ok((operator_map(scalar, variable, selection, &field_path)?, auth))
}

/// `{ min: min(v.f), max: max(v.f), ... }` for one field
fn operator_map(
    field: &ScalarField,
    variable: &str,
    selection: &SelectionNode,
    path: &str,
) -> Result<CypherExpr, QueryPlannerError> {
    if selection.selections.is_empty() {
        return Err(QueryPlannerError::invalid_argument(
            path,
            format!("select at least one aggregation of `{}`", field.name),
        ));
    }
    let mut entries = Vec::with_capacity(selection.selections.len());
    for op_selection in &selection.selections {
        let op = get_aggregation_op(&op_selection.name)
            .filter(|op| (op.accepts)(field.kind))
            .ok_or_else(|| {
                QueryPlannerError::invalid_argument(
                    path,
                    format!(
                        "`{}` is not an aggregation of {} fields (expected one of: {})",
                        op_selection.name,
                        field.kind,
                        ops_for_kind(field.kind).join(", ")
                    ),
                )
            })?;
        entries.push((
            op_selection.response_key().to_string(),
            (op.build)(CypherExpr::property(variable, &field.name)),
        ));
    }
    Ok(CypherExpr::Map(entries))
}

fn require_leaf(selection: &SelectionNode, path: &str) -> Result<(), QueryPlannerError> {
    if !selection.selections.is_empty() || !selection.arguments.is_empty() {
        return Err(QueryPlannerError::invalid_argument(
            path,
            format!("`{}` takes no arguments or sub-selection", selection.name),
        ));
    }
    Ok(())
}

/// `MATCH (this:T) [WHERE ...] RETURN { count: count(this), field: { op: ... } }`
pub(crate) fn plan_root_aggregate<'a>(
    ctx: &mut PlanCtx<'a>,
    type_desc: &'a TypeDescriptor,
    selection: &SelectionNode,
) -> Result<CypherQuery, QueryPlannerError> {
    let path = selection.response_key();
    check_arguments(selection, &["where"], path)?;
    ctx.reserve_variable(ROOT_VARIABLE);
    debug!("Aggregating {} as `{}`", type_desc.name, ROOT_VARIABLE);

    let mut conditions = Vec::new();
    if let Some(filter) = filters::compile_where(
        ctx,
        type_desc,
        ROOT_VARIABLE,
        selection.argument("where"),
        &format!("{}.where", path),
    )? {
        conditions.push(filter);
    }
    if let Some(pred) = ctx.compile_auth(&type_desc.auth, ROOT_VARIABLE, AuthOperation::Read) {
        conditions.push(pred);
    }

    let mut entries = Vec::with_capacity(selection.selections.len());
    for child in &selection.selections {
        let value = if child.name == COUNT {
            require_leaf(child, &format!("{}.{}", path, child.response_key()))?;
            CypherExpr::call(COUNT, vec![CypherExpr::variable(ROOT_VARIABLE)])
        } else {
            let (value, auth) = field_aggregate(ctx, type_desc, ROOT_VARIABLE, child, path)?;
            conditions.extend(auth);
            value
        };
        entries.push((child.response_key().to_string(), value));
    }

    let mut builder = CypherQueryBuilder::new();
    builder.push(Clause::Match(MatchClause {
        pattern: Pattern::node(NodePattern::labelled(ROOT_VARIABLE, type_desc.name.clone())),
        filter: CypherExpr::and_all(conditions),
    }))?;
    builder.push(Clause::Return(vec![ReturnItem {
        expr: CypherExpr::Map(entries),
        alias: None,
    }]))?;
    Ok(builder.build())
}

/// Relationship aggregate as a subquery run per parent node:
/// `head(apoc.cypher.runFirstColumn("MATCH ... RETURN { ... }", { this: this, p: $p }, true))`.
/// Every parameter the inner query reads is passed through.
pub(crate) fn nested_aggregate<'a>(
    ctx: &mut PlanCtx<'a>,
    rel: &'a RelationshipField,
    variable: &str,
    selection: &SelectionNode,
    path: &str,
) -> Result<CypherExpr, QueryPlannerError> {
    check_arguments(selection, &["where", "directed"], path)?;
    let target = ctx.schema().resolve_type(&rel.target)?;
    let direction = pattern_direction(rel, Some(selection), path)?;
    let inner = ctx.fresh_variable(variable, selection.response_key());
    debug!(
        "Aggregating {}.{} over {} as `{}` ({:?})",
        variable, rel.name, target.name, inner, direction
    );

    let mut conditions = Vec::new();
    if let Some(filter) = filters::compile_where(
        ctx,
        target,
        &inner,
        selection.argument("where"),
        &format!("{}.where", path),
    )? {
        conditions.push(filter);
    }
    if let Some(pred) = ctx.compile_auth(&target.auth, &inner, AuthOperation::Read) {
        conditions.push(pred);
    }

    let mut entries = Vec::new();
    for child in &selection.selections {
        let child_path = format!("{}.{}", path, child.response_key());
        match child.name.as_str() {
            COUNT => {
                require_leaf(child, &child_path)?;
                entries.push((
                    child.response_key().to_string(),
                    CypherExpr::call(COUNT, vec![CypherExpr::variable(&inner)]),
                ));
            }
            NODE => {
                check_arguments(child, &[], &child_path)?;
                let mut node_entries = Vec::with_capacity(child.selections.len());
                for field in &child.selections {
                    let (value, auth) = field_aggregate(ctx, target, &inner, field, &child_path)?;
                    conditions.extend(auth);
                    node_entries.push((field.response_key().to_string(), value));
                }
                entries.push((child.response_key().to_string(), CypherExpr::Map(node_entries)));
            }
            other => {
                return Err(QueryPlannerError::invalid_argument(
                    &child_path,
                    format!("`{}` is not an aggregation field; expected `count` or `node`", other),
                ))
            }
        }
    }

    let filter = CypherExpr::and_all(conditions);
    let result = CypherExpr::Map(entries);
    let mut passed = vec![(variable.to_string(), CypherExpr::variable(variable))];
    let mut referenced = filter.as_ref().map(CypherExpr::parameters).unwrap_or_default();
    for name in result.parameters() {
        if !referenced.contains(&name) {
            referenced.push(name);
        }
    }
    passed.extend(
        referenced
            .into_iter()
            .map(|name| (name.clone(), CypherExpr::parameter(name))),
    );

    let mut builder = CypherQueryBuilder::new();
    builder.push(Clause::Match(MatchClause {
        pattern: relationship_pattern(variable, rel, direction, &inner),
        filter,
    }))?;
    builder.push(Clause::Return(vec![ReturnItem {
        expr: result,
        alias: None,
    }]))?;
    let statement = builder.build().to_cypher().replace('\n', " ");

    Ok(CypherExpr::call(
        "head",
        vec![CypherExpr::call(
            "apoc.cypher.runFirstColumn",
            vec![
                CypherExpr::StringLiteral(statement),
                CypherExpr::Map(passed),
                CypherExpr::Boolean(true),
            ],
        )],
    ))
}
