//! Field resolution: turns one selection level into a map projection,
//! recursing through relationships and computed fields.

use log::debug;
use serde_json::Value;

use super::errors::QueryPlannerError;
use super::plan_ctx::{PlanCtx, AUTH_PARAMETER};
use super::{aggregation, filters, options, ROOT_VARIABLE};
use crate::auth::AuthOperation;
use crate::cypher_builder::{
    Clause, CypherExpr, CypherQuery, CypherQueryBuilder, MatchClause, NodePattern, Pattern,
    PatternDirection, ProjectionEntry, RelationshipPattern, ReturnItem,
};
use crate::graph_catalog::{
    ComputedField, ComputedReturn, Direction, FieldDescriptor, RelationshipField, SelectedField,
    TypeDescriptor,
};
use crate::selection::SelectionNode;

/// Projection of one level plus the field-level authorization predicates
/// the selected fields contributed.
pub(crate) struct LevelProjection {
    pub projection: CypherExpr,
    pub field_auth: Vec<CypherExpr>,
}

/// Reject arguments a selection does not accept
pub(crate) fn check_arguments(
    selection: &SelectionNode,
    allowed: &[&str],
    path: &str,
) -> Result<(), QueryPlannerError> {
    match selection
        .arguments
        .keys()
        .find(|name| !allowed.contains(&name.as_str()))
    {
        Some(name) => Err(QueryPlannerError::invalid_argument(
            path,
            format!("`{}` does not accept argument `{}`", selection.name, name),
        )),
        None => Ok(()),
    }
}

/// Pattern direction for a relationship traversal from the owning node.
///
/// `directed` is honored only for the `DEFAULT_*` query-direction modes.
pub(crate) fn pattern_direction(
    rel: &RelationshipField,
    selection: Option<&SelectionNode>,
    path: &str,
) -> Result<PatternDirection, QueryPlannerError> {
    let directed_override = match selection.and_then(|s| s.argument("directed")) {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(other) => {
            return Err(QueryPlannerError::invalid_argument(
                path,
                format!("`directed` must be a boolean, found {}", other),
            ))
        }
    };
    if directed_override.is_some() && !rel.query_direction.accepts_override() {
        debug!(
            "Ignoring `directed` override on `{}`: query direction is {:?}",
            rel.name, rel.query_direction
        );
    }
    let direction = if rel.query_direction.resolve(directed_override) {
        match rel.direction {
            Direction::Outgoing => PatternDirection::Right,
            Direction::Incoming => PatternDirection::Left,
        }
    } else {
        PatternDirection::Both
    };
    Ok(direction)
}

/// `(parent)-[:LABEL]->(child:Target)` in the given direction
pub(crate) fn relationship_pattern(
    parent: &str,
    rel: &RelationshipField,
    direction: PatternDirection,
    child: &str,
) -> Pattern {
    Pattern::hop(
        NodePattern::bound(parent),
        RelationshipPattern {
            variable: None,
            edge_label: rel.edge_label.clone(),
            direction,
        },
        NodePattern::labelled(child, rel.target.clone()),
    )
}

fn require_subselection(selection: &SelectionNode, path: &str) -> Result<(), QueryPlannerError> {
    if selection.selections.is_empty() {
        return Err(QueryPlannerError::invalid_argument(
            path,
            format!("`{}` must select at least one field", selection.name),
        ));
    }
    Ok(())
}

fn require_leaf(selection: &SelectionNode, path: &str) -> Result<(), QueryPlannerError> {
    if !selection.selections.is_empty() {
        return Err(QueryPlannerError::invalid_argument(
            path,
            format!("`{}` is a scalar and takes no sub-selection", selection.name),
        ));
    }
    Ok(())
}

pub(crate) fn project_node<'a>(
    ctx: &mut PlanCtx<'a>,
    type_desc: &'a TypeDescriptor,
    variable: &str,
    selections: &[SelectionNode],
    path: &str,
) -> Result<LevelProjection, QueryPlannerError> {
    let mut entries = Vec::with_capacity(selections.len());
    let mut field_auth = Vec::new();

    for selection in selections {
        let key = selection.response_key();
        let field_path = format!("{}.{}", path, key);
        match ctx.schema().resolve_selection(&type_desc.name, &selection.name)? {
            SelectedField::Field(field) => {
                if let Some(pred) = ctx.compile_auth(field.auth_rules(), variable, AuthOperation::Read) {
                    field_auth.push(pred);
                }
                let entry = match field {
                    FieldDescriptor::Scalar(scalar) => {
                        check_arguments(selection, &[], &field_path)?;
                        require_leaf(selection, &field_path)?;
                        if key == scalar.name {
                            ProjectionEntry::Shorthand(scalar.name.clone())
                        } else {
                            ProjectionEntry::Keyed(
                                key.to_string(),
                                CypherExpr::property(variable, &scalar.name),
                            )
                        }
                    }
                    FieldDescriptor::Relationship(rel) => ProjectionEntry::Keyed(
                        key.to_string(),
                        relationship_list(ctx, rel, variable, selection, &field_path)?,
                    ),
                    FieldDescriptor::Computed(computed) => ProjectionEntry::Keyed(
                        key.to_string(),
                        computed_field(ctx, computed, variable, selection, &field_path)?,
                    ),
                };
                entries.push(entry);
            }
            SelectedField::RelationshipAggregate(rel) => {
                entries.push(ProjectionEntry::Keyed(
                    key.to_string(),
                    aggregation::nested_aggregate(ctx, rel, variable, selection, &field_path)?,
                ));
            }
        }
    }

    Ok(LevelProjection {
        projection: CypherExpr::MapProjection {
            variable: variable.to_string(),
            entries,
        },
        field_auth,
    })
}

/// Nested relationship selection as an inline pattern comprehension
fn relationship_list<'a>(
    ctx: &mut PlanCtx<'a>,
    rel: &'a RelationshipField,
    variable: &str,
    selection: &SelectionNode,
    path: &str,
) -> Result<CypherExpr, QueryPlannerError> {
    check_arguments(selection, &["where", "options", "directed"], path)?;
    require_subselection(selection, path)?;
    let target = ctx.schema().resolve_type(&rel.target)?;
    let direction = pattern_direction(rel, Some(selection), path)?;
    let child = ctx.fresh_variable(variable, selection.response_key());
    debug!(
        "Traversing {}.{} to {} as `{}` ({:?})",
        variable, rel.name, target.name, child, direction
    );

    let mut conditions = Vec::new();
    if let Some(filter) = filters::compile_where(
        ctx,
        target,
        &child,
        selection.argument("where"),
        &format!("{}.where", path),
    )? {
        conditions.push(filter);
    }
    if let Some(pred) = ctx.compile_auth(&target.auth, &child, AuthOperation::Read) {
        conditions.push(pred);
    }
    let level = project_node(ctx, target, &child, &selection.selections, path)?;
    conditions.extend(level.field_auth);

    let list_options =
        options::parse_options(target, selection.argument("options"), &format!("{}.options", path))?;
    let list = options::nested_list(
        ctx,
        &child,
        relationship_pattern(variable, rel, direction, &child),
        CypherExpr::and_all(conditions),
        level.projection,
        list_options,
    );
    Ok(if rel.is_list {
        list
    } else {
        CypherExpr::call("head", vec![list])
    })
}

/// Computed field as an `apoc.cypher.runFirstColumn` subquery. The statement
/// sees `this` as the enclosing node, `$auth` as the caller context, and each
/// declared argument by name.
fn computed_field<'a>(
    ctx: &mut PlanCtx<'a>,
    computed: &'a ComputedField,
    variable: &str,
    selection: &SelectionNode,
    path: &str,
) -> Result<CypherExpr, QueryPlannerError> {
    let declared: Vec<&str> = computed.arguments.iter().map(|(n, _)| n.as_str()).collect();
    check_arguments(selection, &declared, path)?;
    let key = selection.response_key();

    let auth = ctx.auth_param();
    let mut arguments = vec![
        (ROOT_VARIABLE.to_string(), CypherExpr::variable(variable)),
        (AUTH_PARAMETER.to_string(), CypherExpr::parameter(auth)),
    ];
    for (name, kind) in &computed.arguments {
        let value = selection.argument(name).unwrap_or(&Value::Null);
        let expr = ctx.bind_literal(
            &format!("{}_{}_{}", variable, key, name),
            *kind,
            value,
            &format!("{}.{}", path, name),
        )?;
        arguments.push((name.clone(), expr));
    }

    let run = CypherExpr::call(
        "apoc.cypher.runFirstColumn",
        vec![
            CypherExpr::StringLiteral(computed.statement.clone()),
            CypherExpr::Map(arguments),
            CypherExpr::Boolean(true),
        ],
    );

    let value = match &computed.returns {
        ComputedReturn::Scalar(_) => {
            require_leaf(selection, path)?;
            run
        }
        ComputedReturn::Node(target_name) => {
            require_subselection(selection, path)?;
            let target = ctx.schema().resolve_type(target_name)?;
            let child = ctx.fresh_variable(variable, key);
            let mut conditions = Vec::new();
            if let Some(pred) = ctx.compile_auth(&target.auth, &child, AuthOperation::Read) {
                conditions.push(pred);
            }
            let level = project_node(ctx, target, &child, &selection.selections, path)?;
            conditions.extend(level.field_auth);
            CypherExpr::ListComprehension {
                variable: child,
                list: Box::new(run),
                filter: CypherExpr::and_all(conditions).map(Box::new),
                projection: Some(Box::new(level.projection)),
            }
        }
    };
    Ok(if computed.is_list {
        value
    } else {
        CypherExpr::call("head", vec![value])
    })
}

/// `MATCH (this:T) [WHERE ...] [WITH ...] RETURN this { ... } as this`
pub(crate) fn plan_read<'a>(
    ctx: &mut PlanCtx<'a>,
    type_desc: &'a TypeDescriptor,
    selection: &SelectionNode,
) -> Result<CypherQuery, QueryPlannerError> {
    let path = selection.response_key();
    check_arguments(selection, &["where", "options"], path)?;
    require_subselection(selection, path)?;
    ctx.reserve_variable(ROOT_VARIABLE);
    debug!("Reading {} as `{}`", type_desc.name, ROOT_VARIABLE);

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
    let level = project_node(ctx, type_desc, ROOT_VARIABLE, &selection.selections, path)?;
    conditions.extend(level.field_auth);
    let list_options = options::parse_options(
        type_desc,
        selection.argument("options"),
        &format!("{}.options", path),
    )?;

    let mut builder = CypherQueryBuilder::new();
    builder.push(Clause::Match(MatchClause {
        pattern: Pattern::node(NodePattern::labelled(ROOT_VARIABLE, type_desc.name.clone())),
        filter: CypherExpr::and_all(conditions),
    }))?;
    if let Some(with) = list_options.and_then(|o| options::root_with_clause(ctx, ROOT_VARIABLE, &o)) {
        builder.push(Clause::With(with))?;
    }
    builder.push(Clause::Return(vec![ReturnItem {
        expr: level.projection,
        alias: Some(ROOT_VARIABLE.to_string()),
    }]))?;
    Ok(builder.build())
}
