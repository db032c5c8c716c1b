//! `create<Plural>` mutations.
//!
//! Each input element becomes its own `CALL { CREATE ... RETURN thisN }`
//! block; the created nodes are projected together at the end.

use log::debug;
use serde_json::Value;

use super::errors::QueryPlannerError;
use super::plan_ctx::PlanCtx;
use super::projection::{check_arguments, project_node};
use super::ROOT_VARIABLE;
use crate::auth::AuthOperation;
use crate::cypher_builder::{
    Clause, CypherExpr, CypherQuery, CypherQueryBuilder, NodePattern, ReturnItem,
};
use crate::graph_catalog::graph_schema::upper_first;
use crate::graph_catalog::{FieldDescriptor, GraphSchemaError, TypeDescriptor};
use crate::selection::SelectionNode;

/// Alias of the list of created nodes
pub const CREATE_RESULT: &str = "data";

pub(crate) fn plan_create<'a>(
    ctx: &mut PlanCtx<'a>,
    type_desc: &'a TypeDescriptor,
    selection: &SelectionNode,
) -> Result<CypherQuery, QueryPlannerError> {
    let path = selection.response_key();
    check_arguments(selection, &["input"], path)?;
    let input_path = format!("{}.input", path);
    let inputs = match selection.argument("input") {
        Some(Value::Array(items)) => items.as_slice(),
        Some(object @ Value::Object(_)) => std::slice::from_ref(object),
        _ => {
            return Err(QueryPlannerError::invalid_argument(
                &input_path,
                "expected a list of input objects",
            ))
        }
    };

    // The response type carries the created nodes under the type's plural.
    let response_type = format!("Create{}MutationResponse", upper_first(&type_desc.plural));
    let mut node_selections: Option<&SelectionNode> = None;
    for child in &selection.selections {
        if child.name != type_desc.plural {
            return Err(GraphSchemaError::unknown_field(&response_type, &child.name).into());
        }
        check_arguments(child, &[], &format!("{}.{}", path, child.response_key()))?;
        node_selections = Some(child);
    }

    let mut builder = CypherQueryBuilder::new();
    let mut projections = Vec::with_capacity(inputs.len());
    let mut read_auth = Vec::new();

    for (index, input) in inputs.iter().enumerate() {
        let variable = format!("{}{}", ROOT_VARIABLE, index);
        ctx.reserve_variable(&variable);
        let item_path = format!("{}[{}]", input_path, index);
        debug!("Creating {} as `{}`", type_desc.name, variable);

        let body = create_body(ctx, type_desc, &variable, input, &item_path)?;
        builder.push(Clause::Call(body))?;

        if let Some(nodes) = node_selections {
            if let Some(pred) = ctx.compile_auth(&type_desc.auth, &variable, AuthOperation::Read) {
                read_auth.push(pred);
            }
            let node_path = format!("{}.{}", path, nodes.response_key());
            let level = project_node(ctx, type_desc, &variable, &nodes.selections, &node_path)?;
            read_auth.extend(level.field_auth);
            projections.push(level.projection);
        } else {
            projections.push(CypherExpr::variable(&variable));
        }
    }

    if let Some(pred) = CypherExpr::and_all(read_auth) {
        builder.push(Clause::Validate(pred))?;
    }
    builder.push(Clause::Return(vec![ReturnItem {
        expr: CypherExpr::List(projections),
        alias: Some(CREATE_RESULT.to_string()),
    }]))?;
    Ok(builder.build())
}

/// `CREATE (thisN:T)`, one `SET` per input field, the create-time
/// authorization check, then `RETURN thisN`.
fn create_body<'a>(
    ctx: &mut PlanCtx<'a>,
    type_desc: &'a TypeDescriptor,
    variable: &str,
    input: &Value,
    path: &str,
) -> Result<Vec<Clause>, QueryPlannerError> {
    let fields = input.as_object().ok_or_else(|| {
        QueryPlannerError::invalid_argument(path, format!("expected an input object, found {}", input))
    })?;

    let mut body = vec![Clause::Create(NodePattern::labelled(variable, type_desc.name.clone()))];
    let mut checks = Vec::new();
    if let Some(pred) = ctx.compile_auth(&type_desc.auth, variable, AuthOperation::Create) {
        checks.push(pred);
    }

    for (name, value) in fields {
        let field_path = format!("{}.{}", path, name);
        let scalar = match ctx.schema().resolve_field(&type_desc.name, name)? {
            FieldDescriptor::Scalar(scalar) => scalar,
            _ => {
                return Err(QueryPlannerError::invalid_argument(
                    &field_path,
                    format!("`{}` is not a stored scalar and cannot be set on create", name),
                ))
            }
        };
        if scalar.is_list != value.is_array() && !value.is_null() {
            return Err(QueryPlannerError::invalid_argument(
                &field_path,
                format!(
                    "`{}` expects {}",
                    name,
                    if scalar.is_list { "a list" } else { "a single value" }
                ),
            ));
        }
        let expr = ctx.bind_literal(
            &format!("{}_{}", variable, name),
            scalar.kind,
            value,
            &field_path,
        )?;
        body.push(Clause::Set {
            variable: variable.to_string(),
            key: scalar.name.clone(),
            value: expr,
        });
        if let Some(pred) = ctx.compile_auth(&scalar.auth, variable, AuthOperation::Create) {
            checks.push(pred);
        }
    }

    if let Some(pred) = CypherExpr::and_all(checks) {
        body.push(Clause::Validate(pred));
    }
    body.push(Clause::Return(vec![ReturnItem {
        expr: CypherExpr::variable(variable),
        alias: None,
    }]));
    Ok(body)
}
