//! Read-back of raw query results.
//!
//! The database returns 64-bit integers exactly. `BigInt` values outside the
//! range a double represents exactly are handed to callers as decimal
//! strings; everything else passes through untouched.

use serde_json::{Map, Value};

use crate::cypher_builder::params::is_safe_integer;
use crate::graph_catalog::{
    ComputedReturn, FieldDescriptor, GraphSchema, GraphSchemaError, RelationshipField,
    RootFieldKind, ScalarKind, SelectedField, TypeDescriptor,
};
use crate::selection::{Operation, SelectionNode};

/// Normalize the value returned for `operation`'s root field.
///
/// `value` has the response shape of the root field: a list of node objects
/// for reads, the aggregation object for aggregates, and
/// `{ <plural>: [...] }` for creates.
pub fn normalize_result(
    schema: &GraphSchema,
    operation: &Operation,
    value: Value,
) -> Result<Value, GraphSchemaError> {
    let selection = &operation.selection;
    let (kind, type_desc) = schema.resolve_root_field(operation.operation, &selection.name)?;
    match kind {
        RootFieldKind::Read => normalize_node(schema, type_desc, &selection.selections, value),
        RootFieldKind::Aggregate => {
            normalize_aggregate_fields(type_desc, &selection.selections, value)
        }
        RootFieldKind::Create => map_object(value, |key, field_value| {
            match selection.selections.iter().find(|s| s.response_key() == key) {
                Some(nodes) => normalize_node(schema, type_desc, &nodes.selections, field_value),
                None => Ok(field_value),
            }
        }),
    }
}

/// Wide integer → decimal string; lists are normalized element-wise.
fn normalize_big_int(value: Value) -> Value {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) if is_safe_integer(i) => Value::Number(n),
            Some(i) => Value::String(i.to_string()),
            None if n.is_u64() => Value::String(n.to_string()),
            None => Value::Number(n),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_big_int).collect()),
        other => other,
    }
}

fn map_object<F>(value: Value, mut f: F) -> Result<Value, GraphSchemaError>
where
    F: FnMut(&str, Value) -> Result<Value, GraphSchemaError>,
{
    match value {
        Value::Object(object) => {
            let mut out = Map::with_capacity(object.len());
            for (key, field_value) in object {
                let normalized = f(&key, field_value)?;
                out.insert(key, normalized);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other),
    }
}

fn normalize_node(
    schema: &GraphSchema,
    type_desc: &TypeDescriptor,
    selections: &[SelectionNode],
    value: Value,
) -> Result<Value, GraphSchemaError> {
    if let Value::Array(items) = value {
        return items
            .into_iter()
            .map(|item| normalize_node(schema, type_desc, selections, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array);
    }
    map_object(value, |key, field_value| {
        let Some(selection) = selections.iter().find(|s| s.response_key() == key) else {
            return Ok(field_value);
        };
        match schema.resolve_selection(&type_desc.name, &selection.name)? {
            SelectedField::Field(FieldDescriptor::Scalar(scalar)) => {
                Ok(if scalar.kind == ScalarKind::BigInt {
                    normalize_big_int(field_value)
                } else {
                    field_value
                })
            }
            SelectedField::Field(FieldDescriptor::Relationship(rel)) => {
                let target = schema.resolve_type(&rel.target)?;
                normalize_node(schema, target, &selection.selections, field_value)
            }
            SelectedField::Field(FieldDescriptor::Computed(computed)) => match &computed.returns {
                ComputedReturn::Scalar(ScalarKind::BigInt) => Ok(normalize_big_int(field_value)),
                ComputedReturn::Scalar(_) => Ok(field_value),
                ComputedReturn::Node(target) => {
                    let target = schema.resolve_type(target)?;
                    normalize_node(schema, target, &selection.selections, field_value)
                }
            },
            SelectedField::RelationshipAggregate(rel) => {
                normalize_nested_aggregate(schema, rel, selection, field_value)
            }
        }
    })
}

/// `{ count, node: { field: { op: value } } }`
fn normalize_nested_aggregate(
    schema: &GraphSchema,
    rel: &RelationshipField,
    selection: &SelectionNode,
    value: Value,
) -> Result<Value, GraphSchemaError> {
    let target = schema.resolve_type(&rel.target)?;
    map_object(value, |key, field_value| {
        match selection.selections.iter().find(|s| s.response_key() == key) {
            Some(node) if node.name == "node" => {
                normalize_aggregate_fields(target, &node.selections, field_value)
            }
            _ => Ok(field_value),
        }
    })
}

/// `{ count, field: { min, max, sum, ... } }` over `type_desc`.
/// `average` is a float and is left alone.
fn normalize_aggregate_fields(
    type_desc: &TypeDescriptor,
    selections: &[SelectionNode],
    value: Value,
) -> Result<Value, GraphSchemaError> {
    map_object(value, |key, field_value| {
        let Some(selection) = selections.iter().find(|s| s.response_key() == key) else {
            return Ok(field_value);
        };
        match type_desc.field(&selection.name) {
            Some(FieldDescriptor::Scalar(scalar)) if scalar.kind == ScalarKind::BigInt => {
                map_object(field_value, |op_key, op_value| {
                    let op = selection
                        .selections
                        .iter()
                        .find(|s| s.response_key() == op_key)
                        .map(|s| s.name.as_str());
                    Ok(match op {
                        Some("min") | Some("max") | Some("sum") => normalize_big_int(op_value),
                        _ => op_value,
                    })
                })
            }
            _ => Ok(field_value),
        }
    })
}
