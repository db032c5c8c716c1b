//! Selection tree handed to the planner.
//!
//! Parsing the query document is done upstream; this module only models the
//! parsed shape: field name, optional alias, literal arguments and nested
//! selections. Arguments keep their literal JSON form and are interpreted
//! against the schema during planning.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    #[default]
    Query,
    Mutation,
}

/// One root field of an incoming query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub operation: OperationType,
    pub selection: SelectionNode,
}

impl Operation {
    pub fn query(selection: SelectionNode) -> Self {
        Operation {
            operation: OperationType::Query,
            selection,
        }
    }

    pub fn mutation(selection: SelectionNode) -> Self {
        Operation {
            operation: OperationType::Mutation,
            selection,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub arguments: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selections: Vec<SelectionNode>,
}

impl SelectionNode {
    pub fn new(name: impl Into<String>) -> Self {
        SelectionNode {
            name: name.into(),
            alias: None,
            arguments: Map::new(),
            selections: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(name.into(), value);
        self
    }

    pub fn with_selections(mut self, selections: Vec<SelectionNode>) -> Self {
        self.selections = selections;
        self
    }

    /// Key under which this field appears in the result: the alias if any,
    /// otherwise the field name.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    pub fn child(&self, name: &str) -> Option<&SelectionNode> {
        self.selections.iter().find(|s| s.name == name)
    }
}

/// Shorthand for building leaf selections in tests and callers
pub fn fields(names: &[&str]) -> Vec<SelectionNode> {
    names.iter().map(|n| SelectionNode::new(*n)).collect()
}
