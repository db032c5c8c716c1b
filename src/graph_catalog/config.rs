use super::errors::GraphSchemaError;
use super::graph_schema::{
    ComputedField, ComputedReturn, Direction, FieldDescriptor, GraphSchema, QueryDirection,
    RelationshipField, ScalarField, ScalarKind, TypeDescriptor,
};
use crate::auth::rules::AuthRule;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Schema definitions are loaded from YAML with the following structure:
///
/// ```yaml
/// types:
///   - name: Movie
///     fields:
///       - kind: scalar
///         name: title
///         type: String
///       - kind: relationship
///         name: actors
///         target: Actor
///         type: ACTED_IN
///         direction: IN
///         query_direction: DEFAULT_UNDIRECTED
///       - kind: computed
///         name: similar
///         returns: Movie
///         list: true
///         statement: |
///           MATCH (this)-[:IN_GENRE]->()<-[:IN_GENRE]-(m:Movie) RETURN m
///     auth:
///       - rule: is_authenticated
/// ```
///
/// Definitions are assumed to be structurally valid; loading only checks that
/// every name resolves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSchemaConfig {
    /// Optional schema name, reported by the CLI
    #[serde(default)]
    pub name: Option<String>,
    pub types: Vec<TypeDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub name: String,
    /// Overrides the default plural used for root fields
    #[serde(default)]
    pub plural: Option<String>,
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub auth: Vec<AuthRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldDefinition {
    Scalar {
        name: String,
        #[serde(rename = "type")]
        type_name: String,
        #[serde(default)]
        list: bool,
        #[serde(default)]
        auth: Vec<AuthRule>,
    },
    Relationship {
        name: String,
        target: String,
        /// Edge label
        #[serde(rename = "type")]
        edge_label: String,
        direction: Direction,
        #[serde(default)]
        query_direction: QueryDirection,
        #[serde(default = "default_true")]
        list: bool,
        #[serde(default)]
        auth: Vec<AuthRule>,
    },
    Computed {
        name: String,
        statement: String,
        returns: String,
        #[serde(default)]
        list: bool,
        #[serde(default)]
        arguments: Vec<ArgumentDefinition>,
        #[serde(default)]
        auth: Vec<AuthRule>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgumentDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

fn default_true() -> bool {
    true
}

fn scalar_kind(type_name: &str, owner: &str, field: &str) -> Result<ScalarKind, GraphSchemaError> {
    ScalarKind::from_type_name(type_name).ok_or_else(|| GraphSchemaError::InvalidConfig {
        message: format!(
            "Field `{}.{}` has unknown scalar type `{}`",
            owner, field, type_name
        ),
    })
}

impl FieldDefinition {
    fn to_descriptor(&self, owner: &str) -> Result<FieldDescriptor, GraphSchemaError> {
        let descriptor = match self {
            FieldDefinition::Scalar {
                name,
                type_name,
                list,
                auth,
            } => FieldDescriptor::Scalar(ScalarField {
                name: name.clone(),
                kind: scalar_kind(type_name, owner, name)?,
                is_list: *list,
                auth: auth.clone(),
            }),
            FieldDefinition::Relationship {
                name,
                target,
                edge_label,
                direction,
                query_direction,
                list,
                auth,
            } => FieldDescriptor::Relationship(RelationshipField {
                name: name.clone(),
                target: target.clone(),
                edge_label: edge_label.clone(),
                direction: *direction,
                query_direction: *query_direction,
                is_list: *list,
                auth: auth.clone(),
            }),
            FieldDefinition::Computed {
                name,
                statement,
                returns,
                list,
                arguments,
                auth,
            } => {
                // Anything that is not a known scalar is taken as a node type
                // and checked when the schema is built.
                let returns = match ScalarKind::from_type_name(returns) {
                    Some(kind) => ComputedReturn::Scalar(kind),
                    None => ComputedReturn::Node(returns.clone()),
                };
                let arguments = arguments
                    .iter()
                    .map(|arg| Ok((arg.name.clone(), scalar_kind(&arg.type_name, owner, name)?)))
                    .collect::<Result<Vec<_>, GraphSchemaError>>()?;
                FieldDescriptor::Computed(ComputedField {
                    name: name.clone(),
                    statement: statement.trim().to_string(),
                    returns,
                    is_list: *list,
                    arguments,
                    auth: auth.clone(),
                })
            }
        };
        Ok(descriptor)
    }
}

impl GraphSchemaConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, GraphSchemaError> {
        serde_yaml::from_str(content).map_err(|e| GraphSchemaError::ConfigParse {
            error: e.to_string(),
        })
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, GraphSchemaError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| GraphSchemaError::ConfigRead {
            error: format!("{}: {}", path.as_ref().display(), e),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Convert definitions into the immutable schema model
    pub fn to_graph_schema(&self) -> Result<GraphSchema, GraphSchemaError> {
        let types = self
            .types
            .iter()
            .map(|def| {
                let fields = def
                    .fields
                    .iter()
                    .map(|f| f.to_descriptor(&def.name))
                    .collect::<Result<Vec<_>, _>>()?;
                let type_desc = TypeDescriptor::new(def.name.clone(), fields, def.auth.clone());
                Ok(match &def.plural {
                    Some(plural) => type_desc.with_plural(plural.clone()),
                    None => type_desc,
                })
            })
            .collect::<Result<Vec<_>, GraphSchemaError>>()?;
        GraphSchema::build(types)
    }
}

/// Load and build a schema from a YAML file
pub fn load_schema<P: AsRef<Path>>(path: P) -> Result<GraphSchema, GraphSchemaError> {
    let path = path.as_ref();
    let config = GraphSchemaConfig::from_yaml_file(path)?;
    config.to_graph_schema().map_err(|e| match e {
        GraphSchemaError::InvalidConfig { message } => {
            GraphSchemaError::config_error_with_context(path.display().to_string(), message)
        }
        other => other,
    })
}
