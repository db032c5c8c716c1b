use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::errors::GraphSchemaError;
use crate::auth::rules::AuthRule;
use crate::selection::OperationType;

/// Value kind of a stored or computed scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    String,
    Id,
    Int,
    /// 64-bit integer; values outside the 53-bit safe range travel as decimal strings.
    BigInt,
    Float,
    Boolean,
    Temporal(TemporalKind),
    Spatial(SpatialKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemporalKind {
    DateTime,
    LocalDateTime,
    Date,
    Time,
    LocalTime,
    Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpatialKind {
    Point,
    CartesianPoint,
}

impl ScalarKind {
    /// Map a schema scalar type name (`String`, `BigInt`, `LocalTime`, ...) to its kind
    pub fn from_type_name(name: &str) -> Option<Self> {
        let kind = match name {
            "String" => ScalarKind::String,
            "ID" => ScalarKind::Id,
            "Int" => ScalarKind::Int,
            "BigInt" => ScalarKind::BigInt,
            "Float" => ScalarKind::Float,
            "Boolean" => ScalarKind::Boolean,
            "DateTime" => ScalarKind::Temporal(TemporalKind::DateTime),
            "LocalDateTime" => ScalarKind::Temporal(TemporalKind::LocalDateTime),
            "Date" => ScalarKind::Temporal(TemporalKind::Date),
            "Time" => ScalarKind::Temporal(TemporalKind::Time),
            "LocalTime" => ScalarKind::Temporal(TemporalKind::LocalTime),
            "Duration" => ScalarKind::Temporal(TemporalKind::Duration),
            "Point" => ScalarKind::Spatial(SpatialKind::Point),
            "CartesianPoint" => ScalarKind::Spatial(SpatialKind::CartesianPoint),
            _ => return None,
        };
        Some(kind)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarKind::String => "String",
            ScalarKind::Id => "ID",
            ScalarKind::Int => "Int",
            ScalarKind::BigInt => "BigInt",
            ScalarKind::Float => "Float",
            ScalarKind::Boolean => "Boolean",
            ScalarKind::Temporal(TemporalKind::DateTime) => "DateTime",
            ScalarKind::Temporal(TemporalKind::LocalDateTime) => "LocalDateTime",
            ScalarKind::Temporal(TemporalKind::Date) => "Date",
            ScalarKind::Temporal(TemporalKind::Time) => "Time",
            ScalarKind::Temporal(TemporalKind::LocalTime) => "LocalTime",
            ScalarKind::Temporal(TemporalKind::Duration) => "Duration",
            ScalarKind::Spatial(SpatialKind::Point) => "Point",
            ScalarKind::Spatial(SpatialKind::CartesianPoint) => "CartesianPoint",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ScalarKind::Int | ScalarKind::BigInt | ScalarKind::Float)
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, ScalarKind::String | ScalarKind::Id)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Declared direction of a relationship, relative to the type that owns the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "OUT")]
    Outgoing,
    #[serde(rename = "IN")]
    Incoming,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Incoming => f.write_str("incoming"),
            Direction::Outgoing => f.write_str("outgoing"),
        }
    }
}

/// Per-relationship policy for whether traversal direction can be chosen per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryDirection {
    #[default]
    DefaultDirected,
    DefaultUndirected,
    DirectedOnly,
    UndirectedOnly,
}

impl QueryDirection {
    /// Whether the compiled pattern is directed, given an optional `directed` override.
    ///
    /// `*_ONLY` modes are fixed and ignore the override.
    pub fn resolve(&self, directed_override: Option<bool>) -> bool {
        match self {
            QueryDirection::DirectedOnly => true,
            QueryDirection::UndirectedOnly => false,
            QueryDirection::DefaultDirected => directed_override.unwrap_or(true),
            QueryDirection::DefaultUndirected => directed_override.unwrap_or(false),
        }
    }

    pub fn accepts_override(&self) -> bool {
        matches!(
            self,
            QueryDirection::DefaultDirected | QueryDirection::DefaultUndirected
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    pub name: String,
    pub kind: ScalarKind,
    pub is_list: bool,
    pub auth: Vec<AuthRule>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipField {
    pub name: String,
    /// Type name of the node at the far end of the edge
    pub target: String,
    /// Edge label, e.g. `ACTED_IN`
    pub edge_label: String,
    pub direction: Direction,
    pub query_direction: QueryDirection,
    pub is_list: bool,
    pub auth: Vec<AuthRule>,
}

/// What a computed field's statement yields.
#[derive(Debug, Clone, PartialEq)]
pub enum ComputedReturn {
    Scalar(ScalarKind),
    /// Nodes of a schema type, projected with a nested selection
    Node(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputedField {
    pub name: String,
    /// Raw Cypher statement. `this` is bound to the enclosing node and `$auth`
    /// to the claims context; declared arguments are bound by name.
    pub statement: String,
    pub returns: ComputedReturn,
    pub is_list: bool,
    pub arguments: Vec<(String, ScalarKind)>,
    pub auth: Vec<AuthRule>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldDescriptor {
    Scalar(ScalarField),
    Relationship(RelationshipField),
    Computed(ComputedField),
}

impl FieldDescriptor {
    pub fn name(&self) -> &str {
        match self {
            FieldDescriptor::Scalar(f) => &f.name,
            FieldDescriptor::Relationship(f) => &f.name,
            FieldDescriptor::Computed(f) => &f.name,
        }
    }

    pub fn auth_rules(&self) -> &[AuthRule] {
        match self {
            FieldDescriptor::Scalar(f) => &f.auth,
            FieldDescriptor::Relationship(f) => &f.auth,
            FieldDescriptor::Computed(f) => &f.auth,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    /// Plural used for root field names (`movies`, `createMovies`)
    pub plural: String,
    fields: Vec<FieldDescriptor>,
    field_index: HashMap<String, usize>,
    pub auth: Vec<AuthRule>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>, auth: Vec<AuthRule>) -> Self {
        let name = name.into();
        let field_index = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name().to_string(), i))
            .collect();
        TypeDescriptor {
            plural: default_plural(&name),
            name,
            fields,
            field_index,
            auth,
        }
    }

    pub fn with_plural(mut self, plural: impl Into<String>) -> Self {
        self.plural = plural.into();
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.field_index.get(name).map(|i| &self.fields[*i])
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    fn has_duplicate_fields(&self) -> Option<&str> {
        if self.field_index.len() == self.fields.len() {
            return None;
        }
        let mut seen = std::collections::HashSet::new();
        self.fields
            .iter()
            .map(FieldDescriptor::name)
            .find(|name| !seen.insert(*name))
    }
}

/// `Movie` -> `movies`, `Category` -> `categories`
pub fn default_plural(type_name: &str) -> String {
    let mut chars = type_name.chars();
    let mut plural = match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    let ends_in_consonant_y = plural.ends_with('y')
        && !plural
            .chars()
            .rev()
            .nth(1)
            .is_some_and(|c| "aeiou".contains(c));
    if ends_in_consonant_y {
        plural.pop();
        plural.push_str("ies");
    } else if plural.ends_with('s') || plural.ends_with('x') || plural.ends_with("ch") {
        plural.push_str("es");
    } else {
        plural.push('s');
    }
    plural
}

pub(crate) fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootFieldKind {
    Read,
    Aggregate,
    Create,
}

/// A selected field as resolved on its owning type.
#[derive(Debug, Clone, Copy)]
pub enum SelectedField<'a> {
    Field(&'a FieldDescriptor),
    /// `<relationship>Aggregate`
    RelationshipAggregate(&'a RelationshipField),
}

pub const AGGREGATE_SUFFIX: &str = "Aggregate";

/// Immutable schema model. Shared read-only across compilations.
#[derive(Debug, Clone)]
pub struct GraphSchema {
    types: HashMap<String, TypeDescriptor>,
    type_order: Vec<String>,
    query_fields: HashMap<String, (RootFieldKind, String)>,
    mutation_fields: HashMap<String, (RootFieldKind, String)>,
}

impl GraphSchema {
    /// Build the schema from already-structured type descriptors.
    ///
    /// Rejects duplicate names and relationship/computed targets that do not
    /// name a known type.
    pub fn build(types: Vec<TypeDescriptor>) -> Result<Self, GraphSchemaError> {
        let mut by_name = HashMap::new();
        let mut type_order = Vec::with_capacity(types.len());
        let mut query_fields = HashMap::new();
        let mut mutation_fields = HashMap::new();

        for type_desc in types {
            if let Some(dup) = type_desc.has_duplicate_fields() {
                return Err(GraphSchemaError::InvalidConfig {
                    message: format!("Duplicate field `{}` on type `{}`", dup, type_desc.name),
                });
            }
            if by_name.contains_key(&type_desc.name) {
                return Err(GraphSchemaError::InvalidConfig {
                    message: format!("Duplicate type `{}`", type_desc.name),
                });
            }
            let plural = type_desc.plural.clone();
            query_fields.insert(plural.clone(), (RootFieldKind::Read, type_desc.name.clone()));
            query_fields.insert(
                format!("{}{}", plural, AGGREGATE_SUFFIX),
                (RootFieldKind::Aggregate, type_desc.name.clone()),
            );
            mutation_fields.insert(
                format!("create{}", upper_first(&plural)),
                (RootFieldKind::Create, type_desc.name.clone()),
            );

            type_order.push(type_desc.name.clone());
            by_name.insert(type_desc.name.clone(), type_desc);
        }

        let schema = GraphSchema {
            types: by_name,
            type_order,
            query_fields,
            mutation_fields,
        };
        schema.check_targets()?;
        Ok(schema)
    }

    fn check_targets(&self) -> Result<(), GraphSchemaError> {
        for type_desc in self.types() {
            for field in type_desc.fields() {
                let target = match field {
                    FieldDescriptor::Relationship(rel) => Some(&rel.target),
                    FieldDescriptor::Computed(ComputedField {
                        returns: ComputedReturn::Node(target),
                        ..
                    }) => Some(target),
                    _ => None,
                };
                if let Some(target) = target {
                    if !self.types.contains_key(target) {
                        return Err(GraphSchemaError::InvalidConfig {
                            message: format!(
                                "Field `{}.{}` targets unknown type `{}`",
                                type_desc.name,
                                field.name(),
                                target
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn resolve_type(&self, type_name: &str) -> Result<&TypeDescriptor, GraphSchemaError> {
        self.types
            .get(type_name)
            .ok_or_else(|| GraphSchemaError::UnknownType {
                type_name: type_name.to_string(),
            })
    }

    pub fn resolve_field(
        &self,
        type_name: &str,
        field_name: &str,
    ) -> Result<&FieldDescriptor, GraphSchemaError> {
        self.resolve_type(type_name)?
            .field(field_name)
            .ok_or_else(|| GraphSchemaError::unknown_field(type_name, field_name))
    }

    /// Resolve a selection name on a type, including `<relationship>Aggregate` fields.
    pub fn resolve_selection(
        &self,
        type_name: &str,
        field_name: &str,
    ) -> Result<SelectedField<'_>, GraphSchemaError> {
        let type_desc = self.resolve_type(type_name)?;
        if let Some(field) = type_desc.field(field_name) {
            return Ok(SelectedField::Field(field));
        }
        if let Some(rel_name) = field_name.strip_suffix(AGGREGATE_SUFFIX) {
            if let Some(FieldDescriptor::Relationship(rel)) = type_desc.field(rel_name) {
                return Ok(SelectedField::RelationshipAggregate(rel));
            }
        }
        Err(GraphSchemaError::unknown_field(type_name, field_name))
    }

    /// Resolve a root field (`movies`, `moviesAggregate`, `createMovies`).
    pub fn resolve_root_field(
        &self,
        operation: OperationType,
        field_name: &str,
    ) -> Result<(RootFieldKind, &TypeDescriptor), GraphSchemaError> {
        let (root_type, fields) = match operation {
            OperationType::Query => ("Query", &self.query_fields),
            OperationType::Mutation => ("Mutation", &self.mutation_fields),
        };
        let (kind, type_name) = fields
            .get(field_name)
            .ok_or_else(|| GraphSchemaError::unknown_field(root_type, field_name))?;
        Ok((*kind, self.resolve_type(type_name)?))
    }

    /// Types in definition order
    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.type_order.iter().filter_map(|name| self.types.get(name))
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}
