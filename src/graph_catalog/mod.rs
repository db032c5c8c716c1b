pub mod config;
pub mod errors;
pub mod graph_schema;

// Re-export commonly used types
pub use config::{load_schema, GraphSchemaConfig};
pub use errors::GraphSchemaError;
pub use graph_schema::{
    ComputedField, ComputedReturn, Direction, FieldDescriptor, GraphSchema, QueryDirection,
    RelationshipField, RootFieldKind, ScalarField, ScalarKind, SelectedField, SpatialKind,
    TemporalKind, TypeDescriptor,
};
