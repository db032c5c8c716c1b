//! Cypher clause AST, parameter table and canonical serializer.

pub mod aggregation_registry;
pub mod clauses;
pub mod errors;
pub mod expr;
pub mod params;
pub mod temporal;
pub mod to_cypher;

pub use clauses::{Clause, CypherQuery, CypherQueryBuilder, MatchClause, OrderByItem, ReturnItem, WithClause};
pub use errors::CypherBuilderError;
pub use expr::{
    ComparisonOp, CypherExpr, NodePattern, Pattern, PatternDirection, ProjectionEntry,
    RelationshipPattern,
};
pub use params::{ParamValue, ParameterTable, PointValue};
pub use to_cypher::ToCypher;
