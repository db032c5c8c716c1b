use thiserror::Error;

use crate::cypher_builder::CypherBuilderError;
use crate::graph_catalog::GraphSchemaError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryPlannerError {
    #[error(transparent)]
    Schema(#[from] GraphSchemaError),
    #[error("Invalid argument at `{path}`: {message}")]
    InvalidArgument { path: String, message: String },
    #[error("Query construction failed: {0}")]
    Builder(#[from] CypherBuilderError),
}

impl QueryPlannerError {
    pub fn invalid_argument(path: impl Into<String>, message: impl Into<String>) -> Self {
        QueryPlannerError::InvalidArgument {
            path: path.into(),
            message: message.into(),
        }
    }

    /// A literal that could not be converted to the kind its field expects
    pub fn invalid_literal(path: impl Into<String>, error: CypherBuilderError) -> Self {
        QueryPlannerError::InvalidArgument {
            path: path.into(),
            message: error.to_string(),
        }
    }
}
