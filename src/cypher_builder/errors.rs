use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CypherBuilderError {
    #[error("Expected a {expected} literal, found `{found}`")]
    InvalidLiteral { expected: String, found: String },
    #[error("Integer {0} is out of range for Int (32-bit)")]
    IntOutOfRange(i64),
    #[error("Value `{0}` is out of range for BigInt (64-bit)")]
    BigIntOutOfRange(String),
    #[error("Invalid {kind} value `{value}`: {reason}")]
    InvalidTemporal {
        kind: String,
        value: String,
        reason: String,
    },
    #[error("Invalid point value: {0}")]
    InvalidPoint(String),
    #[error("Variable `{0}` is referenced before a clause introduces it")]
    UnboundVariable(String),
}

impl CypherBuilderError {
    pub fn invalid_literal(expected: impl Into<String>, found: &serde_json::Value) -> Self {
        CypherBuilderError::InvalidLiteral {
            expected: expected.into(),
            found: found.to_string(),
        }
    }
}
