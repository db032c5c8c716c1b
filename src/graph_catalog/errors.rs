//! # Graph Schema Error Types
//!
//! Errors raised while loading type definitions and while resolving type and
//! field references at plan time.
//!
//! ## Error Categories
//!
//! - **Lookup Errors**: a query references a type or field the schema does not define
//! - **Configuration Errors**: file I/O, YAML parsing and structural problems in definitions
//!
//! ## Usage Patterns
//!
//! ```ignore
//! GraphSchemaError::config_error_with_context(
//!     "schema.yaml",
//!     "While resolving relationship targets"
//! )
//! ```

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GraphSchemaError {
    #[error("Unknown type `{type_name}`")]
    UnknownType { type_name: String },
    #[error("Unknown field `{field_name}` on type `{type_name}`")]
    UnknownField {
        type_name: String,
        field_name: String,
    },
    #[error("Failed to read schema file: {error}")]
    ConfigRead { error: String },
    #[error("Failed to parse schema definitions: {error}")]
    ConfigParse { error: String },
    #[error("Invalid schema definitions: {message}")]
    InvalidConfig { message: String },
}

impl GraphSchemaError {
    pub fn unknown_field(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        GraphSchemaError::UnknownField {
            type_name: type_name.into(),
            field_name: field_name.into(),
        }
    }

    /// Create a configuration error with context information
    ///
    /// # Example
    /// ```ignore
    /// GraphSchemaError::config_error_with_context(
    ///     "schema.yaml",
    ///     "Relationship `Movie.actors` targets unknown type `Actr`"
    /// )
    /// ```
    pub fn config_error_with_context(
        config_path: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        GraphSchemaError::InvalidConfig {
            message: format!(
                "Configuration error in '{}'\n  Context: {}",
                config_path.into(),
                context.into()
            ),
        }
    }
}
