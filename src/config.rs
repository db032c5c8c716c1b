use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::auth::jwt::VerificationPolicy;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Token verification settings
#[derive(Clone, Debug, Default, PartialEq, Validate, Serialize, Deserialize)]
pub struct JwtConfig {
    /// HS256 secret, or RS256 public key in PEM form
    #[validate(length(min = 1, message = "JWT secret cannot be empty"))]
    #[serde(default)]
    pub secret: Option<String>,

    /// Decode tokens without verifying them
    #[serde(default)]
    pub no_verify: bool,

    /// Dotted claim path holding the caller's roles; `\.` escapes a dot
    #[validate(custom(function = "validate_roles_path"))]
    #[serde(default)]
    pub roles_path: Option<String>,
}

impl JwtConfig {
    /// Verification policy for incoming tokens, if tokens can be accepted at all
    pub fn policy(&self) -> Option<VerificationPolicy> {
        if self.no_verify {
            return Some(VerificationPolicy::SkipVerification);
        }
        self.secret.clone().map(VerificationPolicy::Secret)
    }
}

fn validate_roles_path(path: &str) -> Result<(), ValidationError> {
    let unescaped = path.replace("\\.", "");
    if path.is_empty() || unescaped.split('.').any(str::is_empty) {
        return Err(ValidationError::new("roles_path")
            .with_message("Roles path must be a non-empty dotted claim path".into()));
    }
    Ok(())
}

/// Translator configuration with validation
#[derive(Clone, Debug, Default, PartialEq, Validate, Serialize, Deserialize)]
pub struct TranslatorConfig {
    /// Allow the `_MATCHES` regular-expression filter
    #[serde(default)]
    pub enable_regex: bool,

    #[validate(nested)]
    #[serde(default)]
    pub jwt: Option<JwtConfig>,
}

impl TranslatorConfig {
    /// Create configuration from environment variables with validation.
    ///
    /// A `.env` file in the working directory is loaded first, if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let secret = env::var("CYPHERGRAPH_JWT_SECRET").ok();
        let no_verify: bool = parse_env_var("CYPHERGRAPH_JWT_NO_VERIFY", "false")?;
        let roles_path = env::var("CYPHERGRAPH_JWT_ROLES_PATH").ok();
        let jwt = if secret.is_some() || no_verify || roles_path.is_some() {
            Some(JwtConfig {
                secret,
                no_verify,
                roles_path,
            })
        } else {
            None
        };

        let config = Self {
            enable_regex: parse_env_var("CYPHERGRAPH_ENABLE_REGEX", "false")?,
            jwt,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from CLI arguments with validation
    pub fn from_cli(cli: CliConfig) -> Result<Self, ConfigError> {
        let jwt = if cli.jwt_secret.is_some() || cli.jwt_no_verify || cli.jwt_roles_path.is_some()
        {
            Some(JwtConfig {
                secret: cli.jwt_secret,
                no_verify: cli.jwt_no_verify,
                roles_path: cli.jwt_roles_path,
            })
        } else {
            None
        };
        let config = Self {
            enable_regex: cli.enable_regex,
            jwt,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Overlay settings given on the command line. Flags that were not given
    /// leave the current value alone.
    pub fn merge(&mut self, other: Self) {
        self.enable_regex |= other.enable_regex;
        if let Some(other_jwt) = other.jwt {
            let jwt = self.jwt.get_or_insert_with(JwtConfig::default);
            if other_jwt.secret.is_some() {
                jwt.secret = other_jwt.secret;
            }
            if other_jwt.roles_path.is_some() {
                jwt.roles_path = other_jwt.roles_path;
            }
            jwt.no_verify |= other_jwt.no_verify;
        }
    }

    pub fn roles_path(&self) -> Option<String> {
        self.jwt.as_ref().and_then(|jwt| jwt.roles_path.clone())
    }
}

/// CLI configuration (parsed from command line arguments)
#[derive(Clone, Debug, Default)]
pub struct CliConfig {
    pub enable_regex: bool,
    pub jwt_secret: Option<String>,
    pub jwt_no_verify: bool,
    pub jwt_roles_path: Option<String>,
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
