//! Runtime claims context for one compilation.

use serde_json::{Map, Value};

use crate::cypher_builder::params::ParamValue;

/// Claim the roles list is read from when no path is configured
pub const DEFAULT_ROLES_PATH: &str = "roles";

/// Decoded claims attached to a request, or none for an anonymous caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthContext {
    claims: Option<Map<String, Value>>,
    roles_path: Option<String>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_claims(claims: Map<String, Value>) -> Self {
        AuthContext {
            claims: Some(claims),
            roles_path: None,
        }
    }

    /// Context from an optional claims object; anything but a JSON object is anonymous
    pub fn from_value(value: Option<Value>) -> Self {
        match value {
            Some(Value::Object(claims)) => Self::from_claims(claims),
            _ => Self::anonymous(),
        }
    }

    pub fn with_roles_path(mut self, roles_path: Option<String>) -> Self {
        self.roles_path = roles_path;
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.claims.is_some()
    }

    pub fn claims(&self) -> Option<&Map<String, Value>> {
        self.claims.as_ref()
    }

    /// Look up a claim by dotted path. `\.` matches a literal dot inside a key.
    pub fn claim(&self, path: &str) -> Option<&Value> {
        let claims = self.claims.as_ref()?;
        let mut segments = split_claim_path(path).into_iter();
        let mut current = claims.get(&segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(&segment)?;
        }
        Some(current)
    }

    /// String roles at the configured roles path. Non-string entries are skipped.
    pub fn roles(&self) -> Vec<String> {
        let path = self.roles_path.as_deref().unwrap_or(DEFAULT_ROLES_PATH);
        match self.claim(path) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(role)) => vec![role.clone()],
            _ => vec![],
        }
    }

    /// `{isAuthenticated, roles, jwt}` as bound to `$auth` for computed statements
    pub fn to_param_value(&self) -> ParamValue {
        let jwt = match &self.claims {
            Some(claims) => ParamValue::from_json(&Value::Object(claims.clone())),
            None => ParamValue::Map(vec![]),
        };
        ParamValue::Map(vec![
            (
                "isAuthenticated".to_string(),
                ParamValue::Boolean(self.is_authenticated()),
            ),
            (
                "roles".to_string(),
                ParamValue::List(self.roles().into_iter().map(ParamValue::String).collect()),
            ),
            ("jwt".to_string(), jwt),
        ])
    }
}

fn split_claim_path(path: &str) -> Vec<String> {
    let mut segments = vec![String::new()];
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'.') => {
                chars.next();
                if let Some(last) = segments.last_mut() {
                    last.push('.');
                }
            }
            '.' => segments.push(String::new()),
            other => {
                if let Some(last) = segments.last_mut() {
                    last.push(other);
                }
            }
        }
    }
    segments
}
