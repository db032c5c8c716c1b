//! Authorization rule shapes attached to types and fields.
//!
//! The set is closed: each variant carries only what the predicate compiler
//! needs to turn it into a Cypher fragment.

use serde::{Deserialize, Serialize};

/// Operation a rule guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthOperation {
    Read,
    Create,
}

fn all_operations() -> Vec<AuthOperation> {
    vec![AuthOperation::Read, AuthOperation::Create]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthRule {
    #[serde(default = "all_operations")]
    pub operations: Vec<AuthOperation>,
    #[serde(flatten)]
    pub predicate: RulePredicate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RulePredicate {
    /// Holds iff the request carries claims
    IsAuthenticated,
    /// Holds iff the caller has at least one of the listed roles
    Roles { any: Vec<String> },
    /// `node.field` must equal the claim at the dotted `claim` path
    Allow { field: String, claim: String },
    /// Logical OR of the nested predicates
    Any { rules: Vec<RulePredicate> },
}

impl AuthRule {
    pub fn new(predicate: RulePredicate) -> Self {
        AuthRule {
            operations: all_operations(),
            predicate,
        }
    }

    pub fn for_operations(predicate: RulePredicate, operations: Vec<AuthOperation>) -> Self {
        AuthRule {
            operations,
            predicate,
        }
    }

    pub fn applies_to(&self, operation: AuthOperation) -> bool {
        self.operations.contains(&operation)
    }
}
