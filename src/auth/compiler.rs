//! Compiles authorization rules into boolean Cypher fragments.
//!
//! Compilation never fails. Anything that cannot hold for the current claims
//! (no claims, a missing claim, a claim of the wrong shape) folds to `false`.

use log::debug;
use serde_json::Value;

use super::context::AuthContext;
use super::rules::{AuthOperation, AuthRule, RulePredicate};
use crate::cypher_builder::expr::{ComparisonOp, CypherExpr};
use crate::cypher_builder::params::{ParamValue, ParameterTable};

/// Conjunction of every rule in `rules` that guards `operation`, bound to
/// `variable`. `None` when no rule constrains the level.
pub fn compile_rules(
    rules: &[AuthRule],
    context: &AuthContext,
    variable: &str,
    operation: AuthOperation,
    params: &mut ParameterTable,
) -> Option<CypherExpr> {
    let fragments = rules
        .iter()
        .filter(|rule| rule.applies_to(operation))
        .enumerate()
        .map(|(index, rule)| {
            let mut compiler = PredicateCompiler {
                context,
                variable,
                hint: format!("{}_auth{}", variable, index),
                params: &mut *params,
            };
            compiler.compile(&rule.predicate)
        })
        .collect();
    CypherExpr::and_all(fragments)
}

struct PredicateCompiler<'a> {
    context: &'a AuthContext,
    variable: &'a str,
    hint: String,
    params: &'a mut ParameterTable,
}

impl PredicateCompiler<'_> {
    fn compile(&mut self, predicate: &RulePredicate) -> CypherExpr {
        match predicate {
            RulePredicate::IsAuthenticated => CypherExpr::Boolean(self.context.is_authenticated()),
            RulePredicate::Roles { any } => {
                if !self.context.is_authenticated() {
                    return CypherExpr::Boolean(false);
                }
                let roles = self.context.roles();
                CypherExpr::Boolean(any.iter().any(|wanted| roles.contains(wanted)))
            }
            RulePredicate::Allow { field, claim } => self.compile_allow(field, claim),
            RulePredicate::Any { rules } => {
                let alternatives = rules.iter().map(|r| self.compile(r)).collect();
                CypherExpr::or_any(alternatives)
            }
        }
    }

    fn compile_allow(&mut self, field: &str, claim: &str) -> CypherExpr {
        let value = match self.context.claim(claim) {
            None | Some(Value::Null) => {
                debug!(
                    "Claim `{}` absent; rule on {}.{} compiles to false",
                    claim, self.variable, field
                );
                return CypherExpr::Boolean(false);
            }
            Some(Value::Object(_)) | Some(Value::Array(_)) => {
                debug!(
                    "Claim `{}` is not a scalar; rule on {}.{} compiles to false",
                    claim, self.variable, field
                );
                return CypherExpr::Boolean(false);
            }
            Some(scalar) => ParamValue::from_json(scalar),
        };
        let name = self
            .params
            .bind(&format!("{}_allow_{}", self.hint, field), value);
        CypherExpr::compare(
            CypherExpr::property(self.variable, field),
            ComparisonOp::Eq,
            CypherExpr::parameter(name),
        )
    }
}
