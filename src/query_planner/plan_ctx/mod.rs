//! Planning context for one compilation.
//!
//! [`PlanCtx`] owns everything a single pass mutates:
//! - the [`ParameterTable`] every literal is bound through
//! - the [`VariableArena`] handing out graph variable names
//! - the lazily bound `$auth` context parameter
//!
//! The schema, claims and configuration are borrowed read-only, so one
//! schema can back any number of concurrent compilations.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::{
    auth::{compile_rules, AuthContext, AuthOperation, AuthRule},
    config::TranslatorConfig,
    cypher_builder::{
        params::{constructor_for, sanitize_parameter_name},
        CypherExpr, ParamValue, ParameterTable,
    },
    graph_catalog::{GraphSchema, ScalarKind},
    query_planner::errors::QueryPlannerError,
};

/// Name of the `$auth` parameter handed to computed statements
pub const AUTH_PARAMETER: &str = "auth";

/// Graph variable names keyed by (parent variable, path segment).
///
/// The same path always yields the same name within a compilation, and a
/// compilation that walks the same selection tree walks the same paths, so
/// names are stable across recompiles. Distinct paths whose natural names
/// coincide get `_1`, `_2`, ... suffixes.
#[derive(Debug, Default, Clone)]
pub struct VariableArena {
    by_path: BTreeMap<(String, String), String>,
    taken: BTreeSet<String>,
}

impl VariableArena {
    pub fn reserve(&mut self, name: &str) {
        self.taken.insert(name.to_string());
    }

    pub fn allocate(&mut self, parent: &str, segment: &str) -> String {
        let key = (parent.to_string(), segment.to_string());
        if let Some(name) = self.by_path.get(&key) {
            return name.clone();
        }
        let base = sanitize_parameter_name(&format!("{}_{}", parent, segment));
        let mut name = base.clone();
        let mut suffix = 1;
        while self.taken.contains(&name) {
            name = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        self.taken.insert(name.clone());
        self.by_path.insert(key, name.clone());
        name
    }
}

pub struct PlanCtx<'a> {
    schema: &'a GraphSchema,
    auth: &'a AuthContext,
    config: &'a TranslatorConfig,
    params: ParameterTable,
    variables: VariableArena,
    auth_param: Option<String>,
}

impl<'a> PlanCtx<'a> {
    pub fn new(schema: &'a GraphSchema, auth: &'a AuthContext, config: &'a TranslatorConfig) -> Self {
        PlanCtx {
            schema,
            auth,
            config,
            params: ParameterTable::new(),
            variables: VariableArena::default(),
            auth_param: None,
        }
    }

    pub fn schema(&self) -> &'a GraphSchema {
        self.schema
    }

    pub fn auth(&self) -> &'a AuthContext {
        self.auth
    }

    pub fn config(&self) -> &'a TranslatorConfig {
        self.config
    }

    /// Claim a top-level variable (`this`, `this0`, ...) so nested names never reuse it
    pub fn reserve_variable(&mut self, name: &str) {
        self.variables.reserve(name);
    }

    pub fn fresh_variable(&mut self, parent: &str, segment: &str) -> String {
        self.variables.allocate(parent, segment)
    }

    pub fn bind(&mut self, hint: &str, value: ParamValue) -> String {
        self.params.bind(hint, value)
    }

    /// Bind a caller literal against `kind` and return the expression that
    /// reads it: `$p`, or `localtime($p)` / `[v IN $p | point(v)]` for
    /// temporal and spatial kinds.
    pub fn bind_literal(
        &mut self,
        hint: &str,
        kind: ScalarKind,
        value: &Value,
        path: &str,
    ) -> Result<CypherExpr, QueryPlannerError> {
        let converted = ParamValue::from_literal(kind, value)
            .map_err(|e| QueryPlannerError::invalid_literal(path, e))?;
        let is_list = matches!(converted, ParamValue::List(_));
        let param = CypherExpr::parameter(self.params.bind(hint, converted));
        Ok(match constructor_for(kind) {
            None => param,
            Some(constructor) if is_list => CypherExpr::ListComprehension {
                variable: "v".to_string(),
                list: Box::new(param),
                filter: None,
                projection: Some(Box::new(CypherExpr::call(
                    constructor,
                    vec![CypherExpr::variable("v")],
                ))),
            },
            Some(constructor) => CypherExpr::call(constructor, vec![param]),
        })
    }

    /// Authorization fragment for `rules` on `variable`
    pub fn compile_auth(
        &mut self,
        rules: &[AuthRule],
        variable: &str,
        operation: AuthOperation,
    ) -> Option<CypherExpr> {
        compile_rules(rules, self.auth, variable, operation, &mut self.params)
    }

    /// Name of the `$auth` parameter, bound on first use
    pub fn auth_param(&mut self) -> String {
        if let Some(name) = &self.auth_param {
            return name.clone();
        }
        let name = self.params.bind(AUTH_PARAMETER, self.auth.to_param_value());
        self.auth_param = Some(name.clone());
        name
    }

    pub fn into_params(self) -> ParameterTable {
        self.params
    }
}
