//! Selection tree to Cypher planning.
//!
//! [`Translator`] resolves the root field of an [`Operation`] and hands the
//! tree to the matching planner: plain reads, root aggregates or creates.
//! Every literal leaves the planner as a parameter, never as query text.

use std::sync::Arc;

use log::debug;
use serde::Serialize;

use crate::{
    auth::{AuthContext, JwtDecoder},
    config::TranslatorConfig,
    cypher_builder::{ParameterTable, ToCypher},
    graph_catalog::{GraphSchema, RootFieldKind},
    selection::Operation,
};

mod aggregation;
mod create;
pub mod errors;
mod filters;
mod options;
pub mod plan_ctx;
mod projection;

pub use create::CREATE_RESULT;
pub use errors::QueryPlannerError;
use plan_ctx::PlanCtx;

/// Variable bound to the root node of a read or aggregate
pub const ROOT_VARIABLE: &str = "this";

/// Query text plus the parameters it references
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub cypher: String,
    pub params: ParameterTable,
}

/// Compiles operations against one schema.
///
/// Holds no per-request state; a single translator can serve concurrent
/// compilations.
#[derive(Debug, Clone)]
pub struct Translator {
    schema: Arc<GraphSchema>,
    config: TranslatorConfig,
    decoder: JwtDecoder,
}

impl Translator {
    pub fn new(schema: Arc<GraphSchema>, config: TranslatorConfig) -> Self {
        Translator {
            schema,
            config,
            decoder: JwtDecoder,
        }
    }

    pub fn schema(&self) -> &GraphSchema {
        &self.schema
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Caller identity from an optional bearer token.
    ///
    /// No token, no JWT configuration, or a token that fails to decode all
    /// yield an anonymous context.
    pub fn auth_context(&self, token: Option<&str>) -> AuthContext {
        let claims = match (token, self.config.jwt.as_ref().and_then(|jwt| jwt.policy())) {
            (Some(token), Some(policy)) => self.decoder.decode(token, &policy),
            (Some(_), None) => {
                debug!("Token supplied without JWT configuration; treating caller as anonymous");
                None
            }
            (None, _) => None,
        };
        match claims {
            Some(claims) => AuthContext::from_claims(claims),
            None => AuthContext::anonymous(),
        }
        .with_roles_path(self.config.roles_path())
    }

    pub fn translate(
        &self,
        operation: &Operation,
        auth: &AuthContext,
    ) -> Result<CompiledQuery, QueryPlannerError> {
        let selection = &operation.selection;
        let (kind, type_desc) = self
            .schema
            .resolve_root_field(operation.operation, &selection.name)?;
        debug!(
            "Translating {:?} `{}` on {}",
            kind, selection.name, type_desc.name
        );

        let mut ctx = PlanCtx::new(&self.schema, auth, &self.config);
        let query = match kind {
            RootFieldKind::Read => projection::plan_read(&mut ctx, type_desc, selection)?,
            RootFieldKind::Aggregate => {
                aggregation::plan_root_aggregate(&mut ctx, type_desc, selection)?
            }
            RootFieldKind::Create => create::plan_create(&mut ctx, type_desc, selection)?,
        };
        let cypher = query.to_cypher();
        let params = ctx.into_params();
        debug!("Compiled query with {} parameter(s)", params.len());
        Ok(CompiledQuery { cypher, params })
    }

    /// Decode `token` and translate in one step
    pub fn translate_request(
        &self,
        operation: &Operation,
        token: Option<&str>,
    ) -> Result<CompiledQuery, QueryPlannerError> {
        let auth = self.auth_context(token);
        self.translate(operation, &auth)
    }
}
