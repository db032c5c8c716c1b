//! CypherGraph - GraphQL selection trees compiled to parameterized Cypher
//!
//! This crate provides:
//! - A schema model of node types, relationships and computed fields
//! - Authorization rules folded into query predicates at compile time
//! - Query planning for reads, aggregates and create mutations
//! - Cypher generation with every caller literal bound as a parameter

pub mod auth;
pub mod config;
pub mod cypher_builder;
pub mod graph_catalog;
pub mod graph_output;
pub mod query_planner;
pub mod selection;

pub use query_planner::{CompiledQuery, QueryPlannerError, Translator};
