//! Integration tests - whole translations from selection tree to Cypher text
//!
//! These tests load a YAML schema, compile operations through the public
//! `Translator` and compare the query text and parameter table exactly.

mod aggregate_tests;
mod auth_tests;
mod create_tests;
mod fixtures;
mod read_tests;
mod schema_loading_tests;
