use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cyphergraph::{
    config::{CliConfig, TranslatorConfig},
    graph_catalog::load_schema,
    selection::Operation,
    Translator,
};
use log::info;
use serde_json::json;

/// CypherGraph - compile GraphQL selection trees into parameterized Cypher
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile one operation and print `{"cypher", "params"}` as JSON
    Translate {
        /// YAML schema definitions
        #[arg(long)]
        schema: PathBuf,

        /// JSON file holding the operation's selection tree
        #[arg(long)]
        query: PathBuf,

        /// Bearer token of the caller
        #[arg(long)]
        token: Option<String>,

        /// YAML translator configuration
        #[arg(long)]
        config: Option<PathBuf>,

        /// Allow `_MATCHES` regular-expression filters
        #[arg(long)]
        enable_regex: bool,

        /// HS256 secret or RS256 public key (PEM) for token verification
        #[arg(long)]
        jwt_secret: Option<String>,

        /// Decode tokens without verifying their signature
        #[arg(long)]
        jwt_no_verify: bool,

        /// Dotted claim path holding the caller's roles
        #[arg(long)]
        jwt_roles_path: Option<String>,
    },
    /// Load a schema and list its types
    CheckSchema {
        #[arg(long)]
        schema: PathBuf,
    },
}

fn translator_config(config: Option<PathBuf>, cli: CliConfig) -> Result<TranslatorConfig> {
    let mut base = match config {
        Some(path) => TranslatorConfig::from_yaml_file(&path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => TranslatorConfig::from_env().context("reading configuration from environment")?,
    };
    base.merge(TranslatorConfig::from_cli(cli).context("invalid command line configuration")?);
    Ok(base)
}

fn main() -> Result<()> {
    // Defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Translate {
            schema,
            query,
            token,
            config,
            enable_regex,
            jwt_secret,
            jwt_no_verify,
            jwt_roles_path,
        } => {
            let graph_schema = load_schema(&schema)
                .with_context(|| format!("loading schema {}", schema.display()))?;
            let config = translator_config(
                config,
                CliConfig {
                    enable_regex,
                    jwt_secret,
                    jwt_no_verify,
                    jwt_roles_path,
                },
            )?;
            let content = std::fs::read_to_string(&query)
                .with_context(|| format!("reading query {}", query.display()))?;
            let operation: Operation = serde_json::from_str(&content)
                .with_context(|| format!("parsing query {}", query.display()))?;

            let translator = Translator::new(Arc::new(graph_schema), config);
            let compiled = translator.translate_request(&operation, token.as_deref())?;
            info!("Compiled `{}`", operation.selection.name);
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "cypher": compiled.cypher,
                    "params": compiled.params.to_json(),
                }))?
            );
        }
        Command::CheckSchema { schema } => {
            let graph_schema = load_schema(&schema)
                .with_context(|| format!("loading schema {}", schema.display()))?;
            println!("{} type(s)", graph_schema.type_count());
            for type_desc in graph_schema.types() {
                println!(
                    "  {} ({} field(s)): {}, {}Aggregate",
                    type_desc.name,
                    type_desc.fields().len(),
                    type_desc.plural,
                    type_desc.plural
                );
            }
        }
    }
    Ok(())
}
