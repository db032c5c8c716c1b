use std::io::Write;
use std::sync::Arc;

use cyphergraph::auth::AuthContext;
use cyphergraph::config::TranslatorConfig;
use cyphergraph::graph_catalog::{load_schema, GraphSchemaError, RootFieldKind};
use cyphergraph::selection::{fields, Operation, OperationType, SelectionNode};
use cyphergraph::Translator;
use tempfile::NamedTempFile;

use super::fixtures::SCHEMA_YAML;

fn yaml_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_schema_from_file() {
    let file = yaml_file(SCHEMA_YAML);
    let schema = load_schema(file.path()).unwrap();
    assert_eq!(schema.type_count(), 5);
    let names: Vec<&str> = schema.types().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["Movie", "Actor", "Genre", "File", "Post"]);

    let (kind, movie) = schema
        .resolve_root_field(OperationType::Query, "moviesAggregate")
        .unwrap();
    assert_eq!(kind, RootFieldKind::Aggregate);
    assert_eq!(movie.name, "Movie");
    assert!(schema
        .resolve_root_field(OperationType::Mutation, "createFiles")
        .is_ok());
}

#[test]
fn test_unknown_target_reports_file() {
    let file = yaml_file(
        r#"
types:
  - name: Movie
    fields:
      - kind: relationship
        name: actors
        target: Actr
        type: ACTED_IN
        direction: IN
"#,
    );
    match load_schema(file.path()) {
        Err(GraphSchemaError::InvalidConfig { message }) => {
            assert!(message.contains("Actr"));
            assert!(message.contains(&file.path().display().to_string()));
        }
        other => panic!("expected InvalidConfig, got {:?}", other),
    }
}

#[test]
fn test_missing_file() {
    assert!(matches!(
        load_schema("/definitely/not/here.yaml"),
        Err(GraphSchemaError::ConfigRead { .. })
    ));
}

#[test]
fn test_translator_from_files() {
    let schema_file = yaml_file(SCHEMA_YAML);
    let config_file = yaml_file("enable_regex: true\n");
    let config = TranslatorConfig::from_yaml_file(config_file.path()).unwrap();
    let translator = Translator::new(Arc::new(load_schema(schema_file.path()).unwrap()), config);

    let op = Operation::query(
        SelectionNode::new("actors")
            .with_argument("where", serde_json::json!({ "name_MATCHES": "K.*" }))
            .with_selections(fields(&["name"])),
    );
    let compiled = translator.translate(&op, &AuthContext::anonymous()).unwrap();
    assert_eq!(
        compiled.cypher,
        "MATCH (this:Actor)\nWHERE this.name =~ $this_name_MATCHES\nRETURN this { .name } as this"
    );
}
