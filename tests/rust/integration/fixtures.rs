use std::sync::Arc;

use cyphergraph::auth::AuthContext;
use cyphergraph::config::TranslatorConfig;
use cyphergraph::graph_catalog::{GraphSchema, GraphSchemaConfig};
use cyphergraph::selection::{Operation, SelectionNode};
use cyphergraph::{CompiledQuery, QueryPlannerError, Translator};
use serde_json::Value;

pub const SCHEMA_YAML: &str = r#"
name: cinema
types:
  - name: Movie
    fields:
      - kind: scalar
        name: title
        type: String
      - kind: scalar
        name: year
        type: Int
      - kind: scalar
        name: createdAt
        type: LocalTime
      - kind: relationship
        name: actors
        target: Actor
        type: ACTED_IN
        direction: IN
      - kind: relationship
        name: genres
        target: Genre
        type: IN_GENRE
        direction: OUT
        query_direction: DEFAULT_UNDIRECTED
      - kind: computed
        name: similar
        returns: Movie
        list: true
        statement: |
          MATCH (this)-[:IN_GENRE]->(:Genre)<-[:IN_GENRE]-(m:Movie) RETURN m LIMIT $first
        arguments:
          - name: first
            type: Int
      - kind: computed
        name: viewerName
        returns: String
        statement: RETURN $auth.jwt.name
  - name: Actor
    fields:
      - kind: scalar
        name: name
        type: String
      - kind: relationship
        name: movies
        target: Movie
        type: ACTED_IN
        direction: OUT
        query_direction: DIRECTED_ONLY
      - kind: relationship
        name: friends
        target: Actor
        type: FRIENDS_WITH
        direction: OUT
        query_direction: UNDIRECTED_ONLY
      - kind: relationship
        name: posts
        target: Post
        type: WROTE
        direction: OUT
      - kind: computed
        name: drafts
        returns: Post
        list: true
        statement: "MATCH (this)-[:WROTE]->(p:Post) RETURN p"
  - name: Genre
    fields:
      - kind: scalar
        name: name
        type: String
  - name: File
    fields:
      - kind: scalar
        name: name
        type: String
      - kind: scalar
        name: size
        type: BigInt
  - name: Post
    fields:
      - kind: scalar
        name: content
        type: String
      - kind: scalar
        name: authorId
        type: ID
      - kind: scalar
        name: moderationNote
        type: String
        auth:
          - rule: roles
            any: [moderator]
    auth:
      - rule: allow
        field: authorId
        claim: sub
        operations: [READ]
      - rule: is_authenticated
        operations: [CREATE]
"#;

pub fn schema() -> GraphSchema {
    GraphSchemaConfig::from_yaml_str(SCHEMA_YAML)
        .unwrap()
        .to_graph_schema()
        .unwrap()
}

pub fn translator_with(config: TranslatorConfig) -> Translator {
    Translator::new(Arc::new(schema()), config)
}

pub fn translator() -> Translator {
    translator_with(TranslatorConfig::default())
}

pub fn query(selection: SelectionNode) -> Operation {
    Operation::query(selection)
}

pub fn compile(operation: &Operation) -> Result<CompiledQuery, QueryPlannerError> {
    translator().translate(operation, &AuthContext::anonymous())
}

pub fn compile_as(operation: &Operation, claims: Value) -> Result<CompiledQuery, QueryPlannerError> {
    translator().translate(operation, &AuthContext::from_value(Some(claims)))
}
