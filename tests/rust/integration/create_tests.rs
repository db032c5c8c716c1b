use cyphergraph::cypher_builder::ParamValue;
use cyphergraph::graph_catalog::GraphSchemaError;
use cyphergraph::graph_output::normalize_result;
use cyphergraph::selection::{fields, Operation, SelectionNode};
use cyphergraph::QueryPlannerError;
use serde_json::{json, Value};

use super::fixtures::{compile, compile_as, query, schema};

fn create_files(input: Value) -> Operation {
    Operation::mutation(
        SelectionNode::new("createFiles")
            .with_argument("input", input)
            .with_selections(vec![SelectionNode::new("files").with_selections(fields(&["name", "size"]))]),
    )
}

#[test]
fn test_wide_integer_round_trip() {
    let op = create_files(json!([{ "name": "disk.img", "size": 9223372036854775807i64 }]));
    let compiled = compile(&op).unwrap();
    assert_eq!(
        compiled.cypher,
        "CALL {\n\
         CREATE (this0:File)\n\
         SET this0.name = $this0_name\n\
         SET this0.size = toInteger($this0_size)\n\
         RETURN this0\n\
         }\n\
         RETURN [this0 { .name, .size }] as data"
    );
    assert_eq!(compiled.params.get("this0_size"), Some(&ParamValue::BigInt(i64::MAX)));
    assert_eq!(
        compiled.params.to_json(),
        json!({ "this0_name": "disk.img", "this0_size": "9223372036854775807" })
    );
    assert!(!compiled.cypher.contains("9223372036854775807"));

    let raw = json!({ "files": [{ "name": "disk.img", "size": 9223372036854775807i64 }] });
    assert_eq!(
        normalize_result(&schema(), &op, raw).unwrap(),
        json!({ "files": [{ "name": "disk.img", "size": "9223372036854775807" }] })
    );
}

#[test]
fn test_wide_integer_from_string_literal() {
    let op = create_files(json!([{ "size": "9223372036854775807" }]));
    let compiled = compile(&op).unwrap();
    assert_eq!(compiled.params.get("this0_size"), Some(&ParamValue::BigInt(i64::MAX)));
}

#[test]
fn test_wide_integer_filter_reads_as_integer() {
    let op = query(
        SelectionNode::new("files")
            .with_argument(
                "where",
                json!({ "size": 9223372036854775807i64, "size_IN": ["9007199254740993", 1] }),
            )
            .with_selections(fields(&["name"])),
    );
    let compiled = compile(&op).unwrap();
    assert_eq!(
        compiled.cypher,
        "MATCH (this:File)\n\
         WHERE this.size = toInteger($this_size) AND this.size IN [v IN $this_size_IN | toInteger(v)]\n\
         RETURN this { .name } as this"
    );
    assert_eq!(
        compiled.params.to_json(),
        json!({ "this_size": "9223372036854775807", "this_size_IN": ["9007199254740993", 1] })
    );
}

#[test]
fn test_safe_big_int_serializes_as_number() {
    let op = create_files(json!([{ "size": 1024 }]));
    assert_eq!(compile(&op).unwrap().params.to_json(), json!({ "this0_size": 1024 }));
}

#[test]
fn test_one_call_block_per_input() {
    let op = create_files(json!([{ "name": "a" }, { "name": "b" }]));
    let compiled = compile(&op).unwrap();
    assert!(compiled.cypher.contains("CREATE (this0:File)\nSET this0.name = $this0_name"));
    assert!(compiled.cypher.contains("CREATE (this1:File)\nSET this1.name = $this1_name"));
    assert!(compiled
        .cypher
        .ends_with("RETURN [this0 { .name, .size }, this1 { .name, .size }] as data"));
    assert_eq!(compiled.params.len(), 2);
}

#[test]
fn test_create_and_read_authorization() {
    let op = Operation::mutation(
        SelectionNode::new("createPosts")
            .with_argument("input", json!([{ "content": "hello", "authorId": "u1" }]))
            .with_selections(vec![SelectionNode::new("posts").with_selections(fields(&["content"]))]),
    );

    let compiled = compile_as(&op, json!({ "sub": "u1" })).unwrap();
    assert_eq!(
        compiled.cypher,
        "CALL {\n\
         CREATE (this0:Post)\n\
         SET this0.content = $this0_content\n\
         SET this0.authorId = $this0_authorId\n\
         RETURN this0\n\
         }\n\
         CALL apoc.util.validate(NOT (this0.authorId = $this0_auth0_allow_authorId), \"Forbidden\", [0])\n\
         RETURN [this0 { .content }] as data"
    );

    // Anonymous callers fail both the create check and the read-back check.
    let anonymous = compile(&op).unwrap().cypher;
    assert!(anonymous.contains("CALL apoc.util.validate(NOT (false), \"Forbidden\", [0])\nRETURN this0\n}"));
    assert!(anonymous.ends_with(
        "}\nCALL apoc.util.validate(NOT (false), \"Forbidden\", [0])\nRETURN [this0 { .content }] as data"
    ));
}

#[test]
fn test_rejects_bad_input() {
    let unknown = create_files(json!([{ "owner": "me" }]));
    assert_eq!(
        compile(&unknown).unwrap_err(),
        QueryPlannerError::Schema(GraphSchemaError::UnknownField {
            type_name: "File".to_string(),
            field_name: "owner".to_string(),
        })
    );

    for input in [json!("disk.img"), json!([1]), json!([{ "size": 1.5 }]), json!([{ "name": ["a"] }])] {
        assert!(
            matches!(
                compile(&create_files(input.clone())),
                Err(QueryPlannerError::InvalidArgument { .. })
            ),
            "{} should be rejected",
            input
        );
    }
}

#[test]
fn test_response_selects_plural_only() {
    let op = Operation::mutation(
        SelectionNode::new("createFiles")
            .with_argument("input", json!([{ "name": "a" }]))
            .with_selections(fields(&["info"])),
    );
    assert_eq!(
        compile(&op).unwrap_err(),
        QueryPlannerError::Schema(GraphSchemaError::UnknownField {
            type_name: "CreateFilesMutationResponse".to_string(),
            field_name: "info".to_string(),
        })
    );
}
