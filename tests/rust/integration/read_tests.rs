use cyphergraph::cypher_builder::ParamValue;
use cyphergraph::graph_catalog::GraphSchemaError;
use cyphergraph::selection::{fields, SelectionNode};
use cyphergraph::QueryPlannerError;
use serde_json::json;

use super::fixtures::{compile, query};

#[test]
fn test_scalars_and_relationship_list() {
    let op = query(SelectionNode::new("movies").with_selections(vec![
        SelectionNode::new("title"),
        SelectionNode::new("actors").with_selections(fields(&["name"])),
    ]));
    let compiled = compile(&op).unwrap();
    assert_eq!(
        compiled.cypher,
        "MATCH (this:Movie)\n\
         RETURN this { .title, actors: [ (this)<-[:ACTED_IN]-(this_actors:Actor) | this_actors { .name } ] } as this"
    );
    assert!(compiled.params.is_empty());
}

#[test]
fn test_aliases_key_projection_and_variables() {
    let op = query(SelectionNode::new("movies").with_selections(vec![
        SelectionNode::new("title").with_alias("t"),
        SelectionNode::new("actors")
            .with_alias("cast")
            .with_selections(fields(&["name"])),
    ]));
    assert_eq!(
        compile(&op).unwrap().cypher,
        "MATCH (this:Movie)\n\
         RETURN this { t: this.title, cast: [ (this)<-[:ACTED_IN]-(this_cast:Actor) | this_cast { .name } ] } as this"
    );
}

#[test]
fn test_root_filter_and_paging() {
    let op = query(
        SelectionNode::new("movies")
            .with_argument("where", json!({ "title_STARTS_WITH": "The", "year_GT": 1990 }))
            .with_argument("options", json!({ "sort": [{ "year": "DESC" }], "limit": 10, "offset": 5 }))
            .with_selections(fields(&["title"])),
    );
    let compiled = compile(&op).unwrap();
    assert_eq!(
        compiled.cypher,
        "MATCH (this:Movie)\n\
         WHERE this.title STARTS WITH $this_title_STARTS_WITH AND this.year > $this_year_GT\n\
         WITH this\n\
         ORDER BY this.year DESC\n\
         SKIP $this_offset\n\
         LIMIT $this_limit\n\
         RETURN this { .title } as this"
    );
    assert_eq!(
        compiled.params.to_json(),
        json!({
            "this_title_STARTS_WITH": "The",
            "this_year_GT": 1990,
            "this_offset": 5,
            "this_limit": 10
        })
    );
}

#[test]
fn test_nested_filter_and_sorted_slice() {
    let op = query(SelectionNode::new("movies").with_selections(vec![SelectionNode::new("actors")
        .with_argument("where", json!({ "name_CONTAINS": "ee" }))
        .with_argument("options", json!({ "sort": [{ "name": "DESC" }], "limit": 2 }))
        .with_selections(fields(&["name"]))]));
    assert_eq!(
        compile(&op).unwrap().cypher,
        "MATCH (this:Movie)\n\
         RETURN this { actors: [this_actors IN apoc.coll.sortMulti([ (this)<-[:ACTED_IN]-(this_actors:Actor) WHERE this_actors.name CONTAINS $this_actors_name_CONTAINS | this_actors ], [\"name\"])[..$this_actors_limit] | this_actors { .name }] } as this"
    );
}

#[test]
fn test_default_undirected_has_no_arrow() {
    let op = query(
        SelectionNode::new("movies")
            .with_selections(vec![SelectionNode::new("genres").with_selections(fields(&["name"]))]),
    );
    assert!(compile(&op)
        .unwrap()
        .cypher
        .contains("[ (this)-[:IN_GENRE]-(this_genres:Genre) | this_genres { .name } ]"));

    let directed = query(SelectionNode::new("movies").with_selections(vec![SelectionNode::new("genres")
        .with_argument("directed", json!(true))
        .with_selections(fields(&["name"]))]));
    assert!(compile(&directed)
        .unwrap()
        .cypher
        .contains("(this)-[:IN_GENRE]->(this_genres:Genre)"));
}

#[test]
fn test_fixed_direction_modes_ignore_override() {
    let op = query(SelectionNode::new("actors").with_selections(vec![
        SelectionNode::new("movies")
            .with_argument("directed", json!(false))
            .with_selections(fields(&["title"])),
        SelectionNode::new("friends")
            .with_argument("directed", json!(true))
            .with_selections(fields(&["name"])),
    ]));
    let cypher = compile(&op).unwrap().cypher;
    assert!(cypher.contains("(this)-[:ACTED_IN]->(this_movies:Movie)"));
    assert!(cypher.contains("(this)-[:FRIENDS_WITH]-(this_friends:Actor)"));
    assert!(!cypher.contains("-[:FRIENDS_WITH]->"));
}

#[test]
fn test_computed_node_field_with_argument() {
    let op = query(SelectionNode::new("movies").with_selections(vec![SelectionNode::new("similar")
        .with_argument("first", json!(3))
        .with_selections(fields(&["title"]))]));
    let compiled = compile(&op).unwrap();
    assert_eq!(
        compiled.cypher,
        "MATCH (this:Movie)\n\
         RETURN this { similar: [this_similar IN apoc.cypher.runFirstColumn(\"MATCH (this)-[:IN_GENRE]->(:Genre)<-[:IN_GENRE]-(m:Movie) RETURN m LIMIT $first\", { this: this, auth: $auth, first: $this_similar_first }, true) | this_similar { .title }] } as this"
    );
    assert_eq!(
        compiled.params.to_json(),
        json!({
            "auth": { "isAuthenticated": false, "roles": [], "jwt": {} },
            "this_similar_first": 3
        })
    );
    assert_eq!(compiled.params.get("this_similar_first"), Some(&ParamValue::Integer(3)));
}

#[test]
fn test_computed_scalar_receives_auth_context() {
    let op = query(SelectionNode::new("movies").with_selections(fields(&["viewerName"])));
    let compiled = compile(&op).unwrap();
    assert_eq!(
        compiled.cypher,
        "MATCH (this:Movie)\n\
         RETURN this { viewerName: head(apoc.cypher.runFirstColumn(\"RETURN $auth.jwt.name\", { this: this, auth: $auth }, true)) } as this"
    );
    assert_eq!(
        compiled.params.to_json(),
        json!({ "auth": { "isAuthenticated": false, "roles": [], "jwt": {} } })
    );
}

#[test]
fn test_compilation_is_deterministic() {
    let op = query(
        SelectionNode::new("movies")
            .with_argument("where", json!({ "OR": [{ "title": "A" }, { "actors_SOME": { "name": "B" } }] }))
            .with_selections(vec![
                SelectionNode::new("title"),
                SelectionNode::new("actors").with_selections(vec![
                    SelectionNode::new("name"),
                    SelectionNode::new("movies").with_selections(fields(&["title"])),
                ]),
                SelectionNode::new("actorsAggregate").with_selections(fields(&["count"])),
            ]),
    );
    let first = compile(&op).unwrap();
    let second = compile(&op).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.params.to_json(), second.params.to_json());
}

#[test]
fn test_literals_only_travel_as_parameters() {
    let op = query(
        SelectionNode::new("movies")
            .with_argument(
                "where",
                json!({
                    "title_IN": ["Zyxwv", "Qponm"],
                    "year_LTE": 314159,
                    "actors_NONE": { "name_ENDS_WITH": "Lkjih" }
                }),
            )
            .with_argument("options", json!({ "limit": 271828 }))
            .with_selections(vec![
                SelectionNode::new("title"),
                SelectionNode::new("similar")
                    .with_argument("first", json!(161803))
                    .with_selections(fields(&["title"])),
            ]),
    );
    let compiled = compile(&op).unwrap();
    for literal in ["Zyxwv", "Qponm", "314159", "Lkjih", "271828", "161803"] {
        assert!(!compiled.cypher.contains(literal), "{} leaked into the query", literal);
    }
    // five literals plus the caller context handed to `similar`
    assert_eq!(compiled.params.len(), 6);
    assert!(compiled.params.contains("auth"));
}

#[test]
fn test_unknown_field_is_reported() {
    let op = query(SelectionNode::new("movies").with_selections(fields(&["budget"])));
    assert_eq!(
        compile(&op).unwrap_err(),
        QueryPlannerError::Schema(GraphSchemaError::UnknownField {
            type_name: "Movie".to_string(),
            field_name: "budget".to_string(),
        })
    );

    let root = query(SelectionNode::new("films").with_selections(fields(&["title"])));
    assert!(matches!(
        compile(&root),
        Err(QueryPlannerError::Schema(GraphSchemaError::UnknownField { type_name, .. })) if type_name == "Query"
    ));
}

#[test]
fn test_malformed_arguments_are_rejected() {
    for (name, value) in [
        ("options", json!({ "sort": [{ "budget": "ASC" }] })),
        ("options", json!({ "limit": "ten" })),
        ("where", json!({ "similar": 1 })),
        ("first", json!(1)),
    ] {
        let op = query(
            SelectionNode::new("movies")
                .with_argument(name, value.clone())
                .with_selections(fields(&["title"])),
        );
        assert!(
            matches!(compile(&op), Err(QueryPlannerError::InvalidArgument { .. })),
            "{} = {} should be rejected",
            name,
            value
        );
    }
}
