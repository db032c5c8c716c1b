use cyphergraph::selection::{fields, SelectionNode};
use cyphergraph::QueryPlannerError;
use serde_json::json;

use super::fixtures::{compile, query};

fn field(name: &str, ops: &[&str]) -> SelectionNode {
    SelectionNode::new(name).with_selections(fields(ops))
}

#[test]
fn test_local_time_min_max() {
    let op = query(
        SelectionNode::new("moviesAggregate").with_selections(vec![field("createdAt", &["min", "max"])]),
    );
    let compiled = compile(&op).unwrap();
    assert_eq!(
        compiled.cypher,
        "MATCH (this:Movie)\n\
         RETURN { createdAt: { min: min(this.createdAt), max: max(this.createdAt) } }"
    );
    assert!(!compiled.cypher.contains("WHERE"));
    assert!(compiled.params.is_empty());
}

#[test]
fn test_filtered_count_and_numeric_ops() {
    let op = query(
        SelectionNode::new("moviesAggregate")
            .with_argument("where", json!({ "year_GTE": 2000 }))
            .with_selections(vec![
                SelectionNode::new("count"),
                field("year", &["average", "sum"]),
            ]),
    );
    let compiled = compile(&op).unwrap();
    assert_eq!(
        compiled.cypher,
        "MATCH (this:Movie)\n\
         WHERE this.year >= $this_year_GTE\n\
         RETURN { count: count(this), year: { average: avg(this.year), sum: sum(this.year) } }"
    );
    assert_eq!(compiled.params.to_json(), json!({ "this_year_GTE": 2000 }));
}

#[test]
fn test_operator_kind_mismatch() {
    for (name, ops) in [("title", &["sum"][..]), ("createdAt", &["average"][..]), ("year", &["median"][..])] {
        let op = query(SelectionNode::new("moviesAggregate").with_selections(vec![field(name, ops)]));
        assert!(
            matches!(compile(&op), Err(QueryPlannerError::InvalidArgument { .. })),
            "{} {:?} should be rejected",
            name,
            ops
        );
    }
}

#[test]
fn test_text_length_aggregates() {
    let op = query(
        SelectionNode::new("moviesAggregate").with_selections(vec![field("title", &["shortest"])]),
    );
    let cypher = compile(&op).unwrap().cypher;
    assert!(cypher.contains("title: { shortest: reduce(shortest = head(collect(this.title))"));
}

#[test]
fn test_nested_aggregate_passes_parameters() {
    let op = query(SelectionNode::new("movies").with_selections(vec![SelectionNode::new(
        "actorsAggregate",
    )
    .with_argument("where", json!({ "name_STARTS_WITH": "K" }))
    .with_selections(fields(&["count"]))]));
    let compiled = compile(&op).unwrap();
    assert_eq!(
        compiled.cypher,
        "MATCH (this:Movie)\n\
         RETURN this { actorsAggregate: head(apoc.cypher.runFirstColumn(\"MATCH (this)<-[:ACTED_IN]-(this_actorsAggregate:Actor) WHERE this_actorsAggregate.name STARTS WITH $this_actorsAggregate_name_STARTS_WITH RETURN { count: count(this_actorsAggregate) }\", { this: this, this_actorsAggregate_name_STARTS_WITH: $this_actorsAggregate_name_STARTS_WITH }, true)) } as this"
    );
    assert_eq!(
        compiled.params.to_json(),
        json!({ "this_actorsAggregate_name_STARTS_WITH": "K" })
    );
}

#[test]
fn test_nested_aggregate_node_fields() {
    let op = query(SelectionNode::new("movies").with_selections(vec![SelectionNode::new(
        "actorsAggregate",
    )
    .with_selections(vec![
        SelectionNode::new("count"),
        SelectionNode::new("node").with_selections(vec![field("name", &["longest"])]),
    ])]));
    let cypher = compile(&op).unwrap().cypher;
    assert!(cypher.contains(
        "RETURN { count: count(this_actorsAggregate), node: { name: { longest: reduce(longest = head(collect(this_actorsAggregate.name))"
    ));
}

#[test]
fn test_default_undirected_count() {
    let op = query(SelectionNode::new("movies").with_selections(vec![
        SelectionNode::new("genresAggregate").with_selections(fields(&["count"])),
    ]));
    let cypher = compile(&op).unwrap().cypher;
    assert!(cypher.contains("MATCH (this)-[:IN_GENRE]-(this_genresAggregate:Genre) RETURN"));
    assert!(!cypher.contains("-[:IN_GENRE]->"));
}

#[test]
fn test_unknown_aggregate_child() {
    let op = query(SelectionNode::new("movies").with_selections(vec![
        SelectionNode::new("actorsAggregate").with_selections(fields(&["total"])),
    ]));
    assert!(matches!(
        compile(&op),
        Err(QueryPlannerError::InvalidArgument { path, .. }) if path == "movies.actorsAggregate.total"
    ));
}
