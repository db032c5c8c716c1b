use cyphergraph::config::{JwtConfig, TranslatorConfig};
use cyphergraph::selection::{fields, Operation, SelectionNode};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

use super::fixtures::{compile, compile_as, query, translator, translator_with};

fn posts(selected: &[&str]) -> Operation {
    query(SelectionNode::new("posts").with_selections(fields(selected)))
}

fn sign(claims: Value, secret: &str) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn verifying_translator(roles_path: Option<&str>) -> cyphergraph::Translator {
    translator_with(TranslatorConfig {
        jwt: Some(JwtConfig {
            secret: Some("s3cret".to_string()),
            roles_path: roles_path.map(str::to_string),
            ..Default::default()
        }),
        ..Default::default()
    })
}

const ALLOWED: &str = "MATCH (this:Post)\n\
                       WHERE this.authorId = $this_auth0_allow_authorId\n\
                       RETURN this { .content } as this";

const DENIED: &str = "MATCH (this:Post)\n\
                      WHERE false\n\
                      RETURN this { .content } as this";

#[test]
fn test_allow_rule_binds_claim() {
    let compiled = compile_as(&posts(&["content"]), json!({ "sub": "u1" })).unwrap();
    assert_eq!(compiled.cypher, ALLOWED);
    assert_eq!(
        compiled.params.to_json(),
        json!({ "this_auth0_allow_authorId": "u1" })
    );
}

#[test]
fn test_missing_or_malformed_claim_is_false() {
    for claims in [json!({}), json!({ "sub": null }), json!({ "sub": { "id": "u1" } }), json!({ "sub": ["u1"] })] {
        let compiled = compile_as(&posts(&["content"]), claims.clone()).unwrap();
        assert_eq!(compiled.cypher, DENIED, "claims {}", claims);
        assert!(compiled.params.is_empty());
    }
    assert_eq!(compile(&posts(&["content"])).unwrap().cypher, DENIED);
}

#[test]
fn test_field_rule_merges_into_level_filter() {
    let moderator = compile_as(
        &posts(&["content", "moderationNote"]),
        json!({ "sub": "u1", "roles": ["moderator"] }),
    )
    .unwrap();
    assert!(moderator
        .cypher
        .starts_with("MATCH (this:Post)\nWHERE this.authorId = $this_auth0_allow_authorId\n"));

    let reader = compile_as(
        &posts(&["content", "moderationNote"]),
        json!({ "sub": "u1", "roles": ["reader"] }),
    )
    .unwrap();
    assert!(reader.cypher.starts_with("MATCH (this:Post)\nWHERE false\n"));
}

#[test]
fn test_verified_token() {
    let translator = verifying_translator(None);
    let token = sign(json!({ "sub": "u1" }), "s3cret");
    let compiled = translator
        .translate_request(&posts(&["content"]), Some(&format!("Bearer {}", token)))
        .unwrap();
    assert_eq!(compiled.cypher, ALLOWED);
}

#[test]
fn test_forged_token_is_anonymous() {
    let translator = verifying_translator(None);
    let token = sign(json!({ "sub": "u1" }), "guessed");
    let compiled = translator
        .translate_request(&posts(&["content"]), Some(&token))
        .unwrap();
    assert_eq!(compiled.cypher, DENIED);
}

#[test]
fn test_token_without_jwt_config_is_anonymous() {
    let token = sign(json!({ "sub": "u1" }), "s3cret");
    let compiled = translator()
        .translate_request(&posts(&["content"]), Some(&token))
        .unwrap();
    assert_eq!(compiled.cypher, DENIED);
}

#[test]
fn test_custom_roles_path() {
    let translator = verifying_translator(Some("realm.roles"));
    let token = sign(
        json!({ "sub": "u1", "realm": { "roles": ["moderator"] } }),
        "s3cret",
    );
    let compiled = translator
        .translate_request(&posts(&["content", "moderationNote"]), Some(&token))
        .unwrap();
    assert!(compiled
        .cypher
        .starts_with("MATCH (this:Post)\nWHERE this.authorId = $this_auth0_allow_authorId\n"));
}

fn actors(selections: Vec<SelectionNode>) -> Operation {
    query(SelectionNode::new("actors").with_selections(selections))
}

#[test]
fn test_nested_relationship_applies_target_rules() {
    let op = actors(vec![SelectionNode::new("posts").with_selections(fields(&["content"]))]);

    let owner = compile_as(&op, json!({ "sub": "u1" })).unwrap();
    assert_eq!(
        owner.cypher,
        "MATCH (this:Actor)\n\
         RETURN this { posts: [ (this)-[:WROTE]->(this_posts:Post) WHERE this_posts.authorId = $this_posts_auth0_allow_authorId | this_posts { .content } ] } as this"
    );
    assert_eq!(
        owner.params.to_json(),
        json!({ "this_posts_auth0_allow_authorId": "u1" })
    );

    assert!(compile(&op)
        .unwrap()
        .cypher
        .contains("[ (this)-[:WROTE]->(this_posts:Post) WHERE false | this_posts { .content } ]"));
}

#[test]
fn test_nested_aggregate_applies_target_rules() {
    let op = actors(vec![SelectionNode::new("postsAggregate").with_selections(fields(&["count"]))]);
    let compiled = compile_as(&op, json!({ "sub": "u1" })).unwrap();
    assert_eq!(
        compiled.cypher,
        "MATCH (this:Actor)\n\
         RETURN this { postsAggregate: head(apoc.cypher.runFirstColumn(\"MATCH (this)-[:WROTE]->(this_postsAggregate:Post) WHERE this_postsAggregate.authorId = $this_postsAggregate_auth0_allow_authorId RETURN { count: count(this_postsAggregate) }\", { this: this, this_postsAggregate_auth0_allow_authorId: $this_postsAggregate_auth0_allow_authorId }, true)) } as this"
    );
    assert_eq!(
        compiled.params.to_json(),
        json!({ "this_postsAggregate_auth0_allow_authorId": "u1" })
    );
}

#[test]
fn test_computed_node_list_applies_target_rules() {
    let op = actors(vec![SelectionNode::new("drafts").with_selections(fields(&["content"]))]);
    let compiled = compile_as(&op, json!({ "sub": "u1" })).unwrap();
    assert_eq!(
        compiled.cypher,
        "MATCH (this:Actor)\n\
         RETURN this { drafts: [this_drafts IN apoc.cypher.runFirstColumn(\"MATCH (this)-[:WROTE]->(p:Post) RETURN p\", { this: this, auth: $auth }, true) WHERE this_drafts.authorId = $this_drafts_auth0_allow_authorId | this_drafts { .content }] } as this"
    );
    assert_eq!(
        compiled.params.to_json(),
        json!({
            "auth": { "isAuthenticated": true, "roles": [], "jwt": { "sub": "u1" } },
            "this_drafts_auth0_allow_authorId": "u1"
        })
    );
}

#[test]
fn test_relationship_filter_applies_target_rules() {
    let op = query(
        SelectionNode::new("actors")
            .with_argument("where", json!({ "posts_SOME": { "content": "x" } }))
            .with_selections(fields(&["name"])),
    );
    assert_eq!(
        compile(&op).unwrap().cypher,
        "MATCH (this:Actor)\n\
         WHERE EXISTS { MATCH (this)-[:WROTE]->(this_posts_SOME:Post) WHERE false }\n\
         RETURN this { .name } as this"
    );
    assert_eq!(
        compile_as(&op, json!({ "sub": "u1" })).unwrap().cypher,
        "MATCH (this:Actor)\n\
         WHERE EXISTS { MATCH (this)-[:WROTE]->(this_posts_SOME:Post) WHERE this_posts_SOME.content = $this_posts_SOME_content AND this_posts_SOME.authorId = $this_posts_SOME_auth0_allow_authorId }\n\
         RETURN this { .name } as this"
    );
}

#[test]
fn test_field_filter_applies_field_rules() {
    let op = query(
        SelectionNode::new("posts")
            .with_argument("where", json!({ "moderationNote_CONTAINS": "spam" }))
            .with_selections(fields(&["content"])),
    );
    let reader = compile_as(&op, json!({ "sub": "u1", "roles": ["reader"] })).unwrap();
    assert_eq!(reader.cypher, DENIED);

    let moderator = compile_as(&op, json!({ "sub": "u1", "roles": ["moderator"] })).unwrap();
    assert_eq!(
        moderator.cypher,
        "MATCH (this:Post)\n\
         WHERE this.moderationNote CONTAINS $this_moderationNote_CONTAINS AND this.authorId = $this_auth0_allow_authorId\n\
         RETURN this { .content } as this"
    );
}
