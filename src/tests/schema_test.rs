use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_graphql::dynamic::TypeRef;
use async_graphql::{Name, Request, Value};
use serde_json::json;

use crate::error::BindError;
use crate::schema::SchemaAssembly;
use crate::tests::{demo_bundle, run_graphql_query};
use crate::types::{FieldDef, FieldDirective, TypeDef, ValueMapping};

#[tokio::test]
async fn users_resolve_batched_posts() {
    let (bundle, _) = demo_bundle();
    let query = "{ users(gameId: 1) { name posts { title } } }";

    let result = run_graphql_query(&bundle, query, ValueMapping::new()).await;

    assert_eq!(result["users"][0]["name"], json!("Bob"));
    assert_eq!(
        result["users"][0]["posts"],
        json!([
            { "title": "graphql is great" },
            { "title": "batching is amazing!" },
            { "title": "the cache is super helpful" },
            { "title": "look how fast our app is now!" },
        ])
    );
    // Sam joins on a single post
    assert_eq!(result["users"][1]["posts"], json!([{ "title": "hello from the future" }]));
}

#[tokio::test]
async fn game_resolves_through_the_context_scope() {
    let (bundle, _) = demo_bundle();
    let mut context_values = ValueMapping::new();
    context_values.insert(Name::new("gameId"), Value::from(1));

    let result =
        run_graphql_query(&bundle, "{ users(gameId: 1) { game { title } } }", context_values)
            .await;

    assert_eq!(result["users"][0]["game"]["title"], json!("space race"));
}

#[tokio::test]
async fn fortunes_remap_the_nested_payload() {
    let (bundle, _) = demo_bundle();
    let query = "{ users(gameId: 1) { fortunes { msg } } }";

    let result = run_graphql_query(&bundle, query, ValueMapping::new()).await;

    assert_eq!(result["users"][0]["fortunes"], json!([{ "msg": "you will ship today" }]));
    assert_eq!(
        result["users"][2]["fortunes"],
        json!([{ "msg": "you will ship today" }, { "msg": "beware of stale caches" }])
    );
}

#[tokio::test]
async fn deprecation_is_recorded_on_the_built_schema() {
    let (bundle, _) = demo_bundle();

    assert_eq!(bundle.annotations.deprecated.get("User.id").map(String::as_str), Some("lol"));
    assert!(bundle.schema.sdl().contains("deprecated"));
}

#[tokio::test]
async fn a_failing_field_leaves_its_siblings_intact() {
    let (bundle, _) = demo_bundle();
    // no gameId in the request context, the game lookup has nothing to key on
    let context = Arc::new(bundle.context.create());
    let query = "{ users(gameId: 1) { name game { title } } }";

    let res = bundle.schema.execute(Request::new(query).data(context)).await;

    assert!(!res.errors.is_empty());
    assert!(res.errors[0].message.contains("missing path `gameId` in `context` scope"));
    let data = serde_json::to_value(res.data).unwrap();
    assert_eq!(data["users"][0]["name"], json!("Bob"));
    assert_eq!(data["users"][0]["game"], json!(null));
}

#[tokio::test]
async fn each_request_gets_a_fresh_cache() {
    let (bundle, post_calls) = demo_bundle();
    let query = "{ users(gameId: 1) { posts { title } } }";

    run_graphql_query(&bundle, query, ValueMapping::new()).await;
    let after_first = post_calls.load(Ordering::SeqCst);
    assert!(after_first > 0);

    run_graphql_query(&bundle, query, ValueMapping::new()).await;
    let after_second = post_calls.load(Ordering::SeqCst);

    // same workload, same number of backend calls: nothing was reused from
    // the first request's cache
    assert_eq!(after_second, after_first * 2);
}

#[test]
fn unknown_directive_fails_schema_construction() {
    let err = SchemaAssembly::new("Query")
        .object(TypeDef::new("Query").field(
            FieldDef::new("ping", TypeRef::named(TypeRef::STRING))
                .directive(FieldDirective::new("cacheControl").arg("maxAge", 36000)),
        ))
        .build()
        .unwrap_err();

    assert!(
        matches!(err, BindError::UnknownDirective { ref directive, .. } if directive == "cacheControl")
    );
}

#[test]
fn duplicate_type_fails_schema_construction() {
    let err = SchemaAssembly::new("Query")
        .object(TypeDef::new("Query").field(FieldDef::new("ping", TypeRef::named(TypeRef::STRING))))
        .object(TypeDef::new("Post").field(FieldDef::new("id", TypeRef::named(TypeRef::INT))))
        .object(TypeDef::new("Post").field(FieldDef::new("id", TypeRef::named(TypeRef::INT))))
        .build()
        .unwrap_err();

    assert!(matches!(err, BindError::DuplicateType(name) if name == "Post"));
}

#[test]
fn type_level_deprecation_lands_in_annotations() {
    let bundle = SchemaAssembly::new("Query")
        .object(TypeDef::new("Query").field(FieldDef::new("ping", TypeRef::named(TypeRef::STRING))))
        .object(
            TypeDef::new("Legacy")
                .directive(FieldDirective::new("deprecated").arg("reason", "superseded"))
                .field(FieldDef::new("id", TypeRef::named(TypeRef::INT))),
        )
        .build()
        .unwrap();

    assert_eq!(
        bundle.annotations.deprecated.get("Legacy").map(String::as_str),
        Some("superseded")
    );
}
