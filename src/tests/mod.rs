use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_graphql::dynamic::TypeRef;
use async_graphql::{Name, Request, Value};

use crate::binder::identity_resolver;
use crate::loader::{batch_fn, BatchFn};
use crate::middleware::{resolver_fn, ObservabilityHook};
use crate::schema::{SchemaAssembly, SchemaBundle};
use crate::types::{FieldDef, FieldDirective, TypeDef, ValueMapping};

mod schema_test;

pub fn object(entries: &[(&str, Value)]) -> Value {
    Value::Object(entries.iter().map(|(k, v)| (Name::new(k), v.clone())).collect())
}

pub fn int_list(ids: &[i64]) -> Value {
    Value::List(ids.iter().copied().map(Value::from).collect())
}

// think of these like db tables where the join is from user => post on
// postsIds
pub fn users() -> Vec<Value> {
    vec![
        object(&[
            ("id", Value::from(1)),
            ("name", Value::from("Bob")),
            ("postsIds", int_list(&[2, 3, 4, 5])),
            ("fortuneIds", int_list(&[1])),
        ]),
        object(&[
            ("id", Value::from(2)),
            ("name", Value::from("Sam")),
            ("postsIds", int_list(&[1])),
            ("fortuneIds", int_list(&[2])),
        ]),
        object(&[
            ("id", Value::from(3)),
            ("name", Value::from("Stephen")),
            ("postsIds", int_list(&[3, 4])),
            ("fortuneIds", int_list(&[1, 2])),
        ]),
        object(&[
            ("id", Value::from(4)),
            ("name", Value::from("Pete")),
            ("postsIds", int_list(&[5])),
            ("fortuneIds", int_list(&[1])),
        ]),
        object(&[
            ("id", Value::from(5)),
            ("name", Value::from("Chris")),
            ("postsIds", int_list(&[3])),
            ("fortuneIds", int_list(&[2])),
        ]),
        object(&[
            ("id", Value::from(6)),
            ("name", Value::from("Josh")),
            ("postsIds", int_list(&[1, 5])),
            ("fortuneIds", int_list(&[1])),
        ]),
    ]
}

pub fn posts() -> Vec<Value> {
    vec![
        object(&[("id", Value::from(1)), ("title", Value::from("hello from the future"))]),
        object(&[("id", Value::from(2)), ("title", Value::from("graphql is great"))]),
        object(&[("id", Value::from(3)), ("title", Value::from("batching is amazing!"))]),
        object(&[("id", Value::from(4)), ("title", Value::from("the cache is super helpful"))]),
        object(&[("id", Value::from(5)), ("title", Value::from("look how fast our app is now!"))]),
    ]
}

pub fn games() -> Vec<Value> {
    vec![
        object(&[("id", Value::from(1)), ("title", Value::from("space race"))]),
        object(&[("id", Value::from(2)), ("title", Value::from("tic tac toe"))]),
    ]
}

// rows of a fortune service, the payload nested one level down so the use
// directive has something to unwrap
pub fn fortunes() -> Vec<Value> {
    vec![
        object(&[
            ("id", Value::from(1)),
            ("fortune", object(&[("id", Value::from(1)), ("message", Value::from("you will ship today"))])),
        ]),
        object(&[
            ("id", Value::from(2)),
            ("fortune", object(&[("id", Value::from(2)), ("message", Value::from("beware of stale caches"))])),
        ]),
    ]
}

fn find_row(rows: &[Value], key: &Value) -> anyhow::Result<Value> {
    rows.iter()
        .find(|row| matches!(row, Value::Object(object) if object.get("id") == Some(key)))
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("row not found: {key}"))
}

/// Batch function over an in-memory table, instrumented with a call counter
/// and a capture of every batch's key list.
pub fn counting_batch(
    rows: Vec<Value>,
) -> (BatchFn, Arc<AtomicUsize>, Arc<Mutex<Vec<Vec<Value>>>>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let batches = Arc::new(Mutex::new(Vec::new()));

    let fetch = {
        let calls = calls.clone();
        let batches = batches.clone();
        batch_fn(move |keys: Vec<Value>| {
            let rows = rows.clone();
            let calls = calls.clone();
            let batches = batches.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                batches.lock().unwrap().push(keys.clone());
                keys.iter().map(|key| find_row(&rows, key)).collect()
            }
        })
    };

    (fetch, calls, batches)
}

/// Hook that records what the debug/trace middleware report, so tests can
/// assert on observability without a global subscriber.
#[derive(Default)]
pub struct RecordingHook {
    pub events: Mutex<Vec<String>>,
}

impl ObservabilityHook for RecordingHook {
    fn field_resolving(
        &self,
        info: &crate::context::FieldInfo,
        root: &Value,
        _args: &ValueMapping,
    ) {
        self.events.lock().unwrap().push(format!("resolving {} root={root}", info.path));
    }

    fn field_failed(&self, info: &crate::context::FieldInfo, error: &crate::error::ResolveError) {
        self.events.lock().unwrap().push(format!("failed {}: {error}", info.path));
    }
}

/// The demo schema the original middleware was written against: users with
/// batched posts, a game looked up through the request context and fortunes
/// remapped out of a nested payload.
pub fn demo_bundle() -> (SchemaBundle, Arc<AtomicUsize>) {
    let (post_fetch, post_calls, _) = counting_batch(posts());
    let (game_fetch, _, _) = counting_batch(games());
    let (fortune_fetch, _, _) = counting_batch(fortunes());

    let bundle = SchemaAssembly::new("Query")
        .object(
            TypeDef::new("Query").field(
                FieldDef::new("users", TypeRef::named_list("User"))
                    .argument("gameId", TypeRef::named_nn(TypeRef::INT)),
            ),
        )
        .object(
            TypeDef::new("User")
                .field(
                    FieldDef::new("id", TypeRef::named_nn(TypeRef::INT))
                        .directive(FieldDirective::new("deprecated").arg("reason", "lol")),
                )
                .field(FieldDef::new("name", TypeRef::named(TypeRef::STRING)))
                .field(
                    FieldDef::new("posts", TypeRef::named_list("Post"))
                        .directive(FieldDirective::new("loadPosts").arg("root", "postsIds"))
                        .directive(FieldDirective::new("log")),
                )
                .field(
                    FieldDef::new("game", TypeRef::named("Game"))
                        .directive(FieldDirective::new("loadGames").arg("context", "gameId"))
                        .directive(FieldDirective::new("log")),
                )
                .field(
                    FieldDef::new("fortunes", TypeRef::named_list("Fortune"))
                        .directive(FieldDirective::new("loadFortunes").arg("root", "fortuneIds"))
                        .directive(FieldDirective::new("use").arg("key", "fortune"))
                        .directive(FieldDirective::new("trace")),
                ),
        )
        .object(
            TypeDef::new("Post")
                .field(FieldDef::new("id", TypeRef::named_nn(TypeRef::INT)))
                .field(FieldDef::new("title", TypeRef::named(TypeRef::STRING))),
        )
        .object(
            TypeDef::new("Game")
                .field(FieldDef::new("id", TypeRef::named_nn(TypeRef::INT)))
                .field(FieldDef::new("title", TypeRef::named(TypeRef::STRING))),
        )
        .object(
            TypeDef::new("Fortune")
                .field(FieldDef::new("id", TypeRef::named_nn(TypeRef::INT)))
                .field(
                    FieldDef::new("msg", TypeRef::named(TypeRef::STRING))
                        .directive(FieldDirective::new("use").arg("key", "message")),
                ),
        )
        .loader("loadPosts", post_fetch)
        .loader("loadGames", game_fetch)
        .loader("loadFortunes", fortune_fetch)
        .resolver(
            "Query",
            "users",
            resolver_fn(|_scopes| async { Ok(Value::List(users())) }),
        )
        .resolver("User", "posts", identity_resolver())
        .resolver("User", "game", identity_resolver())
        .build()
        .unwrap();

    (bundle, post_calls)
}

pub async fn run_graphql_query(
    bundle: &SchemaBundle,
    query: &str,
    context_values: ValueMapping,
) -> serde_json::Value {
    let context = Arc::new(bundle.context.create_with(context_values));
    let res = bundle.schema.execute(Request::new(query).data(context)).await;

    assert!(res.errors.is_empty(), "GraphQL query returned errors: {:?}", res.errors);
    serde_json::to_value(res.data).expect("Failed to serialize GraphQL response")
}
