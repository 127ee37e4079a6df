use std::sync::Arc;

use async_graphql::dynamic::Schema;
use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use async_graphql::Request;
use async_graphql_warp::graphql;
use warp::{Filter, Rejection, Reply};

use crate::context::ContextFactory;

/// GraphQL endpoint plus playground. Every request gets a fresh context
/// from the factory, which is what scopes the batch caches to exactly one
/// operation.
pub fn filter(
    schema: Schema,
    factory: ContextFactory,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let graphql_post = warp::path("graphql").and(graphql(schema)).and_then(
        move |(schema, request): (Schema, Request)| {
            let factory = factory.clone();
            async move {
                let context = Arc::new(factory.create());
                let response = schema.execute(request.data(context)).await;
                Ok::<_, Rejection>(warp::reply::json(&response))
            }
        },
    );

    let playground_filter = warp::path("graphql").map(|| {
        warp::reply::html(playground_source(GraphQLPlaygroundConfig::new("/graphql")))
    });

    graphql_post.or(playground_filter)
}
