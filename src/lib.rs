pub mod binder;
pub mod context;
pub mod error;
pub mod loader;
pub mod middleware;
pub mod route;
pub mod schema;
pub mod template;
pub mod types;

#[cfg(test)]
mod tests;
