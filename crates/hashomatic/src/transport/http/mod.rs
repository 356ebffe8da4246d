//! HTTP transport using axum.

mod routes;
mod server;

pub use routes::routes;
pub use server::{ServeError, ServerConfig, serve, serve_with_listener};
