//! Transport layer for hashomatic.
//!
//! Currently provides HTTP transport via axum.

pub mod http;

pub use http::{ServeError, ServerConfig, serve, serve_with_listener};
