//! # HTTP Server Module
//!
//! A thin JSON-over-HTTP surface for the document store, built on axum.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/db` - Listing across collections
//! - `/db/:collection[/:id]` - Document create, read, update, delete
//!
//! Responses use the envelope `{"error": "...", "result": ...}`; `error` is
//! omitted on success.

pub mod config;
pub mod document_routes;
pub mod errors;
pub mod observability_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use document_routes::{document_routes, DocumentState};
pub use errors::{ApiError, ApiResult, Envelope};
pub use server::HttpServer;
