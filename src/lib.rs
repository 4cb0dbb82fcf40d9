//! docstore - an embedded, schemaless document store
//!
//! JSON documents grouped into collections, stamped with lifecycle
//! timestamps and listed across collections in creation order, on top of a
//! small ordered key-value engine with an append-only log.
//!
//! - `engine`: key-value engine, transactions, indexes, durability log
//! - `document`: timestamp envelope and identifier generation
//! - `store`: collections, CRUD and pagination
//! - `http_server`: JSON-over-HTTP surface
//! - `cli`: `docstore` binary commands and configuration
//! - `observability`: structured event logging

pub mod cli;
pub mod document;
pub mod engine;
pub mod http_server;
pub mod observability;
pub mod store;
