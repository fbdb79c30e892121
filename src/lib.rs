//! docbridge - dynamic REST bridge for schemaless document collections
//!
//! Exposes the collections of a document store through one dynamic
//! endpoint family, inferring the target collection and document
//! identity from the request rather than from static routes.

pub mod api;
pub mod config;
pub mod locator;
pub mod query;
pub mod resolver;
pub mod store;
