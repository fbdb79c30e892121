//! # Document Store Access
//!
//! Shared, lazily-established connection to the backing document store
//! and the value conversions between stored BSON and wire JSON.

mod connection;
mod convert;

pub use connection::Store;
pub use convert::{bson_to_json, doc_to_json, json_to_document};
