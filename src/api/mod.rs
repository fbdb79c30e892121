//! # HTTP Bridge Surface
//!
//! The dynamic REST endpoint family, the uniform response envelope, and
//! the error classification every failure funnels through.

pub mod errors;
pub mod handlers;
pub mod response;
pub mod server;

pub use errors::{BridgeError, BridgeResult};
pub use response::{ApiResponse, ErrorInfo, PageInfo, ResponseMeta};
pub use server::{router, serve, AppState};
