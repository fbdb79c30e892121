//! # Response Envelope
//!
//! Every reply is the same JSON shape: a success flag, a data or error
//! payload, and a metadata block with timestamp, request id, response
//! time, and (for lists) pagination.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::errors::BridgeError;

/// Uniform response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,

    pub meta: ResponseMeta,
}

/// Error payload inside the envelope
#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    /// Stable machine-readable code
    pub code: String,

    /// Human-readable message
    pub message: String,

    /// HTTP status code
    pub status: u16,
}

/// Envelope metadata block
#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub timestamp: DateTime<Utc>,

    #[serde(rename = "requestId")]
    pub request_id: Uuid,

    #[serde(rename = "responseTimeMs")]
    pub response_time_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageInfo>,
}

/// Pagination metadata for list responses
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PageInfo {
    pub total: u64,
    pub limit: i64,
    pub skip: u64,

    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

impl PageInfo {
    /// `has_more` holds exactly when `skip + returned < total`.
    pub fn new(total: u64, limit: i64, skip: u64, returned: usize) -> Self {
        Self {
            total,
            limit,
            skip,
            has_more: skip + (returned as u64) < total,
        }
    }
}

impl ApiResponse {
    pub fn success(
        data: Option<Value>,
        pagination: Option<PageInfo>,
        request_id: Uuid,
        response_time_ms: u64,
    ) -> Self {
        Self {
            success: true,
            data,
            error: None,
            meta: ResponseMeta {
                timestamp: Utc::now(),
                request_id,
                response_time_ms,
                pagination,
            },
        }
    }

    pub fn failure(err: &BridgeError, request_id: Uuid, response_time_ms: u64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorInfo {
                code: err.code().to_string(),
                message: err.to_string(),
                status: err.status_code().as_u16(),
            }),
            meta: ResponseMeta {
                timestamp: Utc::now(),
                request_id,
                response_time_ms,
                pagination: None,
            },
        }
    }
}
