//! Collection name validation
//!
//! A requested name must be provably safe before anything touches the
//! store: restrictive charset, bounded length, and no internal
//! namespaces. Operator-looking characters (`$`, `.`) never pass.

use crate::api::errors::{BridgeError, BridgeResult};

/// Longest accepted collection name.
pub const MAX_NAME_LEN: usize = 64;

/// Validate a raw collection name, returning it unchanged when safe.
pub fn validate_name(raw: &str) -> BridgeResult<&str> {
    if raw.is_empty() {
        return Err(BridgeError::InvalidName("empty name".to_string()));
    }
    if raw.len() > MAX_NAME_LEN {
        return Err(BridgeError::InvalidName(format!(
            "name exceeds {MAX_NAME_LEN} characters"
        )));
    }
    if !raw
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(BridgeError::InvalidName(format!(
            "name contains disallowed characters: {raw}"
        )));
    }
    if is_reserved(raw) {
        return Err(BridgeError::InvalidName(format!("name is reserved: {raw}")));
    }
    Ok(raw)
}

/// Names the bridge never exposes: the store's internal namespace and
/// anything underscore-prefixed.
pub fn is_reserved(name: &str) -> bool {
    name == "system" || name.starts_with("system.") || name.starts_with('_')
}
