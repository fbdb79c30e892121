//! BSON <-> JSON value conversion
//!
//! Documents go out as plain JSON: object ids as their hex string,
//! datetimes as RFC 3339. Extended-JSON wrappers never reach clients.

use bson::{Bson, Document};
use serde_json::Value;

use crate::api::errors::{BridgeError, BridgeResult};

/// Render a stored value as wire JSON.
pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(s) => Value::String(s),
            Err(_) => Value::String(dt.to_string()),
        },
        Bson::Document(doc) => Value::Object(
            doc.into_iter()
                .map(|(key, value)| (key, bson_to_json(value)))
                .collect(),
        ),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::String(s) => Value::String(s),
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Null => Value::Null,
        Bson::Int32(n) => Value::from(n),
        Bson::Int64(n) => Value::from(n),
        Bson::Double(n) => serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        other => other.into_relaxed_extjson(),
    }
}

/// Render a whole stored document as wire JSON.
pub fn doc_to_json(doc: Document) -> Value {
    bson_to_json(Bson::Document(doc))
}

/// Convert a JSON request body into a storable document.
pub fn json_to_document(value: &Value) -> BridgeResult<Document> {
    bson::to_document(value).map_err(|e| BridgeError::Cast(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;
    use bson::doc;
    use serde_json::json;

    #[test]
    fn test_object_id_renders_as_hex_string() {
        let oid = ObjectId::new();
        let rendered = bson_to_json(Bson::ObjectId(oid));
        assert_eq!(rendered, Value::String(oid.to_hex()));
    }

    #[test]
    fn test_nested_document_renders_plain_json() {
        let doc = doc! {
            "name": "alpha",
            "count": 3_i64,
            "tags": ["a", "b"],
            "inner": { "flag": true },
        };
        let rendered = doc_to_json(doc);
        assert_eq!(
            rendered,
            json!({
                "name": "alpha",
                "count": 3,
                "tags": ["a", "b"],
                "inner": { "flag": true },
            })
        );
    }

    #[test]
    fn test_datetime_renders_rfc3339() {
        let dt = bson::DateTime::from_millis(0);
        let rendered = bson_to_json(Bson::DateTime(dt));
        assert_eq!(rendered, Value::String("1970-01-01T00:00:00Z".to_string()));
    }

    #[test]
    fn test_json_round_trips_to_document() {
        let body = json!({"name": "beta", "n": 2});
        let doc = json_to_document(&body).unwrap();
        assert_eq!(doc.get_str("name").unwrap(), "beta");
        assert_eq!(doc.get_i64("n").unwrap(), 2);
    }

    #[test]
    fn test_non_object_body_is_a_cast_error() {
        let body = json!("just a string");
        assert!(json_to_document(&body).is_err());
    }
}
