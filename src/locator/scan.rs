//! Nested identifier scan
//!
//! Collections are schemaless and historically inconsistent about where
//! identifiers live: the value of interest may sit inside an embedded
//! sub-document or array rather than at the top level. This walk finds a
//! key literally named `id` or `id2` at any depth whose value matches
//! the requested identifier.

use bson::{Bson, Document};

/// Keys the nested scan recognizes as identifiers.
const SCAN_KEYS: [&str; 2] = ["id", "id2"];

/// Matches an identifier as the literal string and, when it parses as a
/// number, numerically. The stored type is not known in advance.
#[derive(Debug, Clone)]
pub struct IdMatcher {
    raw: String,
    numeric: Option<f64>,
}

impl IdMatcher {
    pub fn new(id_value: &str) -> Self {
        Self {
            raw: id_value.to_string(),
            numeric: id_value.parse::<f64>().ok().filter(|f| f.is_finite()),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Numeric encodings of the identifier, for alternate-field lookups.
    pub fn numeric_candidates(&self) -> Vec<Bson> {
        let mut candidates = vec![Bson::String(self.raw.clone())];
        if let Ok(n) = self.raw.parse::<i64>() {
            candidates.push(Bson::Int64(n));
            candidates.push(Bson::Int32(n as i32));
        } else if let Some(f) = self.numeric {
            candidates.push(Bson::Double(f));
        }
        candidates
    }

    /// Does a stored value equal this identifier?
    pub fn matches(&self, value: &Bson) -> bool {
        match value {
            Bson::String(s) => s == &self.raw,
            Bson::Int32(n) => self.numeric == Some(f64::from(*n)),
            Bson::Int64(n) => self.numeric == Some(*n as f64),
            Bson::Double(f) => self.numeric == Some(*f),
            _ => false,
        }
    }
}

/// Walk every nested object/array of `doc` looking for an identifier key
/// matching `matcher`. Returns true if any depth holds one.
pub fn contains_identity(doc: &Document, matcher: &IdMatcher) -> bool {
    for (key, value) in doc {
        if SCAN_KEYS.contains(&key.as_str()) && matcher.matches(value) {
            return true;
        }
        if value_contains_identity(value, matcher) {
            return true;
        }
    }
    false
}

fn value_contains_identity(value: &Bson, matcher: &IdMatcher) -> bool {
    match value {
        Bson::Document(inner) => contains_identity(inner, matcher),
        Bson::Array(items) => items
            .iter()
            .any(|item| value_contains_identity(item, matcher)),
        _ => false,
    }
}
