//! # Document Locator
//!
//! Resolves a caller-supplied identifier of unknown kind against a
//! collection by trying an ordered sequence of interpretations, each
//! strictly looser than the last:
//!
//! 1. the identifier as a canonical primary key (ObjectId),
//! 2. the identifier as the primary key's literal string value,
//! 3. alternate identifier fields in fixed priority order,
//! 4. a bounded scan for nested `id`/`id2` keys at any depth.
//!
//! The first stage to find anything wins. A stage's lookup error only
//! falls through to the next stage; the locator itself never fails a
//! request over a single bad stage.

mod scan;

use bson::oid::ObjectId;
use bson::{doc, Document};
use futures_util::StreamExt;
use mongodb::options::FindOptions;
use tracing::debug;

pub use scan::{contains_identity, IdMatcher};

use crate::api::errors::BridgeResult;
use crate::resolver::CollectionHandle;

/// Alternate identifier fields, in the order they are tried.
pub const ALTERNATE_ID_FIELDS: [&str; 6] = ["id", "id2", "slug", "uuid", "email", "username"];

/// A successful location: either a single document (stages 1-3) or the
/// set of top-level documents containing a nested match (stage 4).
#[derive(Debug, Clone)]
pub enum Located {
    Document(Document),
    Containers(Vec<Document>),
}

impl Located {
    /// The first located document, for operations needing one target.
    pub fn into_first(self) -> Option<Document> {
        match self {
            Located::Document(doc) => Some(doc),
            Located::Containers(docs) => docs.into_iter().next(),
        }
    }
}

/// Multi-stage document locator
pub struct Locator {
    scan_limit: i64,
}

impl Locator {
    pub fn new(scan_limit: i64) -> Self {
        Self { scan_limit }
    }

    /// Locate the document(s) the identifier means. `None` when every
    /// stage finds nothing (or errors).
    pub async fn locate(
        &self,
        handle: &CollectionHandle,
        id_value: &str,
    ) -> BridgeResult<Option<Located>> {
        let matcher = IdMatcher::new(id_value);

        // Stage 1: canonical primary-key form.
        if let Ok(oid) = ObjectId::parse_str(id_value) {
            if let Some(doc) = self.find_one_stage(handle, doc! { "_id": oid }, 1).await {
                return Ok(Some(Located::Document(doc)));
            }
        }

        // Stage 2: primary key stored as the raw string.
        if let Some(doc) = self
            .find_one_stage(handle, doc! { "_id": id_value }, 2)
            .await
        {
            return Ok(Some(Located::Document(doc)));
        }

        // Stage 3: alternate identifier fields, as given and numerically.
        for field in ALTERNATE_ID_FIELDS {
            let filter = alternate_filter(field, &matcher);
            if let Some(doc) = self.find_one_stage(handle, filter, 3).await {
                return Ok(Some(Located::Document(doc)));
            }
        }

        // Stage 4: bounded nested scan.
        let containers = self.scan_stage(handle, &matcher).await;
        if containers.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Located::Containers(containers)))
        }
    }

    /// One lookup attempt; an error means "not found at this stage".
    async fn find_one_stage(
        &self,
        handle: &CollectionHandle,
        filter: Document,
        stage: u8,
    ) -> Option<Document> {
        match handle.inner().find_one(filter).await {
            Ok(found) => found,
            Err(err) => {
                debug!(stage, collection = handle.name(), error = %err, "locator stage lookup failed");
                None
            }
        }
    }

    /// Walk up to `scan_limit` documents for nested identifier keys.
    /// This is the one deliberately unbounded-cost interpretation; the
    /// limit is what keeps it survivable on large collections.
    async fn scan_stage(&self, handle: &CollectionHandle, matcher: &IdMatcher) -> Vec<Document> {
        let options = FindOptions::builder().limit(self.scan_limit).build();
        let mut cursor = match handle.inner().find(doc! {}).with_options(options).await {
            Ok(cursor) => cursor,
            Err(err) => {
                debug!(stage = 4, collection = handle.name(), error = %err, "locator scan failed to start");
                return Vec::new();
            }
        };

        let mut containers = Vec::new();
        while let Some(next) = cursor.next().await {
            match next {
                Ok(doc) => {
                    if contains_identity(&doc, matcher) {
                        containers.push(doc);
                    }
                }
                Err(err) => {
                    debug!(stage = 4, collection = handle.name(), error = %err, "locator scan read failed");
                }
            }
        }
        containers
    }
}

/// Filter for one alternate field: the value as given and, when it
/// parses as a number, its numeric encodings.
fn alternate_filter(field: &str, matcher: &IdMatcher) -> Document {
    let candidates = matcher.numeric_candidates();
    if candidates.len() == 1 {
        doc! { field: matcher.raw() }
    } else {
        doc! { field: { "$in": candidates } }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alternate_field_priority_order() {
        assert_eq!(
            ALTERNATE_ID_FIELDS,
            ["id", "id2", "slug", "uuid", "email", "username"]
        );
    }

    #[test]
    fn test_alternate_filter_plain_string() {
        let filter = alternate_filter("slug", &IdMatcher::new("hello-world"));
        assert_eq!(filter.get_str("slug").unwrap(), "hello-world");
    }

    #[test]
    fn test_alternate_filter_numeric_widens_to_membership() {
        let filter = alternate_filter("id", &IdMatcher::new("42"));
        let entry = filter.get_document("id").unwrap();
        let candidates = entry.get_array("$in").unwrap();
        assert!(candidates.len() >= 2);
    }

    #[test]
    fn test_located_first_prefers_single_document() {
        let single = Located::Document(doc! { "a": 1 });
        assert!(single.into_first().is_some());

        let none = Located::Containers(Vec::new());
        assert!(none.into_first().is_none());
    }
}
