//! # Collection Resolver
//!
//! Maps a requested collection name to a validated name and a live,
//! cached handle on that collection's storage. Invalid names fail before
//! the store is ever touched. With no name at all, the resolver instead
//! enumerates the externally-visible collections.

mod cache;
mod name;

use std::sync::Arc;
use std::time::Duration;

pub use cache::{CollectionHandle, HandleCache};
pub use name::{is_reserved, validate_name, MAX_NAME_LEN};

use crate::api::errors::BridgeResult;
use crate::store::Store;

/// Resolves collection names to live handles
pub struct Resolver {
    store: Arc<Store>,
    cache: HandleCache,
}

impl Resolver {
    pub fn new(store: Arc<Store>, handle_ttl: Option<Duration>) -> Self {
        Self {
            store,
            cache: HandleCache::new(handle_ttl),
        }
    }

    /// Resolve a raw name to a collection handle.
    ///
    /// Validation is pure and runs first; only a valid name reaches the
    /// store (which may lazily connect here).
    pub async fn resolve(&self, raw: &str) -> BridgeResult<CollectionHandle> {
        let name = validate_name(raw)?;
        let db = self.store.database().await?;
        Ok(self.cache.get_or_create(&db, name))
    }

    /// Externally-visible collection names, reserved ones excluded,
    /// sorted for stable listings.
    pub async fn list_visible(&self) -> BridgeResult<Vec<String>> {
        let mut names: Vec<String> = self
            .store
            .collection_names()
            .await?
            .into_iter()
            .filter(|name| !is_reserved(name))
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn cached_handles(&self) -> usize {
        self.cache.len()
    }
}
