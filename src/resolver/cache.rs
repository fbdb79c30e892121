//! Collection handle cache
//!
//! Handles are created on first reference to a name and shared across
//! requests for the life of the process, or until the optional expiry
//! forces recreation. Creation is idempotent under concurrent first use:
//! the write path re-checks under the lock, so racing requests converge
//! on one logical handle.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use bson::Document;
use mongodb::{Collection, Database};

/// Live handle to a named collection
#[derive(Clone)]
pub struct CollectionHandle {
    name: String,
    collection: Collection<Document>,
}

impl CollectionHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying collection accessor.
    pub fn inner(&self) -> &Collection<Document> {
        &self.collection
    }
}

struct Entry {
    handle: CollectionHandle,
    created: Instant,
}

/// Process-wide cache of collection handles
pub struct HandleCache {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Option<Duration>,
}

impl HandleCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Get the cached handle for `name`, creating and registering it on
    /// first use (or after expiry).
    pub fn get_or_create(&self, db: &Database, name: &str) -> CollectionHandle {
        {
            let entries = self.entries.read().unwrap();
            if let Some(entry) = entries.get(name) {
                if !self.expired(entry) {
                    return entry.handle.clone();
                }
            }
        }

        let mut entries = self.entries.write().unwrap();
        // Another request may have created the handle between the locks.
        if let Some(entry) = entries.get(name) {
            if !self.expired(entry) {
                return entry.handle.clone();
            }
        }

        let handle = CollectionHandle {
            name: name.to_string(),
            collection: db.collection::<Document>(name),
        };
        entries.insert(
            name.to_string(),
            Entry {
                handle: handle.clone(),
                created: Instant::now(),
            },
        );
        handle
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn expired(&self, entry: &Entry) -> bool {
        match self.ttl {
            Some(ttl) => entry.created.elapsed() > ttl,
            None => false,
        }
    }
}
