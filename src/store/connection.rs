//! Store connection lifecycle
//!
//! The client is established lazily on first use. Concurrent requests
//! arriving before the connection is ready wait on the same in-flight
//! attempt; a failed attempt leaves the slot empty so the next request
//! retries.

use bson::doc;
use mongodb::{Client, Database};
use tokio::sync::OnceCell;
use tracing::info;

use crate::api::errors::{BridgeError, BridgeResult};

/// How long the driver may spend selecting/contacting a server before an
/// operation fails instead of hanging.
const SERVER_SELECTION_TIMEOUT_MS: u32 = 3000;
const CONNECT_TIMEOUT_MS: u32 = 3000;

/// Handle to the bridged database
pub struct Store {
    uri: String,
    db_name: String,
    client: OnceCell<Client>,
}

impl Store {
    pub fn new(uri: impl Into<String>, db_name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            db_name: db_name.into(),
            client: OnceCell::new(),
        }
    }

    /// Get the database, connecting on first use.
    pub async fn database(&self) -> BridgeResult<Database> {
        let client = self
            .client
            .get_or_try_init(|| connect(&self.uri, &self.db_name))
            .await?;
        Ok(client.database(&self.db_name))
    }

    /// All collection names the store reports for the bridged database.
    pub async fn collection_names(&self) -> BridgeResult<Vec<String>> {
        let db = self.database().await?;
        let names = db.list_collection_names().await?;
        Ok(names)
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

async fn connect(uri: &str, db_name: &str) -> BridgeResult<Client> {
    info!("connecting to document store");

    // Bound connection establishment so an unreachable store fails the
    // request instead of hanging it.
    let separator = if uri.contains('?') { '&' } else { '?' };
    let timeout_uri = format!(
        "{uri}{separator}serverSelectionTimeoutMS={SERVER_SELECTION_TIMEOUT_MS}&connectTimeoutMS={CONNECT_TIMEOUT_MS}"
    );

    let client = Client::with_uri_str(&timeout_uri)
        .await
        .map_err(|e| BridgeError::Connection(format!("client setup failed: {e}")))?;

    // Verify the store is actually reachable before caching the client.
    client
        .database(db_name)
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| BridgeError::Connection(format!("store ping failed: {e}")))?;

    info!(database = db_name, "connected to document store");
    Ok(client)
}
