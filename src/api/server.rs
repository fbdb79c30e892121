//! # HTTP Server
//!
//! Axum router for the dynamic endpoint family, CORS built from
//! configuration, and the serve loop.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers;
use crate::config::Config;
use crate::locator::Locator;
use crate::query::QueryLimits;
use crate::resolver::Resolver;
use crate::store::Store;

/// Shared per-process state
pub struct AppState {
    pub config: Config,
    pub store: Arc<Store>,
    pub resolver: Resolver,
    pub locator: Locator,
    pub limits: QueryLimits,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let store = Arc::new(Store::new(&config.mongodb_uri, &config.mongodb_db));
        let resolver = Resolver::new(
            store.clone(),
            config.handle_ttl_secs.map(Duration::from_secs),
        );
        let locator = Locator::new(config.scan_limit);
        let limits = QueryLimits {
            default_limit: config.default_limit,
            max_limit: config.max_limit,
        };
        Self {
            config,
            store,
            resolver,
            locator,
            limits,
        }
    }
}

/// Build the router. Collection and id arrive as trailing path segments
/// or as query parameters; every method lands in the same dispatcher.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = build_cors(&state.config.cors_origins);

    Router::new()
        .route("/api", any(handlers::root_entry))
        .route("/api/{collection}", any(handlers::collection_entry))
        .route("/api/{collection}/{id}", any(handlers::document_entry))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS from config: no origins configured means permissive development
/// mode, otherwise an explicit allow-list.
fn build_cors(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(parsed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Bind and serve until the process exits.
pub async fn serve(config: Config) -> std::io::Result<()> {
    let listen = config.listen;
    let state = Arc::new(AppState::new(config));
    let app = router(state.clone());

    let listener = TcpListener::bind(listen).await?;
    info!(
        %listen,
        database = %state.config.mongodb_db,
        "bridge listening"
    );
    axum::serve(listener, app).await
}
