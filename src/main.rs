//! docbridge entry point
//!
//! Loads the environment, parses configuration, initializes tracing,
//! and hands off to the server. No bridge logic lives here.

use clap::Parser;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docbridge::api;
use docbridge::config::Config;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let config = Config::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("docbridge={},info", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = config.validate() {
        error!("configuration error: {e}");
        std::process::exit(1);
    }

    if let Err(e) = api::serve(config).await {
        error!("server error: {e}");
        std::process::exit(1);
    }
}
