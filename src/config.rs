//! Process configuration
//!
//! CLI arguments with environment variable fallbacks. Every knob the
//! bridge exposes lives here: where to listen, which store to bridge to,
//! CORS origins, and the bounds on pagination, batch inserts, and the
//! identity scan.

use std::net::SocketAddr;

use clap::Parser;

/// docbridge - dynamic REST bridge for schemaless document collections
#[derive(Parser, Debug, Clone)]
#[command(name = "docbridge")]
#[command(about = "Expose document-store collections through a single dynamic REST endpoint")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "BRIDGE_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Document store connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// Database name to bridge
    #[arg(long, env = "MONGODB_DB", default_value = "bridge")]
    pub mongodb_db: String,

    /// CORS allowed origins (comma separated; empty = permissive dev mode)
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Default page size when the caller supplies no limit
    #[arg(long, env = "DEFAULT_LIMIT", default_value = "50")]
    pub default_limit: i64,

    /// Hard upper bound on page size; larger requests are clamped
    #[arg(long, env = "MAX_LIMIT", default_value = "500")]
    pub max_limit: i64,

    /// Maximum documents examined by the nested identity scan
    #[arg(long, env = "SCAN_LIMIT", default_value = "1000")]
    pub scan_limit: i64,

    /// Maximum documents accepted in a single batch insert
    #[arg(long, env = "MAX_BATCH_INSERT", default_value = "100")]
    pub max_batch_insert: usize,

    /// Collection handle cache expiry in seconds (unset = never expires)
    #[arg(long, env = "HANDLE_TTL_SECS")]
    pub handle_ttl_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Reject configurations that cannot serve requests sensibly.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_limit < 1 {
            return Err(format!("default_limit must be >= 1, got {}", self.default_limit));
        }
        if self.max_limit < self.default_limit {
            return Err(format!(
                "max_limit ({}) must be >= default_limit ({})",
                self.max_limit, self.default_limit
            ));
        }
        if self.scan_limit < 1 {
            return Err(format!("scan_limit must be >= 1, got {}", self.scan_limit));
        }
        if self.max_batch_insert < 1 {
            return Err(format!(
                "max_batch_insert must be >= 1, got {}",
                self.max_batch_insert
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config::parse_from(["docbridge"])
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = base_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_limit, 50);
        assert_eq!(config.max_limit, 500);
    }

    #[test]
    fn test_rejects_inverted_limits() {
        let mut config = base_config();
        config.max_limit = 10;
        config.default_limit = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_scan_limit() {
        let mut config = base_config();
        config.scan_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cors_origins_split_on_comma() {
        let config = Config::parse_from([
            "docbridge",
            "--cors-origins",
            "http://localhost:3000,http://localhost:5173",
        ]);
        assert_eq!(config.cors_origins.len(), 2);
    }
}
