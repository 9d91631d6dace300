use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

use crate::intel::{IntelConfig, PLACEHOLDER_API_KEY};

/// Configuration for the poll collector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Intelligence lookup configuration
    pub intel: IntelConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub url: String,
    /// Connection pool size
    pub max_connections: u32,
    /// Enable PostgreSQL (if false, uses the in-memory fallback)
    pub postgres_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug)
    pub level: String,
    /// Enable request span logging
    pub log_requests: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost:5432/pollbox".to_string(),
            max_connections: 10,
            postgres_enabled: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_requests: false,
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            intel: IntelConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PollConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Server configuration
        if let Ok(host) = env::var("POLLBOX_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = env::var("POLLBOX_PORT") {
            config.server.port = port.parse().context("Invalid POLLBOX_PORT value")?;
        }

        // Database configuration
        if let Ok(url) = env::var("DATABASE_URL") {
            config.database.url = url;
        }

        if let Ok(max_connections) = env::var("POLLBOX_DB_MAX_CONNECTIONS") {
            config.database.max_connections = max_connections
                .parse()
                .context("Invalid POLLBOX_DB_MAX_CONNECTIONS value")?;
        }

        if let Ok(enabled) = env::var("POLLBOX_POSTGRES_ENABLED") {
            config.database.postgres_enabled = enabled
                .parse()
                .context("Invalid POLLBOX_POSTGRES_ENABLED value")?;
        }

        // Intelligence service configuration
        if let Ok(service_url) = env::var("POLLBOX_INTEL_URL") {
            config.intel.service_url = service_url;
        }

        // A missing key is tolerated: the placeholder is sent as-is and
        // the remote rejection surfaces as a lookup failure. The fallback
        // is warned about in main, after the subscriber is installed;
        // from_env runs before logging is up.
        config.intel.api_key =
            env::var("VPNAPI_KEY").unwrap_or_else(|_| PLACEHOLDER_API_KEY.to_string());

        if let Ok(timeout) = env::var("POLLBOX_INTEL_TIMEOUT_SECS") {
            config.intel.timeout_secs = timeout
                .parse()
                .context("Invalid POLLBOX_INTEL_TIMEOUT_SECS value")?;
        }

        // Logging configuration
        if let Ok(level) = env::var("POLLBOX_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(log_requests) = env::var("POLLBOX_LOG_REQUESTS") {
            config.logging.log_requests = log_requests
                .parse()
                .context("Invalid POLLBOX_LOG_REQUESTS value")?;
        }

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration for consistency
    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(anyhow::anyhow!("Server host cannot be empty"));
        }

        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port must be non-zero"));
        }

        if self.database.postgres_enabled && self.database.url.is_empty() {
            return Err(anyhow::anyhow!("Database URL cannot be empty"));
        }

        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!(
                "Database pool needs at least one connection"
            ));
        }

        if self.intel.service_url.is_empty() {
            return Err(anyhow::anyhow!("Intelligence service URL cannot be empty"));
        }

        if self.intel.timeout_secs == 0 {
            return Err(anyhow::anyhow!("Intelligence timeout must be non-zero"));
        }

        Ok(())
    }
}
