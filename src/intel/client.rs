//! IP Intelligence Client
//!
//! One outbound GET per lookup against a vpnapi.io-style reputation
//! service: anonymization signals (vpn/proxy/tor) plus coarse
//! geolocation. No retries, no caching, bounded timeout. Every failure
//! mode folds into `LookupError` so the admission pipeline never sees a
//! raw transport error.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Used when no API key is configured. The remote service rejects it,
/// which surfaces as a lookup failure rather than a startup error.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntelConfig {
    pub service_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for IntelConfig {
    fn default() -> Self {
        Self {
            service_url: "https://vpnapi.io".to_string(),
            api_key: PLACEHOLDER_API_KEY.to_string(),
            timeout_secs: 10,
        }
    }
}

/// Payload of a successful lookup. Fields the service omitted stay
/// `None`; resolving absence to "Unknown" belongs to the admission
/// policy, not here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntelReport {
    #[serde(default)]
    pub security: SecuritySignals,
    #[serde(default)]
    pub location: LocationInfo,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SecuritySignals {
    pub vpn: Option<bool>,
    pub proxy: Option<bool>,
    pub tor: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationInfo {
    pub country: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("intelligence service unreachable: {0}")]
    Transport(String),

    #[error("intelligence service returned status {0}")]
    Status(u16),

    #[error("malformed intelligence response: {0}")]
    Malformed(String),
}

/// Lookup seam for the admission pipeline. `IntelClient` implements it
/// over HTTP; tests substitute queued mocks.
#[async_trait]
pub trait IntelLookup: Send + Sync {
    /// Resolve intelligence for one address. Address validation is
    /// best-effort: malformed input goes through to the remote service
    /// and its rejection comes back as a `LookupError`.
    async fn lookup(&self, address: &str) -> Result<IntelReport, LookupError>;
}

#[derive(Debug, Clone)]
pub struct IntelClient {
    config: IntelConfig,
    http_client: Client,
}

impl IntelClient {
    pub fn new(config: IntelConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("Pollbox/0.1")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    // The key travels in the query string; keep the full URL out of logs.
    fn lookup_url(&self, address: &str) -> String {
        format!(
            "{}/api/{}?key={}",
            self.config.service_url.trim_end_matches('/'),
            address,
            self.config.api_key
        )
    }
}

#[async_trait]
impl IntelLookup for IntelClient {
    async fn lookup(&self, address: &str) -> Result<IntelReport, LookupError> {
        let url = self.lookup_url(address);

        let resp = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            debug!(address = %address, status = status.as_u16(), "Intelligence lookup rejected");
            return Err(LookupError::Status(status.as_u16()));
        }

        let report: IntelReport = resp
            .json()
            .await
            .map_err(|e| LookupError::Malformed(e.to_string()))?;

        debug!(
            address = %address,
            vpn = ?report.security.vpn,
            proxy = ?report.security.proxy,
            tor = ?report.security.tor,
            "Intelligence lookup complete"
        );

        Ok(report)
    }
}
