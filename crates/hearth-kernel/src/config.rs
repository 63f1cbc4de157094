//! The persisted server configuration document and fixed host facts.

use serde::{Deserialize, Serialize};

/// Persisted configuration document.
///
/// Every field carries a serde default so documents written by older
/// releases deserialize cleanly; the store re-serializes after each load and
/// rewrites the file when the canonical form gained fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfiguration {
    /// Document schema generation, bumped when fields change meaning.
    pub schema_version: u32,
    /// Filter directive applied to the logging subsystem on each reload.
    pub log_level: String,
    pub http_port: u16,
    pub websocket_port: u16,
    pub enable_native_websocket: bool,
    /// Days to keep derived cache entries before eviction.
    pub cache_retention_days: u32,
}

impl Default for ServerConfiguration {
    fn default() -> Self {
        Self {
            schema_version: 1,
            log_level: "info".into(),
            http_port: 8096,
            websocket_port: 8945,
            enable_native_websocket: true,
            cache_retention_days: 30,
        }
    }
}

/// Immutable facts about the running host, supplied at construction.
#[derive(Debug, Clone)]
pub struct HostOptions {
    pub version: String,
    pub is_network_deployed: bool,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").into(),
            is_network_deployed: false,
        }
    }
}
