//! On-demand system status projection.

use serde::{Deserialize, Serialize};

/// Read-only snapshot of host status, assembled when asked for and never
/// persisted. Wire names match the client-facing message schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SystemInfoSnapshot {
    pub has_pending_restart: bool,
    pub version: String,
    pub is_network_deployed: bool,
    pub web_socket_port_number: u16,
    pub supports_native_web_socket: bool,
    pub failed_modules: Vec<String>,
}
