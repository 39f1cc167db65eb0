//! # Node configuration
//!
//! Nested per-subsystem structs with `Default` impls, same shape as the
//! container's unified config, plus a TOML file loader: a missing file
//! falls back to defaults, a malformed one is a startup error.

use serde::Deserialize;
use std::path::Path;

/// Complete node configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeConfig {
    /// Gossip driver and RPC tuning.
    #[serde(default)]
    pub node: GossipConfig,
    /// Store cache tuning.
    #[serde(default)]
    pub store: StoreConfig,
    /// Metrics endpoint (exposed for completeness; binding it is out of
    /// scope here).
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl NodeConfig {
    /// Loads configuration from `path`. Defaults if the file doesn't
    /// exist; a parse error is surfaced to the caller, never silently
    /// ignored.
    pub fn load(path: &Path) -> Result<Self, shared_types::NodeError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|err| shared_types::NodeError::Startup(format!("reading {}: {err}", path.display())))?;
        toml::from_str(&raw)
            .map_err(|err| shared_types::NodeError::Config(format!("parsing {}: {err}", path.display())))
    }
}

/// Gossip driver and RPC tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GossipConfig {
    /// Interval between gossip ticks, in milliseconds.
    pub gossip_tick_ms: u64,
    /// Diff size beyond which a `Sync` response reports `sync_limit`.
    pub sync_limit: usize,
    /// Per-RPC-call timeout, in milliseconds.
    pub rpc_timeout_ms: u64,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            gossip_tick_ms: 5,
            sync_limit: sync::DEFAULT_SYNC_LIMIT,
            rpc_timeout_ms: sync::DEFAULT_RPC_TIMEOUT.as_millis() as u64,
        }
    }
}

/// Store cache tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Event read-cache entries in front of the persistent backend.
    pub event_cache_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            event_cache_size: 10_000,
        }
    }
}

/// Metrics endpoint. Listed for completeness; `enabled` is honored by
/// nothing in this crate.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether the stats endpoint should bind.
    pub enabled: bool,
    /// Bind address for the stats endpoint.
    pub bind_addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_addr: "127.0.0.1:9090".to_string(),
        }
    }
}
