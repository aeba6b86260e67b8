use crate::constants::*;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Runtime configuration shared by the tracker and the node agent binaries.
/// Every field is optional; unset values resolve to the defaults in
/// `constants`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    pub tracker: Option<TrackerConfig>,
    pub agent: Option<AgentConfig>,
    pub network: Option<NetworkConfig>,
    /// Logging / events configuration
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TrackerConfig {
    /// Listen address of the tracker service
    pub bind: Option<String>,
    /// Seconds after the last `submit_info` before a node is dropped
    pub ttl_secs: Option<u64>,
    /// Seconds between background eviction sweeps
    pub sweep_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AgentConfig {
    /// Address this node advertises to the tracker and to peers (host:port)
    pub address: Option<String>,
    /// Listen address; defaults to `address`
    pub bind: Option<String>,
    /// Tracker address (host:port)
    pub tracker: Option<String>,
    pub poll_interval_ms: Option<u64>,
    /// Capacity of the peer session table
    pub max_sessions: Option<usize>,
    /// Re-submit to the tracker every N seconds (disabled when unset)
    pub heartbeat_secs: Option<u64>,
    /// Directory of the `<addr>.in` / `<addr>.out` command spool
    pub spool_dir: Option<String>,
    /// Register with the tracker once at startup (default true)
    pub submit_on_start: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct NetworkConfig {
    /// Deadline for an outbound round trip
    pub request_timeout_ms: Option<u64>,
    /// Deadline for reading a request / writing a response on inbound connections
    pub io_timeout_ms: Option<u64>,
    /// Maximum accepted line length in bytes
    pub max_line_bytes: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Path to JSON line event log (rotated). Defaults to logs/nodetrack.jsonl
    pub json_path: Option<String>,
    /// Max size in bytes before rotation (default 5MB)
    pub json_max_bytes: Option<usize>,
    /// Number of rotated files to retain (default 3)
    pub json_rotate: Option<u32>,
    /// Disable console sink (default false)
    pub disable_console: Option<bool>,
    /// Minimum console level: trace | debug | info | warn | error
    pub console_level: Option<String>,
}

impl Config {
    /// Load a TOML config file. A missing file yields `Ok(None)` so callers
    /// can fall back to defaults; a malformed file is an error.
    pub fn load(path: &Path) -> anyhow::Result<Option<Config>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(Self::from_toml(&content).map_err(|e| {
                anyhow::anyhow!("failed to parse config file '{}': {}", path.display(), e)
            })?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            )),
        }
    }

    pub fn from_toml(content: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn tracker_bind(&self) -> String {
        self.tracker
            .as_ref()
            .and_then(|t| t.bind.clone())
            .unwrap_or_else(|| DEFAULT_TRACKER_BIND.to_string())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(
            self.tracker
                .as_ref()
                .and_then(|t| t.ttl_secs)
                .unwrap_or(DEFAULT_TTL_SECS),
        )
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(
            self.tracker
                .as_ref()
                .and_then(|t| t.sweep_interval_secs)
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS)
                .max(1),
        )
    }

    pub fn agent_address(&self) -> String {
        self.agent
            .as_ref()
            .and_then(|a| a.address.clone())
            .unwrap_or_else(|| DEFAULT_AGENT_ADDRESS.to_string())
    }

    pub fn agent_bind(&self) -> String {
        self.agent
            .as_ref()
            .and_then(|a| a.bind.clone())
            .unwrap_or_else(|| self.agent_address())
    }

    pub fn tracker_address(&self) -> String {
        self.agent
            .as_ref()
            .and_then(|a| a.tracker.clone())
            .unwrap_or_else(|| DEFAULT_TRACKER_ADDRESS.to_string())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.agent
                .as_ref()
                .and_then(|a| a.poll_interval_ms)
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS)
                .max(1),
        )
    }

    pub fn max_sessions(&self) -> usize {
        self.agent
            .as_ref()
            .and_then(|a| a.max_sessions)
            .unwrap_or(DEFAULT_MAX_SESSIONS)
            .max(1)
    }

    pub fn heartbeat(&self) -> Option<Duration> {
        self.agent
            .as_ref()
            .and_then(|a| a.heartbeat_secs)
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }

    pub fn spool_dir(&self) -> String {
        self.agent
            .as_ref()
            .and_then(|a| a.spool_dir.clone())
            .unwrap_or_else(|| DEFAULT_SPOOL_DIR.to_string())
    }

    pub fn submit_on_start(&self) -> bool {
        self.agent
            .as_ref()
            .and_then(|a| a.submit_on_start)
            .unwrap_or(true)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(
            self.network
                .as_ref()
                .and_then(|n| n.request_timeout_ms)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
        )
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(
            self.network
                .as_ref()
                .and_then(|n| n.io_timeout_ms)
                .unwrap_or(DEFAULT_IO_TIMEOUT_MS),
        )
    }

    pub fn max_line_bytes(&self) -> usize {
        self.network
            .as_ref()
            .and_then(|n| n.max_line_bytes)
            .unwrap_or(DEFAULT_MAX_LINE_BYTES)
    }

    // CLI override helpers; flags take precedence over the file.

    pub fn set_agent_address(&mut self, address: String) {
        self.agent.get_or_insert_with(Default::default).address = Some(address);
    }

    pub fn set_tracker_address(&mut self, tracker: String) {
        self.agent.get_or_insert_with(Default::default).tracker = Some(tracker);
    }

    pub fn set_spool_dir(&mut self, dir: String) {
        self.agent.get_or_insert_with(Default::default).spool_dir = Some(dir);
    }

    pub fn set_tracker_bind(&mut self, bind: String) {
        self.tracker.get_or_insert_with(Default::default).bind = Some(bind);
    }

    pub fn set_ttl_secs(&mut self, secs: u64) {
        self.tracker.get_or_insert_with(Default::default).ttl_secs = Some(secs);
    }

    pub fn set_sweep_interval_secs(&mut self, secs: u64) {
        self.tracker
            .get_or_insert_with(Default::default)
            .sweep_interval_secs = Some(secs);
    }
}
