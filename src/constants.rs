//! Central place for application-wide constants and default values.

/// Application name shown in logs and CLI banners.
pub const APP_NAME: &str = "nodetrack";

/// Left padding used to align log lines with those that include emoji prefixes.
pub const ICON_PLACEHOLDER: &str = "   "; // Three spaces for alignment

/// Application / crate version (populated from Cargo.toml via env! macro)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Separator between a request tag and its payload on the wire.
pub const TAG_DELIMITER: char = ':';

/// Tracker entries older than this are considered offline.
pub const DEFAULT_TTL_SECS: u64 = 300;
/// Interval of the tracker's background eviction sweep.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

pub const DEFAULT_TRACKER_BIND: &str = "0.0.0.0:7090";
pub const DEFAULT_TRACKER_ADDRESS: &str = "127.0.0.1:7090";
pub const DEFAULT_AGENT_ADDRESS: &str = "127.0.0.1:7092";

/// Cadence of the agent command loop.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
/// Upper bound on stored peer sessions before the oldest is evicted.
pub const DEFAULT_MAX_SESSIONS: usize = 1024;
/// Directory holding `<addr>.in` / `<addr>.out` spool files.
pub const DEFAULT_SPOOL_DIR: &str = "_nodes";

/// Deadline for a complete outbound round trip (connect, write, read).
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
/// Deadline for reading an inbound request / writing its response.
pub const DEFAULT_IO_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Number of random bytes in a session token (hex encoded on the wire).
pub const TOKEN_BYTES: usize = 32;

/// Human friendly composite version string used in banners / logs.
pub fn full_version() -> String {
    format!("{} v{}", APP_NAME, APP_VERSION)
}
