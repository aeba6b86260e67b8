//! # nodetrack
//!
//! Peer-discovery and messaging test harness.
//!
//! * **Tracker** keeps a TTL-bounded registry of online nodes and answers
//!   `submit_info`, `get_list` and `get_ip`.
//! * **Node agent** performs `peer_connect` handshakes, issues session
//!   tokens and only delivers chat / file payloads that present the token of
//!   a known session.
//!
//! Every exchange is one request line and one response line over a fresh
//! TCP connection (`<tag>:<json>` or a bare `<tag>`).
//!
//! ## Key Modules
//! * `tracker` – Registry, TTL sweep, request handler.
//! * `agent` – Sessions, handshakes, authorization, command loop, spool.
//! * `network` – Line codec, transport, accept loop.
//! * `events` – Structured logging/events dispatcher.
//! * `config` – TOML configuration with defaults.
//! * `prompt` – Optional interactive command entry.

pub mod agent;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod network;
pub mod prelude;
pub mod prompt;
pub mod shutdown;
pub mod tracker;
