//! Curated re-exports for embedding the tracker or an agent.
//! Import with: `use nodetrack::prelude::*;`

pub use crate::agent::{
    start_agent, AgentHandle, Command, CommandQueue, NodeAgent, OutputSink, SessionTable, Token,
};
pub use crate::config::Config;
pub use crate::network::message::NodeAddress;
pub use crate::network::{RequestHandler, Transport};
pub use crate::shutdown::Shutdown;
pub use crate::tracker::{start_tracker, TrackerHandle, TrackerRegistry, TrackerSnapshot};
