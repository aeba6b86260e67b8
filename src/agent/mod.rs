//! Node agent: peer handshakes, token-authorized chat and file delivery, and
//! the command loop that drives it.

pub mod authorizer;
pub mod commands;
pub mod handshake;
pub mod node;
pub mod output;
pub mod session;
pub mod spool;

pub use authorizer::MessageAuthorizer;
pub use commands::{command_channel, ChannelCommandSource, Command, CommandQueue, CommandSource};
pub use handshake::PeerHandshakeManager;
pub use node::{CommandFlow, NodeAgent};
pub use output::{FileOutputSink, MemoryOutputSink, OutputSink, StdoutSink, TeeSink};
pub use session::{HandshakeState, PeerSession, SessionRole, SessionTable, Token};
pub use spool::Spool;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::events::{emit_system_event, LogLevel};
use crate::network::listener::{bind, serve, ServeOptions};
use crate::network::message::NodeAddress;
use crate::network::transport::{TcpTransport, Transport};
use crate::shutdown::Shutdown;

const COMMAND_QUEUE_CAPACITY: usize = 64;

/// A running agent: accept loop, command loop and optional heartbeat.
pub struct AgentHandle {
    pub agent: Arc<NodeAgent>,
    /// Socket the listener is bound to.
    pub local_addr: SocketAddr,
    /// Producer side of the agent's command channel.
    pub queue: CommandQueue,
    shutdown: Shutdown,
    server: JoinHandle<std::io::Result<()>>,
    tasks: Vec<JoinHandle<()>>,
}

impl AgentHandle {
    pub fn address(&self) -> &NodeAddress {
        self.agent.local()
    }

    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Attach an extra background task that should be awaited on exit.
    pub fn track(&mut self, task: JoinHandle<()>) {
        self.tasks.push(task);
    }

    pub async fn wait(self) -> anyhow::Result<()> {
        let served = self.server.await?;
        for task in self.tasks {
            task.await?;
        }
        served?;
        Ok(())
    }
}

/// Bind, start serving and start the command loop. An advertised port of 0
/// is replaced by the port actually bound.
pub async fn start_agent(
    config: &Config,
    output: Arc<dyn OutputSink>,
    shutdown: Shutdown,
) -> anyhow::Result<AgentHandle> {
    let transport: Arc<dyn Transport> = Arc::new(TcpTransport::from_config(config));
    start_agent_with_transport(config, transport, output, shutdown).await
}

pub async fn start_agent_with_transport(
    config: &Config,
    transport: Arc<dyn Transport>,
    output: Arc<dyn OutputSink>,
    shutdown: Shutdown,
) -> anyhow::Result<AgentHandle> {
    let mut advertised = NodeAddress::parse_flexible(&config.agent_address())
        .map_err(|e| anyhow::anyhow!("invalid agent address: {}", e))?;
    let bind_addr = config.agent_bind();
    let listener = bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind agent on {}: {}", bind_addr, e))?;
    let local_addr = listener.local_addr()?;
    if advertised.port == 0 {
        advertised.port = local_addr.port();
    }

    let sessions = SessionTable::new(config.max_sessions());
    let session_capacity = sessions.capacity();
    let agent = Arc::new(NodeAgent::new(
        advertised.clone(),
        config.tracker_address(),
        sessions,
        transport,
        output.clone(),
    ));

    output
        .write_line(&format!("Node agent started with address {}", advertised))
        .await;
    emit_system_event(
        "agent",
        LogLevel::Info,
        "agent_started",
        Some(format!(
            "{} (bound {}, max sessions {})",
            advertised, local_addr, session_capacity
        )),
    );

    let server = tokio::spawn(serve(
        listener,
        agent.clone(),
        ServeOptions::from_config(config, "agent"),
        shutdown.clone(),
    ));

    let (queue, source) = command_channel(COMMAND_QUEUE_CAPACITY);
    let mut tasks = Vec::new();
    {
        let agent = agent.clone();
        let poll = config.poll_interval();
        let shutdown = shutdown.clone();
        tasks.push(tokio::spawn(async move {
            agent.run_commands(source, poll, shutdown).await;
        }));
    }
    if config.submit_on_start() {
        let agent = agent.clone();
        tasks.push(tokio::spawn(async move {
            agent.submit_info().await;
        }));
    }
    if let Some(every) = config.heartbeat() {
        tasks.push(agent.spawn_heartbeat(every, shutdown.clone()));
    }

    Ok(AgentHandle {
        agent,
        local_addr,
        queue,
        shutdown,
        server,
        tasks,
    })
}
