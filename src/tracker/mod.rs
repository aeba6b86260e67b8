//! Discovery tracker: a TTL-bounded registry of online nodes served over the
//! line protocol.

pub mod registry;
pub mod service;

pub use registry::{Clock, ManualClock, NodeRecord, NodeStatus, SystemClock, TrackerRegistry, TrackerSnapshot};
pub use service::TrackerService;

use crate::config::Config;
use crate::events::{emit_system_event, LogLevel};
use crate::network::listener::{bind, serve, ServeOptions};
use crate::shutdown::Shutdown;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A running tracker: accept loop plus background sweeper.
pub struct TrackerHandle {
    pub local_addr: SocketAddr,
    pub registry: TrackerRegistry,
    shutdown: Shutdown,
    server: JoinHandle<std::io::Result<()>>,
    sweeper: JoinHandle<()>,
}

impl TrackerHandle {
    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Wait for both loops to finish (after the shutdown flag is raised).
    pub async fn wait(self) -> anyhow::Result<()> {
        let served = self.server.await?;
        self.sweeper.await?;
        served?;
        Ok(())
    }
}

pub async fn start_tracker(config: &Config, shutdown: Shutdown) -> anyhow::Result<TrackerHandle> {
    let bind_addr = config.tracker_bind();
    let listener = bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind tracker on {}: {}", bind_addr, e))?;
    let local_addr = listener.local_addr()?;

    let registry = TrackerRegistry::new(config.ttl());
    let sweeper = registry.spawn_sweeper(config.sweep_interval(), shutdown.clone());
    let service = Arc::new(TrackerService::new(registry.clone()));
    let server = tokio::spawn(serve(
        listener,
        service,
        ServeOptions::from_config(config, "tracker"),
        shutdown.clone(),
    ));

    emit_system_event(
        "tracker",
        LogLevel::Info,
        "tracker_started",
        Some(format!("{} ttl={}s", local_addr, registry.ttl().as_secs())),
    );

    Ok(TrackerHandle {
        local_addr,
        registry,
        shutdown,
        server,
        sweeper,
    })
}
