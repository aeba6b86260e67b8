// src/network/loopback.rs
//
// In-process transport: routes a request straight into the handler
// registered for the target address. Used to wire several agents and a
// tracker together without sockets.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use crate::error::TransportError;
use crate::network::dispatcher::RequestHandler;
use crate::network::transport::Transport;

#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    routes: Arc<RwLock<HashMap<String, Arc<dyn RequestHandler>>>>,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, addr: impl Into<String>, handler: Arc<dyn RequestHandler>) {
        self.routes.write().insert(addr.into(), handler);
    }

    pub fn unregister(&self, addr: &str) {
        self.routes.write().remove(addr);
    }

    /// A transport whose requests appear to come from `caller`.
    pub fn transport(&self, caller: SocketAddr) -> LoopbackTransport {
        LoopbackTransport {
            network: self.clone(),
            caller,
        }
    }
}

#[derive(Clone)]
pub struct LoopbackTransport {
    network: LoopbackNetwork,
    caller: SocketAddr,
}

impl LoopbackTransport {
    pub fn anonymous(network: &LoopbackNetwork) -> Self {
        network.transport(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn request(&self, addr: &str, line: &str) -> Result<String, TransportError> {
        let handler = self.network.routes.read().get(addr).cloned();
        match handler {
            Some(handler) => Ok(handler.handle_line(line, self.caller).await),
            None => Err(TransportError::Connect {
                addr: addr.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "no handler registered",
                ),
            }),
        }
    }
}
