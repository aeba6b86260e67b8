// src/tracker/service.rs

use async_trait::async_trait;
use std::net::SocketAddr;

use crate::error::ProtocolError;
use crate::events::{emit_network_event, LogLevel};
use crate::network::dispatcher::RequestHandler;
use crate::network::message::{IpReply, TrackerErrorReply, TrackerRequest};
use crate::tracker::registry::TrackerRegistry;

/// Request handler of the tracker: `submit_info`, `get_list`, `get_ip`.
#[derive(Clone)]
pub struct TrackerService {
    registry: TrackerRegistry,
}

impl TrackerService {
    pub fn new(registry: TrackerRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TrackerRegistry {
        &self.registry
    }

    async fn dispatch(&self, request: TrackerRequest, caller: SocketAddr) -> String {
        match request {
            TrackerRequest::SubmitInfo(body) => self.registry.register(&body.address).await.to_json(),
            TrackerRequest::GetList => self.registry.list().await.to_json(),
            TrackerRequest::GetIp => serde_json::to_string(&IpReply {
                ip: self.registry.resolve_caller_ip(caller).to_string(),
            })
            .unwrap_or_else(|_| "{}".into()),
        }
    }
}

#[async_trait]
impl RequestHandler for TrackerService {
    async fn handle_line(&self, line: &str, caller: SocketAddr) -> String {
        match TrackerRequest::parse(line) {
            Ok(request) => self.dispatch(request, caller).await,
            Err(err) => {
                emit_network_event(
                    "tracker",
                    LogLevel::Warn,
                    "bad_request",
                    Some(caller.to_string()),
                    Some(err.to_string()),
                );
                self.error_reply(&err)
            }
        }
    }

    fn error_reply(&self, err: &ProtocolError) -> String {
        match err {
            ProtocolError::Empty | ProtocolError::UnknownTag(_) => {
                TrackerErrorReply::line("Unknown request")
            }
            other => TrackerErrorReply::line(format!("Invalid request: {}", other)),
        }
    }
}
