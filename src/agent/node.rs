// src/agent/node.rs

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::agent::authorizer::{canonical_sender, MessageAuthorizer};
use crate::agent::commands::{Command, CommandSource};
use crate::agent::handshake::PeerHandshakeManager;
use crate::agent::output::OutputSink;
use crate::agent::session::{SessionTable, Token};
use crate::error::{HandshakeError, ProtocolError, StateError, TransportError};
use crate::events::{emit_command_event, emit_network_event, emit_session_event, LogLevel};
use crate::network::dispatcher::RequestHandler;
use crate::network::message::{
    AddressBody, AgentRequest, ChatBody, FileTransferBody, IpReply, NodeAddress, ResultBody,
    TrackerRequest,
};
use crate::network::transport::Transport;
use crate::shutdown::Shutdown;
use crate::tracker::registry::TrackerSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandFlow {
    Continue,
    Exit,
}

/// A peer node: serves `peer_connect`, `chat` and `file_transfer`, and acts
/// on control commands (handshakes, sends, tracker queries).
pub struct NodeAgent {
    local: NodeAddress,
    tracker: String,
    handshakes: PeerHandshakeManager,
    authorizer: MessageAuthorizer,
    transport: Arc<dyn Transport>,
    output: Arc<dyn OutputSink>,
    tracker_view: Mutex<TrackerSnapshot>,
}

impl NodeAgent {
    pub fn new(
        local: NodeAddress,
        tracker: impl Into<String>,
        sessions: SessionTable,
        transport: Arc<dyn Transport>,
        output: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            handshakes: PeerHandshakeManager::new(local.clone(), sessions.clone(), transport.clone()),
            authorizer: MessageAuthorizer::new(sessions),
            local,
            tracker: tracker.into(),
            transport,
            output,
            tracker_view: Mutex::new(TrackerSnapshot::default()),
        }
    }

    pub fn local(&self) -> &NodeAddress {
        &self.local
    }

    pub fn handshakes(&self) -> &PeerHandshakeManager {
        &self.handshakes
    }

    pub fn authorizer(&self) -> &MessageAuthorizer {
        &self.authorizer
    }

    pub fn sessions(&self) -> &SessionTable {
        self.handshakes.sessions()
    }

    /// Last snapshot received from the tracker.
    pub fn tracker_view(&self) -> TrackerSnapshot {
        self.tracker_view.lock().clone()
    }

    async fn report(&self, line: impl AsRef<str>) {
        self.output.write_line(line.as_ref()).await;
    }

    // ---- outbound: peers ----

    pub async fn connect_peer(&self, peer: &NodeAddress) -> Result<Token, HandshakeError> {
        let result = self.handshakes.initiate_connect(peer).await;
        match &result {
            Ok(_) => self.report(format!("Connected to peer {}", peer)).await,
            Err(HandshakeError::Rejected(msg)) => {
                self.report(format!("Failed to connect to peer {}: {}", peer, msg))
                    .await
            }
            Err(HandshakeError::UnexpectedReply(_)) => {
                self.report(format!("Invalid response from peer {}", peer)).await
            }
            Err(HandshakeError::Transport(e)) => {
                self.report(format!("Error in peer_connect: {}", e)).await
            }
        }
        result
    }

    async fn session_token(&self, peer: &NodeAddress) -> Result<Token, StateError> {
        self.sessions()
            .token_for(&peer.to_string())
            .await
            .ok_or_else(|| StateError::UnknownPeer(peer.to_string()))
    }

    async fn send_to_peer(&self, peer: &NodeAddress, request: AgentRequest) -> Result<String, TransportError> {
        self.transport
            .request(&peer.to_string(), &request.to_line())
            .await
    }

    pub async fn send_chat(&self, peer: &NodeAddress, message: &str) {
        let token = match self.session_token(peer).await {
            Ok(token) => token,
            Err(e) => return self.report(format!("Error: {}", e)).await,
        };
        let request = AgentRequest::Chat(ChatBody::signed(token.to_string(), message, self.local.to_string()));
        match self.send_to_peer(peer, request).await {
            Ok(reply) => match ResultBody::parse_line(&reply) {
                Ok(result) if result.is_ok() => {
                    self.report(format!("Message sent to {}", peer)).await
                }
                Ok(result) => {
                    self.report(format!(
                        "Message to {} rejected: {}",
                        peer,
                        result.message_or_default()
                    ))
                    .await
                }
                Err(_) => self.report(format!("Invalid response from peer {}", peer)).await,
            },
            Err(e) => self.report(format!("Error in chat: {}", e)).await,
        }
    }

    pub async fn send_file(&self, peer: &NodeAddress, file: Map<String, Value>) {
        let token = match self.session_token(peer).await {
            Ok(token) => token,
            Err(e) => return self.report(format!("Error: {}", e)).await,
        };
        let request = AgentRequest::FileTransfer(FileTransferBody::signed(
            token.to_string(),
            file,
            self.local.to_string(),
        ));
        match self.send_to_peer(peer, request).await {
            Ok(reply) => match ResultBody::parse_line(&reply) {
                Ok(result) if result.is_ok() => self.report(format!("File sent to {}", peer)).await,
                Ok(result) => {
                    self.report(format!(
                        "File to {} rejected: {}",
                        peer,
                        result.message_or_default()
                    ))
                    .await
                }
                Err(_) => self.report(format!("Invalid response from peer {}", peer)).await,
            },
            Err(e) => self.report(format!("Error in file transfer: {}", e)).await,
        }
    }

    // ---- outbound: tracker ----

    async fn ask_tracker(&self, request: TrackerRequest) -> Result<String, TransportError> {
        self.transport.request(&self.tracker, &request.to_line()).await
    }

    async fn fetch_snapshot(&self, request: TrackerRequest) -> Result<Option<TrackerSnapshot>, TransportError> {
        let reply = self.ask_tracker(request).await?;
        match TrackerSnapshot::from_json(&reply) {
            Ok(snapshot) => {
                *self.tracker_view.lock() = snapshot.clone();
                Ok(Some(snapshot))
            }
            Err(e) => {
                emit_network_event(
                    "agent",
                    LogLevel::Warn,
                    "tracker_reply_invalid",
                    Some(self.tracker.clone()),
                    Some(e.to_string()),
                );
                Ok(None)
            }
        }
    }

    fn submit_request(&self) -> TrackerRequest {
        TrackerRequest::SubmitInfo(AddressBody {
            address: self.local.clone(),
        })
    }

    pub async fn submit_info(&self) {
        match self.fetch_snapshot(self.submit_request()).await {
            Ok(Some(snapshot)) => {
                self.report(format!("Tracker update: {} nodes online", snapshot.len()))
                    .await
            }
            Ok(None) => self.report("Invalid response from tracker").await,
            Err(e) => self.report(format!("Error contacting tracker: {}", e)).await,
        }
    }

    pub async fn get_list(&self) {
        match self.fetch_snapshot(TrackerRequest::GetList).await {
            Ok(Some(snapshot)) => {
                self.report(format!("Tracker list: {}", snapshot.to_json()))
                    .await
            }
            Ok(None) => self.report("Invalid response from tracker").await,
            Err(e) => self.report(format!("Error contacting tracker: {}", e)).await,
        }
    }

    pub async fn get_ip(&self) {
        match self.ask_tracker(TrackerRequest::GetIp).await {
            Ok(reply) => match serde_json::from_str::<IpReply>(&reply) {
                Ok(ip) => self.report(format!("Tracker sees address {}", ip.ip)).await,
                Err(_) => self.report("Invalid response from tracker").await,
            },
            Err(e) => self.report(format!("Error contacting tracker: {}", e)).await,
        }
    }

    /// Re-submit without writing to the output sink.
    pub async fn refresh_tracker(&self) -> bool {
        matches!(self.fetch_snapshot(self.submit_request()).await, Ok(Some(_)))
    }

    // ---- control channel ----

    pub async fn execute(&self, command: Command) -> CommandFlow {
        let name = command.name();
        emit_command_event(LogLevel::Debug, name, "start");
        let flow = match command {
            Command::Exit => CommandFlow::Exit,
            Command::SubmitInfo => {
                self.submit_info().await;
                CommandFlow::Continue
            }
            Command::GetList => {
                self.get_list().await;
                CommandFlow::Continue
            }
            Command::GetIp => {
                self.get_ip().await;
                CommandFlow::Continue
            }
            Command::PeerConnect(peer) => {
                let _ = self.connect_peer(&peer).await;
                CommandFlow::Continue
            }
            Command::Chat { peer, message } => {
                self.send_chat(&peer, &message).await;
                CommandFlow::Continue
            }
            Command::File { peer, file } => {
                self.send_file(&peer, file).await;
                CommandFlow::Continue
            }
        };
        emit_command_event(LogLevel::Info, name, "done");
        flow
    }

    /// Poll `source` every `poll` and run at most one command per tick. An
    /// `exit` command raises `shutdown`. A command already taken from the
    /// source always runs to completion; anything still queued when the loop
    /// stops is reported as dropped.
    pub async fn run_commands<S>(&self, mut source: S, poll: Duration, shutdown: Shutdown)
    where
        S: CommandSource,
    {
        self.run_until_stopped(&mut source, poll, &shutdown).await;
        self.drop_pending(&mut source).await;
    }

    async fn run_until_stopped<S>(&self, source: &mut S, poll: Duration, shutdown: &Shutdown)
    where
        S: CommandSource,
    {
        let mut ticker = tokio::time::interval(poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.triggered() => break,
                _ = ticker.tick() => {}
            }
            match source.try_next() {
                Some(Ok(command)) => {
                    if self.execute(command).await == CommandFlow::Exit {
                        emit_command_event(LogLevel::Info, "exit", "shutdown");
                        shutdown.trigger();
                        break;
                    }
                }
                Some(Err(e)) => {
                    emit_command_event(LogLevel::Warn, "invalid", &e.to_string());
                    self.report(e.to_string()).await;
                }
                None => {}
            }
        }
    }

    async fn drop_pending<S>(&self, source: &mut S)
    where
        S: CommandSource,
    {
        while let Some(item) = source.try_next() {
            let name = match &item {
                Ok(command) => command.name(),
                Err(_) => "invalid",
            };
            emit_command_event(LogLevel::Warn, name, "dropped");
            self.report(format!("Dropped {}: agent shutting down", name)).await;
        }
    }

    pub fn spawn_heartbeat(self: &Arc<Self>, every: Duration, shutdown: Shutdown) -> JoinHandle<()> {
        let agent = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.triggered() => break,
                    _ = ticker.tick() => {
                        if !agent.refresh_tracker().await {
                            emit_network_event(
                                "agent",
                                LogLevel::Warn,
                                "heartbeat_failed",
                                Some(agent.tracker.clone()),
                                None,
                            );
                        }
                    }
                }
            }
        })
    }

    // ---- inbound ----

    async fn on_peer_connect(&self, body: AddressBody) -> ResultBody {
        let token = self.handshakes.handle_inbound_connect(&body.address).await;
        self.report(format!("Peer {} connected", body.address)).await;
        ResultBody::token(token.to_string())
    }

    async fn on_chat(&self, body: ChatBody) -> ResultBody {
        match self
            .authorizer
            .check_json(body.from.as_ref(), body.token.as_ref())
            .await
        {
            Ok(from) => {
                self.report(format!("CHAT:{}:{}", from, body.message)).await;
                ResultBody::ok("Message received")
            }
            Err(e) => {
                let from = body.sender_str().map(canonical_sender);
                emit_session_event(
                    LogLevel::Warn,
                    "chat_unauthorized",
                    from.as_deref().unwrap_or("unknown"),
                    None,
                    Some(e.to_string()),
                );
                ResultBody::unauthorized()
            }
        }
    }

    async fn on_file(&self, body: FileTransferBody) -> ResultBody {
        match self
            .authorizer
            .check_json(body.from.as_ref(), body.token.as_ref())
            .await
        {
            Ok(from) => {
                let file = serde_json::to_string(&body.file).unwrap_or_else(|_| "{}".into());
                emit_session_event(
                    LogLevel::Info,
                    "file_received",
                    &from,
                    None,
                    Some(body.filename().to_string()),
                );
                self.report(format!("FILE:{}:{}", from, file)).await;
                ResultBody::ok("File received")
            }
            Err(e) => {
                let from = body.sender_str().map(canonical_sender);
                emit_session_event(
                    LogLevel::Warn,
                    "file_unauthorized",
                    from.as_deref().unwrap_or("unknown"),
                    None,
                    Some(e.to_string()),
                );
                ResultBody::unauthorized()
            }
        }
    }
}

#[async_trait]
impl RequestHandler for NodeAgent {
    async fn handle_line(&self, line: &str, caller: SocketAddr) -> String {
        let request = match AgentRequest::parse(line) {
            Ok(request) => request,
            Err(err) => {
                emit_network_event(
                    "agent",
                    LogLevel::Warn,
                    "bad_request",
                    Some(caller.to_string()),
                    Some(err.to_string()),
                );
                return self.error_reply(&err);
            }
        };
        let reply = match request {
            AgentRequest::PeerConnect(body) => self.on_peer_connect(body).await,
            AgentRequest::Chat(body) => self.on_chat(body).await,
            AgentRequest::FileTransfer(body) => self.on_file(body).await,
            AgentRequest::Result(_) => ResultBody::error(ResultBody::UNKNOWN_REQUEST),
        };
        reply.to_line()
    }

    fn error_reply(&self, err: &ProtocolError) -> String {
        let body = match err {
            ProtocolError::Empty | ProtocolError::UnknownTag(_) => {
                ResultBody::error(ResultBody::UNKNOWN_REQUEST)
            }
            other => ResultBody::invalid_request(other),
        };
        body.to_line()
    }
}
