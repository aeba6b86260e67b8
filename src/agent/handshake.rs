// src/agent/handshake.rs

use std::sync::Arc;

use crate::agent::session::{HandshakeState, SessionRole, SessionTable, Token};
use crate::error::HandshakeError;
use crate::events::{emit_session_event, LogLevel};
use crate::network::message::{AddressBody, AgentRequest, NodeAddress, ResultBody};
use crate::network::transport::Transport;

/// Both sides of the `peer_connect` exchange.
///
/// Initiator: `Unconnected -> Pending -> Connected | Failed`.
/// Responder: `Unconnected -> Connected`, accepted immediately.
#[derive(Clone)]
pub struct PeerHandshakeManager {
    local: NodeAddress,
    sessions: SessionTable,
    transport: Arc<dyn Transport>,
}

impl PeerHandshakeManager {
    pub fn new(local: NodeAddress, sessions: SessionTable, transport: Arc<dyn Transport>) -> Self {
        Self {
            local,
            sessions,
            transport,
        }
    }

    pub fn local(&self) -> &NodeAddress {
        &self.local
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    pub async fn state(&self, peer: &NodeAddress) -> HandshakeState {
        self.sessions.state(&peer.to_string()).await
    }

    /// Send our address to `peer` and store the token it hands back. Nothing
    /// is stored unless the reply is a well-formed `OK` carrying a token.
    pub async fn initiate_connect(&self, peer: &NodeAddress) -> Result<Token, HandshakeError> {
        let key = peer.to_string();
        self.sessions.mark_pending(&key).await;
        emit_session_event(LogLevel::Debug, "handshake_pending", &key, Some("initiator"), None);

        let request = AgentRequest::PeerConnect(AddressBody {
            address: self.local.clone(),
        });
        let outcome = self.exchange(&key, &request.to_line()).await;

        match outcome {
            Ok(token) => {
                if let Some(evicted) = self
                    .sessions
                    .insert(&key, token.clone(), SessionRole::Initiator)
                    .await
                {
                    emit_session_event(LogLevel::Info, "session_evicted", &evicted, None, None);
                }
                emit_session_event(
                    LogLevel::Info,
                    "handshake_connected",
                    &key,
                    Some(SessionRole::Initiator.as_str()),
                    None,
                );
                Ok(token)
            }
            Err(err) => {
                self.sessions.mark_failed(&key).await;
                emit_session_event(
                    LogLevel::Warn,
                    "handshake_failed",
                    &key,
                    Some(SessionRole::Initiator.as_str()),
                    Some(err.to_string()),
                );
                Err(err)
            }
        }
    }

    async fn exchange(&self, addr: &str, line: &str) -> Result<Token, HandshakeError> {
        let reply = self.transport.request(addr, line).await?;
        let result =
            ResultBody::parse_line(&reply).map_err(|_| HandshakeError::UnexpectedReply(reply.clone()))?;
        if !result.is_ok() {
            return Err(HandshakeError::Rejected(
                result.message_or_default().to_string(),
            ));
        }
        match result.token {
            Some(token) if !token.is_empty() => Ok(Token::from(token)),
            _ => Err(HandshakeError::UnexpectedReply(reply)),
        }
    }

    /// Accept an inbound handshake unconditionally and mint a fresh token.
    pub async fn handle_inbound_connect(&self, sender: &NodeAddress) -> Token {
        let key = sender.to_string();
        let token = Token::generate();
        if let Some(evicted) = self
            .sessions
            .insert(&key, token.clone(), SessionRole::Responder)
            .await
        {
            emit_session_event(LogLevel::Info, "session_evicted", &evicted, None, None);
        }
        emit_session_event(
            LogLevel::Info,
            "handshake_accepted",
            &key,
            Some(SessionRole::Responder.as_str()),
            None,
        );
        token
    }
}
