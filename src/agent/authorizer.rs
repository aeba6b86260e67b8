// src/agent/authorizer.rs

use serde_json::Value;

use crate::agent::session::SessionTable;
use crate::error::AuthorizationError;
use crate::network::message::NodeAddress;

/// Gate for chat and file deliveries: the sender must name a known session
/// and present exactly that session's token.
#[derive(Clone)]
pub struct MessageAuthorizer {
    sessions: SessionTable,
}

impl MessageAuthorizer {
    pub fn new(sessions: SessionTable) -> Self {
        Self { sessions }
    }

    pub async fn check(&self, from: Option<&str>, token: Option<&str>) -> Result<(), AuthorizationError> {
        let (from, token) = match (from, token) {
            (Some(from), Some(token)) => (from, token),
            _ => return Err(AuthorizationError::MissingCredentials),
        };
        let session = self
            .sessions
            .lookup(from)
            .await
            .ok_or_else(|| AuthorizationError::UnknownSender(from.to_string()))?;
        if session.token.matches(token) {
            Ok(())
        } else {
            Err(AuthorizationError::TokenMismatch(from.to_string()))
        }
    }

    pub async fn authorize(&self, from: Option<&str>, token: Option<&str>) -> bool {
        self.check(from, token).await.is_ok()
    }

    /// Check credentials as they arrived in a request body. A non-string
    /// `from` is an unknown sender and a non-string token never matches.
    /// Returns the canonical sender on success.
    pub async fn check_json(
        &self,
        from: Option<&Value>,
        token: Option<&Value>,
    ) -> Result<String, AuthorizationError> {
        let (from, token) = match (from, token) {
            (Some(from), Some(token)) => (from, token),
            _ => return Err(AuthorizationError::MissingCredentials),
        };
        let sender = from
            .as_str()
            .map(canonical_sender)
            .ok_or_else(|| AuthorizationError::UnknownSender(from.to_string()))?;
        match token.as_str() {
            Some(token) => self.check(Some(&sender), Some(token)).await?,
            None if self.sessions.lookup(&sender).await.is_some() => {
                return Err(AuthorizationError::TokenMismatch(sender))
            }
            None => return Err(AuthorizationError::UnknownSender(sender)),
        }
        Ok(sender)
    }
}

/// Session keys are canonical `host:port`; senders are normalised to match.
pub fn canonical_sender(raw: &str) -> String {
    raw.parse::<NodeAddress>()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| raw.to_string())
}
