// src/agent/session.rs
// Peer session table: one session per peer address, bounded.

use crate::constants::TOKEN_BYTES;
use rand::RngCore;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;

/// Opaque session credential minted by the handshake responder.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Token(hex::encode(bytes))
    }

    /// Byte-for-byte comparison in constant time.
    pub fn matches(&self, supplied: &str) -> bool {
        self.0.as_bytes().ct_eq(supplied.as_bytes()).into()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Token(s)
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Token(s.to_string())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Never print credentials in debug output.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "Token({}..)", prefix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    Initiator,
    Responder,
}

impl SessionRole {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionRole::Initiator => "initiator",
            SessionRole::Responder => "responder",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeState {
    Unconnected,
    Pending,
    Connected,
    Failed,
}

#[derive(Debug, Clone)]
pub struct PeerSession {
    pub peer_address: String,
    pub token: Token,
    pub role: SessionRole,
    /// Insertion order, used for capacity eviction.
    seq: u64,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, PeerSession>,
    states: HashMap<String, HandshakeState>,
    next_seq: u64,
}

#[derive(Clone)]
pub struct SessionTable {
    inner: Arc<Mutex<Inner>>,
    capacity: usize,
}

impl SessionTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Store a session for `peer`, replacing any previous one. When a new
    /// peer arrives at a full table the oldest session is evicted and its
    /// address returned.
    pub async fn insert(&self, peer: &str, token: Token, role: SessionRole) -> Option<String> {
        let mut inner = self.inner.lock().await;
        let mut evicted = None;
        if !inner.sessions.contains_key(peer) && inner.sessions.len() >= self.capacity {
            let oldest = inner
                .sessions
                .values()
                .min_by_key(|s| s.seq)
                .map(|s| s.peer_address.clone());
            if let Some(oldest) = oldest {
                inner.sessions.remove(&oldest);
                inner.states.remove(&oldest);
                evicted = Some(oldest);
            }
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.sessions.insert(
            peer.to_string(),
            PeerSession {
                peer_address: peer.to_string(),
                token,
                role,
                seq,
            },
        );
        inner
            .states
            .insert(peer.to_string(), HandshakeState::Connected);
        evicted
    }

    pub async fn lookup(&self, peer: &str) -> Option<PeerSession> {
        self.inner.lock().await.sessions.get(peer).cloned()
    }

    pub async fn token_for(&self, peer: &str) -> Option<Token> {
        self.lookup(peer).await.map(|s| s.token)
    }

    pub async fn state(&self, peer: &str) -> HandshakeState {
        self.inner
            .lock()
            .await
            .states
            .get(peer)
            .cloned()
            .unwrap_or(HandshakeState::Unconnected)
    }

    pub async fn mark_pending(&self, peer: &str) {
        self.inner
            .lock()
            .await
            .states
            .insert(peer.to_string(), HandshakeState::Pending);
    }

    /// A failed attempt leaves any earlier session intact; the state only
    /// reports `Failed` while no session exists.
    pub async fn mark_failed(&self, peer: &str) {
        let mut inner = self.inner.lock().await;
        let state = if inner.sessions.contains_key(peer) {
            HandshakeState::Connected
        } else {
            HandshakeState::Failed
        };
        inner.states.insert(peer.to_string(), state);
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.sessions.is_empty()
    }

    pub async fn peers(&self) -> Vec<String> {
        let mut peers: Vec<String> = self.inner.lock().await.sessions.keys().cloned().collect();
        peers.sort();
        peers
    }
}
