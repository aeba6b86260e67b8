// src/network/message.rs
//
// Line protocol: `<tag>:<json payload>` or a bare `<tag>`. The line is split
// on the first delimiter only; everything after it belongs to the payload.

use crate::constants::TAG_DELIMITER;
use crate::error::ProtocolError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

pub mod tags {
    pub const PEER_CONNECT: &str = "peer_connect";
    pub const CHAT: &str = "chat";
    pub const CHAT_MESSAGE: &str = "chat_message";
    pub const FILE_TRANSFER: &str = "file_transfer";
    pub const RESULT: &str = "result";
    pub const SUBMIT_INFO: &str = "submit_info";
    pub const GET_LIST: &str = "get_list";
    pub const GET_IP: &str = "get_ip";
}

/// A request line split into its tag and raw payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub tag: &'a str,
    pub payload: Option<&'a str>,
}

pub fn split_frame(line: &str) -> Result<Frame<'_>, ProtocolError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ProtocolError::Empty);
    }
    let frame = match line.split_once(TAG_DELIMITER) {
        Some((tag, payload)) => Frame {
            tag: tag.trim(),
            payload: Some(payload.trim()).filter(|p| !p.is_empty()),
        },
        None => Frame {
            tag: line,
            payload: None,
        },
    };
    Ok(frame)
}

fn decode<T: DeserializeOwned>(tag: &'static str, payload: Option<&str>) -> Result<T, ProtocolError> {
    let raw = payload.ok_or(ProtocolError::MissingPayload(tag))?;
    serde_json::from_str(raw).map_err(|source| ProtocolError::InvalidPayload { tag, source })
}

fn encode<T: Serialize>(tag: &str, body: &T) -> String {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".into());
    format!("{}{}{}", tag, TAG_DELIMITER, json)
}

/// Network address of a node. On the wire it is the JSON pair `[host, port]`;
/// as a map key or `from` field it is the `host:port` string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(String, u16)", into = "(String, u16)")]
pub struct NodeAddress {
    pub host: String,
    pub port: u16,
}

impl NodeAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Accepts `host:port`, a JSON string `"host:port"` or a JSON pair
    /// `["host", port]` (all forms the control channel has used).
    pub fn parse_flexible(raw: &str) -> Result<Self, ProtocolError> {
        let raw = raw.trim();
        if raw.starts_with('[') && raw.ends_with(']') && raw.contains(',') {
            if let Ok(addr) = serde_json::from_str::<NodeAddress>(raw) {
                return Ok(addr);
            }
        }
        if raw.starts_with('"') {
            if let Ok(Value::String(s)) = serde_json::from_str::<Value>(raw) {
                return s.parse();
            }
        }
        raw.parse()
    }
}

impl From<(String, u16)> for NodeAddress {
    fn from((host, port): (String, u16)) -> Self {
        Self { host, port }
    }
}

impl From<NodeAddress> for (String, u16) {
    fn from(addr: NodeAddress) -> Self {
        (addr.host, addr.port)
    }
}

impl From<SocketAddr> for NodeAddress {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for NodeAddress {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidAddress(s.to_string());
        let (host, port) = s.trim().rsplit_once(':').ok_or_else(invalid)?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(invalid());
        }
        let port = port.parse::<u16>().map_err(|_| invalid())?;
        Ok(Self::new(host, port))
    }
}

/// Payload of `peer_connect` and `submit_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressBody {
    pub address: NodeAddress,
}

/// `token` and `from` are kept as raw JSON so a request with credentials of
/// the wrong type still reaches the authorizer and is refused there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<Value>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Value>,
}

impl ChatBody {
    pub fn signed(token: impl Into<String>, message: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            token: Some(Value::String(token.into())),
            message: message.into(),
            from: Some(Value::String(from.into())),
        }
    }

    pub fn token_str(&self) -> Option<&str> {
        self.token.as_ref().and_then(Value::as_str)
    }

    pub fn sender_str(&self) -> Option<&str> {
        self.from.as_ref().and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileTransferBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<Value>,
    /// File descriptor document; `filename` plus arbitrary extra fields.
    #[serde(default)]
    pub file: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Value>,
}

impl FileTransferBody {
    pub fn signed(token: impl Into<String>, file: Map<String, Value>, from: impl Into<String>) -> Self {
        Self {
            token: Some(Value::String(token.into())),
            file,
            from: Some(Value::String(from.into())),
        }
    }

    pub fn token_str(&self) -> Option<&str> {
        self.token.as_ref().and_then(Value::as_str)
    }

    pub fn sender_str(&self) -> Option<&str> {
        self.from.as_ref().and_then(Value::as_str)
    }

    pub fn filename(&self) -> &str {
        self.file
            .get("filename")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERROR")]
    Error,
}

/// Body of every `result:` reply from a node agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBody {
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResultBody {
    pub const UNAUTHORIZED: &'static str = "Unauthorized";
    pub const UNKNOWN_REQUEST: &'static str = "Unknown request";

    pub fn token(token: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Ok,
            token: Some(token.into()),
            message: None,
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Ok,
            token: None,
            message: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Error,
            token: None,
            message: Some(message.into()),
        }
    }

    pub fn unauthorized() -> Self {
        Self::error(Self::UNAUTHORIZED)
    }

    pub fn invalid_request(err: &ProtocolError) -> Self {
        Self::error(format!("Invalid request: {}", err))
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResultStatus::Ok
    }

    pub fn message_or_default(&self) -> &str {
        self.message.as_deref().unwrap_or("no message")
    }

    pub fn to_line(&self) -> String {
        encode(tags::RESULT, self)
    }

    /// Parse a reply line; anything other than a well-formed `result:` frame is
    /// a protocol error.
    pub fn parse_line(line: &str) -> Result<Self, ProtocolError> {
        let frame = split_frame(line)?;
        if frame.tag != tags::RESULT {
            return Err(ProtocolError::UnknownTag(frame.tag.to_string()));
        }
        decode(tags::RESULT, frame.payload)
    }
}

/// Requests understood by a node agent.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentRequest {
    PeerConnect(AddressBody),
    Chat(ChatBody),
    FileTransfer(FileTransferBody),
    Result(ResultBody),
}

impl AgentRequest {
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let frame = split_frame(line)?;
        match frame.tag {
            tags::PEER_CONNECT => Ok(Self::PeerConnect(decode(tags::PEER_CONNECT, frame.payload)?)),
            tags::CHAT | tags::CHAT_MESSAGE => Ok(Self::Chat(decode(tags::CHAT, frame.payload)?)),
            tags::FILE_TRANSFER => Ok(Self::FileTransfer(decode(
                tags::FILE_TRANSFER,
                frame.payload,
            )?)),
            tags::RESULT => Ok(Self::Result(decode(tags::RESULT, frame.payload)?)),
            other => Err(ProtocolError::UnknownTag(other.to_string())),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::PeerConnect(_) => tags::PEER_CONNECT,
            Self::Chat(_) => tags::CHAT_MESSAGE,
            Self::FileTransfer(_) => tags::FILE_TRANSFER,
            Self::Result(_) => tags::RESULT,
        }
    }

    pub fn to_line(&self) -> String {
        match self {
            Self::PeerConnect(body) => encode(self.tag(), body),
            Self::Chat(body) => encode(self.tag(), body),
            Self::FileTransfer(body) => encode(self.tag(), body),
            Self::Result(body) => body.to_line(),
        }
    }
}

/// Requests understood by the tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerRequest {
    SubmitInfo(AddressBody),
    GetList,
    GetIp,
}

impl TrackerRequest {
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let frame = split_frame(line)?;
        match frame.tag {
            tags::SUBMIT_INFO => Ok(Self::SubmitInfo(decode(tags::SUBMIT_INFO, frame.payload)?)),
            // Trailing payload on get_list is accepted and ignored.
            tags::GET_LIST => Ok(Self::GetList),
            tags::GET_IP => Ok(Self::GetIp),
            other => Err(ProtocolError::UnknownTag(other.to_string())),
        }
    }

    pub fn to_line(&self) -> String {
        match self {
            Self::SubmitInfo(body) => encode(tags::SUBMIT_INFO, body),
            Self::GetList => encode(tags::GET_LIST, &Map::new()),
            Self::GetIp => tags::GET_IP.to_string(),
        }
    }
}

/// Reply to `get_ip`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpReply {
    pub ip: String,
}

/// Tracker-side error document (`{"error": "..."}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerErrorReply {
    pub error: String,
}

impl TrackerErrorReply {
    pub fn line(message: impl Into<String>) -> String {
        serde_json::to_string(&TrackerErrorReply {
            error: message.into(),
        })
        .unwrap_or_else(|_| "{}".into())
    }
}
