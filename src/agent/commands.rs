// src/agent/commands.rs
// Control-channel commands and the typed queue that carries them to the
// agent's run loop.

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::error::CommandError;
use crate::network::message::NodeAddress;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Exit,
    SubmitInfo,
    GetList,
    GetIp,
    PeerConnect(NodeAddress),
    Chat { peer: NodeAddress, message: String },
    File { peer: NodeAddress, file: Map<String, Value> },
}

#[derive(Deserialize)]
struct ChatArgs {
    peer: Value,
    message: String,
}

#[derive(Deserialize)]
struct FileArgs {
    peer: Value,
    file: Map<String, Value>,
}

fn peer_from_value(value: &Value) -> Result<NodeAddress, String> {
    NodeAddress::parse_flexible(&value.to_string()).map_err(|e| e.to_string())
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        match line {
            "exit" => return Ok(Command::Exit),
            "submit_info" => return Ok(Command::SubmitInfo),
            "get_list" => return Ok(Command::GetList),
            "get_ip" => return Ok(Command::GetIp),
            _ => {}
        }
        if let Some(raw) = line.strip_prefix("peer_connect:") {
            return NodeAddress::parse_flexible(raw)
                .map(Command::PeerConnect)
                .map_err(|e| CommandError::Invalid {
                    command: "peer_connect",
                    reason: e.to_string(),
                });
        }
        if let Some(raw) = line.strip_prefix("chat:") {
            let invalid = |reason: String| CommandError::Invalid {
                command: "chat",
                reason,
            };
            let args: ChatArgs = serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?;
            let peer = peer_from_value(&args.peer).map_err(invalid)?;
            return Ok(Command::Chat {
                peer,
                message: args.message,
            });
        }
        if let Some(raw) = line.strip_prefix("file:") {
            let invalid = |reason: String| CommandError::Invalid {
                command: "file transfer",
                reason,
            };
            let args: FileArgs = serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?;
            let peer = peer_from_value(&args.peer).map_err(invalid)?;
            return Ok(Command::File {
                peer,
                file: args.file,
            });
        }
        Err(CommandError::Unknown(line.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Exit => "exit",
            Command::SubmitInfo => "submit_info",
            Command::GetList => "get_list",
            Command::GetIp => "get_ip",
            Command::PeerConnect(_) => "peer_connect",
            Command::Chat { .. } => "chat",
            Command::File { .. } => "file",
        }
    }

    /// Textual form accepted by [`Command::parse`].
    pub fn to_line(&self) -> String {
        match self {
            Command::Exit | Command::SubmitInfo | Command::GetList | Command::GetIp => {
                self.name().to_string()
            }
            Command::PeerConnect(addr) => format!("peer_connect:{}", addr),
            Command::Chat { peer, message } => format!(
                "chat:{}",
                serde_json::json!({ "peer": peer.to_string(), "message": message })
            ),
            Command::File { peer, file } => format!(
                "file:{}",
                serde_json::json!({ "peer": peer.to_string(), "file": file })
            ),
        }
    }
}

pub type CommandItem = Result<Command, CommandError>;

/// Non-blocking source polled once per run-loop tick.
pub trait CommandSource: Send {
    fn try_next(&mut self) -> Option<CommandItem>;
}

/// Producer half of the command channel.
#[derive(Clone)]
pub struct CommandQueue {
    tx: mpsc::Sender<CommandItem>,
}

impl CommandQueue {
    /// Parse and enqueue a raw line. Blank lines are skipped. Returns false
    /// once the agent is gone.
    pub async fn push_line(&self, line: &str) -> bool {
        if line.trim().is_empty() {
            return true;
        }
        self.tx.send(Command::parse(line)).await.is_ok()
    }

    pub async fn push(&self, command: Command) -> bool {
        self.tx.send(Ok(command)).await.is_ok()
    }

    /// For producers living on plain threads (the interactive prompt).
    pub fn blocking_push_line(&self, line: &str) -> bool {
        if line.trim().is_empty() {
            return true;
        }
        self.tx.blocking_send(Command::parse(line)).is_ok()
    }
}

pub struct ChannelCommandSource {
    rx: mpsc::Receiver<CommandItem>,
}

impl CommandSource for ChannelCommandSource {
    fn try_next(&mut self) -> Option<CommandItem> {
        match self.rx.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

pub fn command_channel(capacity: usize) -> (CommandQueue, ChannelCommandSource) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (CommandQueue { tx }, ChannelCommandSource { rx })
}
