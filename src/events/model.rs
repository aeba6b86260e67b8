use serde::Serialize;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn rank(self) -> u8 {
        match self {
            LogLevel::Trace => 0,
            LogLevel::Debug => 1,
            LogLevel::Info => 2,
            LogLevel::Warn => 3,
            LogLevel::Error => 4,
        }
    }

    /// Parse a level name as used in config files (`"info"`, `"warn"`, ...).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventMeta {
    pub ts: SystemTime,
    pub level: LogLevel,
    pub corr_id: Option<String>,
    pub session_id: String,
    pub component: &'static str,
    pub suppress_console: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkEvent {
    pub meta: EventMeta,
    pub action: String,
    pub addr: Option<String>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistryEvent {
    pub meta: EventMeta,
    pub action: String,
    pub node: Option<String>,
    /// Registry size after the action.
    pub size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionEvent {
    pub meta: EventMeta,
    pub action: String,
    pub peer: String,
    pub role: Option<&'static str>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandEvent {
    pub meta: EventMeta,
    pub command: String,
    pub outcome: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemEvent {
    pub meta: EventMeta,
    pub action: String,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEvent {
    Network(NetworkEvent),
    Registry(RegistryEvent),
    Session(SessionEvent),
    Command(CommandEvent),
    System(SystemEvent),
}

impl LogEvent {
    pub fn meta(&self) -> &EventMeta {
        match self {
            LogEvent::Network(e) => &e.meta,
            LogEvent::Registry(e) => &e.meta,
            LogEvent::Session(e) => &e.meta,
            LogEvent::Command(e) => &e.meta,
            LogEvent::System(e) => &e.meta,
        }
    }

    /// Action / command name, handy for filtering in tests and sinks.
    pub fn action(&self) -> &str {
        match self {
            LogEvent::Network(e) => &e.action,
            LogEvent::Registry(e) => &e.action,
            LogEvent::Session(e) => &e.action,
            LogEvent::Command(e) => &e.command,
            LogEvent::System(e) => &e.action,
        }
    }
}
