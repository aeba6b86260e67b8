pub mod dispatcher;
pub mod init;
pub mod model;
pub mod sink;

pub use dispatcher::*;
pub use init::*;
pub use model::*;
pub use sink::*;

/// Emit a structured network event (connections, requests, transport failures).
pub fn emit_network_event(
    component: &'static str,
    level: LogLevel,
    action: &str,
    addr: Option<String>,
    detail: Option<String>,
) {
    let mut meta = dispatcher::meta(component, level);
    meta.corr_id = Some(dispatcher::correlation_id());
    dispatcher::emit(LogEvent::Network(NetworkEvent {
        meta,
        action: action.to_string(),
        addr,
        detail,
    }));
}

/// Emit a tracker registry event (register, prune, sweep).
pub fn emit_registry_event(level: LogLevel, action: &str, node: Option<String>, size: usize) {
    let meta = dispatcher::meta("registry", level);
    dispatcher::emit(LogEvent::Registry(RegistryEvent {
        meta,
        action: action.to_string(),
        node,
        size,
    }));
}

/// Emit a peer session / authorization event.
pub fn emit_session_event(
    level: LogLevel,
    action: &str,
    peer: &str,
    role: Option<&'static str>,
    detail: Option<String>,
) {
    let mut meta = dispatcher::meta("session", level);
    meta.corr_id = Some(dispatcher::correlation_id());
    dispatcher::emit(LogEvent::Session(SessionEvent {
        meta,
        action: action.to_string(),
        peer: peer.to_string(),
        role,
        detail,
    }));
}

/// Emit a control-channel command event.
pub fn emit_command_event(level: LogLevel, command: &str, outcome: &str) {
    let meta = dispatcher::meta("command", level);
    dispatcher::emit(LogEvent::Command(CommandEvent {
        meta,
        command: command.to_string(),
        outcome: outcome.to_string(),
    }));
}

pub fn emit_system_event(component: &'static str, level: LogLevel, action: &str, detail: Option<String>) {
    let mut meta = dispatcher::meta(component, level);
    meta.corr_id = Some(dispatcher::correlation_id());
    dispatcher::emit(LogEvent::System(SystemEvent {
        meta,
        action: action.to_string(),
        detail,
    }));
}
