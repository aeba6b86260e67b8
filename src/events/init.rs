use crate::config::LoggingConfig;
use crate::events::dispatcher::init_events;
use crate::events::model::LogLevel;
use crate::events::sink::{ConsoleSink, JsonFileSink, LogSink};
use std::sync::Arc;

/// Build the console and JSON file sinks from `[logging]` and install the
/// dispatcher. Missing settings fall back to console at info plus
/// `logs/nodetrack.jsonl`.
pub async fn init_events_from_config(logging: Option<&LoggingConfig>) {
    let mut sinks: Vec<Arc<dyn LogSink>> = Vec::new();

    let disable_console = logging.and_then(|l| l.disable_console).unwrap_or(false);
    if !disable_console {
        let min_level = logging
            .and_then(|l| l.console_level.as_deref())
            .and_then(LogLevel::parse)
            .unwrap_or(LogLevel::Info);
        sinks.push(Arc::new(ConsoleSink::new(Some(min_level))));
    }

    let json_path = logging
        .and_then(|l| l.json_path.clone())
        .unwrap_or_else(|| "logs/nodetrack.jsonl".into());
    let max_bytes = logging
        .and_then(|l| l.json_max_bytes)
        .unwrap_or(5 * 1024 * 1024);
    let rotate = logging.and_then(|l| l.json_rotate).unwrap_or(3);
    if let Ok(json_sink) = JsonFileSink::new(&json_path, true, max_bytes as u64, rotate).await {
        sinks.push(Arc::new(json_sink));
    }
    init_events(sinks, 1024).await;
}
