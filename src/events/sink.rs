use crate::{
    constants::ICON_PLACEHOLDER,
    events::model::{LogEvent, LogLevel},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

#[async_trait]
pub trait LogSink: Send + Sync {
    async fn handle(&self, event: &LogEvent);
    async fn flush(&self) {}
}

pub struct ConsoleSink {
    level_filter: Option<LogLevel>,
}

impl ConsoleSink {
    pub fn new(level_filter: Option<LogLevel>) -> Self {
        Self { level_filter }
    }
}

#[async_trait]
impl LogSink for ConsoleSink {
    async fn handle(&self, event: &LogEvent) {
        let meta = event.meta();
        if meta.suppress_console {
            return;
        }
        if let Some(min) = self.level_filter {
            if meta.level.rank() < min.rank() {
                return;
            }
        }
        match event {
            LogEvent::Network(n) => {
                println!(
                    "{}NET [{}] action={} addr={:?} detail={:?} corr={:?}",
                    ICON_PLACEHOLDER, n.meta.component, n.action, n.addr, n.detail, n.meta.corr_id
                );
            }
            LogEvent::Registry(r) => {
                println!(
                    "{}REG action={} node={:?} size={}",
                    ICON_PLACEHOLDER, r.action, r.node, r.size
                );
            }
            LogEvent::Session(s) => {
                println!(
                    "{}SESSION action={} peer={} role={:?} detail={:?} corr={:?}",
                    ICON_PLACEHOLDER, s.action, s.peer, s.role, s.detail, s.meta.corr_id
                );
            }
            LogEvent::Command(c) => {
                println!(
                    "{}CMD command={} outcome={}",
                    ICON_PLACEHOLDER, c.command, c.outcome
                );
            }
            LogEvent::System(s) => {
                println!(
                    "{}SYS [{}] action={} detail={:?}",
                    ICON_PLACEHOLDER, s.meta.component, s.action, s.detail
                );
            }
        }
    }
}

/// Appends events as JSON lines to `<path>`, rolling over to `<path>.1`,
/// `<path>.2`, ... once the active file reaches `max_bytes`.
pub struct JsonFileSink {
    path: PathBuf,
    rotate: bool,
    max_bytes: u64,
    keep: u32,
    state: tokio::sync::Mutex<JsonFileState>,
}

struct JsonFileState {
    file: Option<tokio::fs::File>,
    written: u64,
}

impl JsonFileSink {
    pub async fn new<P: Into<PathBuf>>(
        path: P,
        rotate: bool,
        max_bytes: u64,
        keep: u32,
    ) -> std::io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let file = open_append(&path).await?;
        let written = file.metadata().await.map(|m| m.len()).unwrap_or(0);
        Ok(Self {
            path,
            rotate,
            max_bytes,
            keep: keep.max(1),
            state: tokio::sync::Mutex::new(JsonFileState {
                file: Some(file),
                written,
            }),
        })
    }

    fn backup(&self, idx: u32) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{}", idx));
        PathBuf::from(name)
    }

    async fn roll(&self, state: &mut JsonFileState) -> std::io::Result<()> {
        state.file = None;
        for idx in (1..self.keep).rev() {
            let from = self.backup(idx);
            if tokio::fs::metadata(&from).await.is_ok() {
                tokio::fs::rename(&from, self.backup(idx + 1)).await?;
            }
        }
        tokio::fs::rename(&self.path, self.backup(1)).await?;
        state.file = Some(open_append(&self.path).await?);
        state.written = 0;
        Ok(())
    }
}

async fn open_append(path: &Path) -> std::io::Result<tokio::fs::File> {
    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
}

#[async_trait]
impl LogSink for JsonFileSink {
    async fn handle(&self, event: &LogEvent) {
        let mut line = match serde_json::to_vec(event) {
            Ok(line) => line,
            Err(_) => return,
        };
        line.push(b'\n');
        let mut state = self.state.lock().await;
        if self.rotate && state.written >= self.max_bytes {
            if let Err(e) = self.roll(&mut state).await {
                eprintln!("{}event log rotation failed: {}", ICON_PLACEHOLDER, e);
                if state.file.is_none() {
                    state.file = open_append(&self.path).await.ok();
                }
            }
        }
        if let Some(file) = state.file.as_mut() {
            if file.write_all(&line).await.is_ok() {
                state.written += line.len() as u64;
            }
        }
    }

    async fn flush(&self) {
        let mut state = self.state.lock().await;
        if let Some(file) = state.file.as_mut() {
            let _ = file.flush().await;
            let _ = file.sync_all().await;
        }
    }
}

/// Keeps every event in memory; used by tests to assert on emitted events.
#[derive(Default)]
pub struct MemorySink {
    events: parking_lot::Mutex<Vec<LogEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().clone()
    }

    pub fn actions(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|e| e.action().to_string())
            .collect()
    }
}

#[async_trait]
impl LogSink for MemorySink {
    async fn handle(&self, event: &LogEvent) {
        self.events.lock().push(event.clone());
    }
}
