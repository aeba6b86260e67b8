// src/agent/output.rs
// Where an agent reports what happened: one line per event.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use crate::events::{emit_system_event, LogLevel};

#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn write_line(&self, line: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

#[async_trait]
impl OutputSink for StdoutSink {
    async fn write_line(&self, line: &str) {
        println!("{}", line);
    }
}

/// Appends lines to a file, the way the external controller expects to read
/// them back.
#[derive(Debug, Clone)]
pub struct FileOutputSink {
    path: PathBuf,
}

impl FileOutputSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{}\n", line).as_bytes()).await?;
        file.flush().await
    }
}

#[async_trait]
impl OutputSink for FileOutputSink {
    async fn write_line(&self, line: &str) {
        if let Err(e) = self.append(line).await {
            emit_system_event(
                "agent",
                LogLevel::Warn,
                "output_write_failed",
                Some(format!("{}: {}", self.path.display(), e)),
            );
        }
    }
}

/// Collects lines in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryOutputSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryOutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn contains(&self, line: &str) -> bool {
        self.lines.lock().iter().any(|l| l == line)
    }

    pub fn any_starts_with(&self, prefix: &str) -> bool {
        self.lines.lock().iter().any(|l| l.starts_with(prefix))
    }
}

#[async_trait]
impl OutputSink for MemoryOutputSink {
    async fn write_line(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

/// Writes every line to each inner sink, in order.
pub struct TeeSink {
    sinks: Vec<Arc<dyn OutputSink>>,
}

impl TeeSink {
    pub fn new(sinks: Vec<Arc<dyn OutputSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl OutputSink for TeeSink {
    async fn write_line(&self, line: &str) {
        for sink in &self.sinks {
            sink.write_line(line).await;
        }
    }
}
