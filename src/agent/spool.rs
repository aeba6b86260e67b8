// src/agent/spool.rs
//
// File queue shared with an external controller: the controller appends
// command lines to `<dir>/<host:port>.in`; the agent appends its output lines
// to `<dir>/<host:port>.out`. The agent side only feeds the typed command
// channel.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;

use crate::agent::commands::CommandQueue;
use crate::agent::output::FileOutputSink;
use crate::events::{emit_system_event, LogLevel};
use crate::network::message::NodeAddress;
use crate::shutdown::Shutdown;

#[derive(Debug, Clone)]
pub struct Spool {
    dir: PathBuf,
    node: String,
}

impl Spool {
    pub fn new(dir: impl Into<PathBuf>, node: &NodeAddress) -> Self {
        Self {
            dir: dir.into(),
            node: node.to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn in_path(&self) -> PathBuf {
        self.dir.join(format!("{}.in", self.node))
    }

    pub fn out_path(&self) -> PathBuf {
        self.dir.join(format!("{}.out", self.node))
    }

    /// Create the directory and both files if missing.
    pub async fn ensure(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        for path in [self.in_path(), self.out_path()] {
            tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await?;
        }
        Ok(())
    }

    pub async fn push_command(&self, line: &str) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.in_path())
            .await?;
        file.write_all(format!("{}\n", line.trim()).as_bytes()).await?;
        file.flush().await
    }

    /// Take every pending command line, leaving the input file empty.
    pub async fn drain_commands(&self) -> std::io::Result<Vec<String>> {
        let content = take_file(&self.in_path(), "processing").await?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Read and clear the agent's output file.
    pub async fn take_output(&self) -> std::io::Result<String> {
        take_file(&self.out_path(), "taking").await
    }

    pub fn output_sink(&self) -> FileOutputSink {
        FileOutputSink::new(self.out_path())
    }

    /// Poll the input file every `interval` and forward its lines to `queue`.
    /// Read errors are logged and retried on the next tick.
    pub fn spawn_reader(&self, queue: CommandQueue, interval: Duration, shutdown: Shutdown) -> JoinHandle<()> {
        let spool = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.triggered() => break,
                    _ = ticker.tick() => {}
                }
                match spool.drain_commands().await {
                    Ok(lines) => {
                        for (idx, line) in lines.iter().enumerate() {
                            if !queue.push_line(line).await {
                                emit_system_event(
                                    "spool",
                                    LogLevel::Warn,
                                    "dropped",
                                    Some(format!("{} line(s) after the agent stopped", lines.len() - idx)),
                                );
                                return;
                            }
                        }
                    }
                    Err(e) => emit_system_event(
                        "spool",
                        LogLevel::Warn,
                        "read_failed",
                        Some(format!("{}: {}", spool.in_path().display(), e)),
                    ),
                }
            }
        })
    }
}

// Rename first so appends racing with the read land in a fresh file.
async fn take_file(path: &Path, suffix: &str) -> std::io::Result<String> {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".");
    staging.push(suffix);
    let staging = PathBuf::from(staging);
    match tokio::fs::rename(path, &staging).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(String::new()),
        Err(e) => return Err(e),
    }
    let content = tokio::fs::read_to_string(&staging).await;
    let _ = tokio::fs::remove_file(&staging).await;
    content
}
