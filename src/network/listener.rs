// src/network/listener.rs

use crate::config::Config;
use crate::error::ProtocolError;
use crate::events::{emit_network_event, LogLevel};
use crate::network::dispatcher::RequestHandler;
use crate::network::transport::{read_line_bounded, write_line, ReadLineError};
use crate::shutdown::Shutdown;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;

/// Per-connection limits of an accept loop.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub io_timeout: Duration,
    pub max_line_bytes: usize,
    /// Component name used in emitted events ("tracker" / "agent").
    pub component: &'static str,
}

impl ServeOptions {
    pub fn from_config(config: &Config, component: &'static str) -> Self {
        Self {
            io_timeout: config.io_timeout(),
            max_line_bytes: config.max_line_bytes(),
            component,
        }
    }
}

pub async fn bind(addr: &str) -> std::io::Result<TcpListener> {
    TcpListener::bind(addr).await
}

/// Accept connections until `shutdown` fires. Each connection carries one
/// request line and gets one response line, handled on its own task so a
/// slow client never blocks the accept loop. In-flight connections are
/// drained before returning.
pub async fn serve<H>(
    listener: TcpListener,
    handler: Arc<H>,
    options: ServeOptions,
    shutdown: Shutdown,
) -> std::io::Result<()>
where
    H: RequestHandler + ?Sized + 'static,
{
    let local = listener.local_addr()?;
    emit_network_event(
        options.component,
        LogLevel::Info,
        "listener_bind",
        Some(local.to_string()),
        None,
    );

    let mut inflight = JoinSet::new();
    loop {
        tokio::select! {
            _ = shutdown.triggered() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    emit_network_event(
                        options.component,
                        LogLevel::Debug,
                        "incoming_connection",
                        Some(peer.to_string()),
                        None,
                    );
                    inflight.spawn(handle_connection(
                        stream,
                        peer,
                        handler.clone(),
                        options.clone(),
                    ));
                }
                Err(e) => {
                    emit_network_event(
                        options.component,
                        LogLevel::Error,
                        "accept_failed",
                        None,
                        Some(e.to_string()),
                    );
                }
            },
            Some(_) = inflight.join_next(), if !inflight.is_empty() => {}
        }
    }

    drop(listener);
    while inflight.join_next().await.is_some() {}
    emit_network_event(
        options.component,
        LogLevel::Info,
        "listener_stopped",
        Some(local.to_string()),
        None,
    );
    Ok(())
}

async fn handle_connection<H>(
    stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<H>,
    options: ServeOptions,
) where
    H: RequestHandler + ?Sized,
{
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let read = tokio::time::timeout(
        options.io_timeout,
        read_line_bounded(&mut reader, options.max_line_bytes),
    )
    .await;

    let mut unread_input = false;
    let response = match read {
        Ok(Ok(Some(line))) => handler.handle_line(&line, peer).await,
        Ok(Ok(None)) => {
            // Connected and closed without a request.
            return;
        }
        Ok(Err(ReadLineError::TooLong)) => {
            emit_network_event(
                options.component,
                LogLevel::Warn,
                "line_too_long",
                Some(peer.to_string()),
                Some(format!("limit {}", options.max_line_bytes)),
            );
            unread_input = true;
            handler.error_reply(&ProtocolError::LineTooLong(options.max_line_bytes))
        }
        Ok(Err(ReadLineError::Io(e))) if e.kind() == std::io::ErrorKind::InvalidData => {
            handler.error_reply(&ProtocolError::NotUtf8)
        }
        Ok(Err(ReadLineError::Io(e))) => {
            emit_network_event(
                options.component,
                LogLevel::Warn,
                "read_failed",
                Some(peer.to_string()),
                Some(e.to_string()),
            );
            return;
        }
        Err(_) => {
            emit_network_event(
                options.component,
                LogLevel::Warn,
                "read_timeout",
                Some(peer.to_string()),
                None,
            );
            return;
        }
    };

    match tokio::time::timeout(options.io_timeout, write_line(&mut write_half, &response)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => emit_network_event(
            options.component,
            LogLevel::Warn,
            "write_failed",
            Some(peer.to_string()),
            Some(e.to_string()),
        ),
        Err(_) => emit_network_event(
            options.component,
            LogLevel::Warn,
            "write_timeout",
            Some(peer.to_string()),
            None,
        ),
    }
    let _ = write_half.shutdown().await;
    if unread_input {
        // Closing with unread bytes would reset the connection and could
        // discard the reply before the client reads it.
        let _ = tokio::time::timeout(
            options.io_timeout,
            tokio::io::copy(&mut reader, &mut tokio::io::sink()),
        )
        .await;
    }
}
