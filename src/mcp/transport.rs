//! Text-frame transports.
//!
//! Both transports carry the same framing:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - Empty lines are ignored
//! - Lines that are not UTF-8 are answered with a parse error
//!
//! Each connection gets a reader task that feeds the inbound queue and a
//! writer task that drains a channel registered as the connection's
//! [`Connection`](crate::mcp::connections::Connection). Neither ever waits
//! on the execution thread.
//!
//! In stdio mode stdout carries protocol frames only; logs go to stderr.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::TransportKind;
use crate::mcp::connections::{ChannelConnection, ConnectionId};
use crate::mcp::server::BridgeHandle;

/// Serves one client over a reader/writer pair until the reader hits EOF.
///
/// # Errors
///
/// Returns an error if reading fails. Write failures end the writer task
/// and surface as delivery failures on the dispatcher side.
pub async fn serve_stream<R, W>(
    reader: R,
    writer: W,
    handle: BridgeHandle,
    peer: String,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let id = handle.open_connection(Arc::new(ChannelConnection::new(tx, peer.clone())));
    info!(connection = %id, peer = %peer, "Client connected");

    let writer_task = tokio::spawn(write_frames(writer, rx, id));
    let result = read_frames(reader, &handle, id).await;

    // The writer finishes once the dispatcher has unregistered the
    // connection, which happens after everything queued before this point.
    handle.close_connection(id);
    match writer_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(connection = %id, error = %e, "Writer stopped"),
        Err(e) => warn!(connection = %id, error = %e, "Writer task failed"),
    }

    info!(connection = %id, "Client disconnected");
    result
}

async fn read_frames<R>(reader: R, handle: &BridgeHandle, id: ConnectionId) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let queued = match std::str::from_utf8(&buf) {
            Ok(text) => {
                let line = text.trim_end_matches(|c| c == '\n' || c == '\r');
                if line.trim().is_empty() {
                    continue;
                }
                handle.enqueue(line, id)
            }
            Err(e) => handle.reject(
                format!("Frame is not valid UTF-8 (byte {})", e.valid_up_to()),
                id,
            ),
        };
        if queued.is_err() {
            warn!(connection = %id, "Dispatcher is gone, dropping connection");
            break;
        }
    }
    Ok(())
}

async fn write_frames<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<String>,
    id: ConnectionId,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        write_raw(&mut writer, &frame).await.map_err(|e| {
            warn!(connection = %id, error = %e, "Failed to write frame");
            e
        })?;
    }
    Ok(())
}

/// Writes one frame with newline termination.
async fn write_raw<W>(writer: &mut W, json: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    debug_assert!(
        !json.contains('\n'),
        "JSON message must not contain embedded newlines"
    );

    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;

    Ok(())
}

/// Accepts TCP clients forever, serving each on its own task.
///
/// # Errors
///
/// Returns an error if accepting fails.
pub async fn serve_tcp(listener: TcpListener, handle: BridgeHandle) -> io::Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(peer = %addr, error = %e, "Could not disable Nagle");
        }
        let (reader, writer) = stream.into_split();
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_stream(reader, writer, handle, addr.to_string()).await {
                warn!(peer = %addr, error = %e, "Connection ended with error");
            }
        });
    }
}

/// Serves a single client over stdin/stdout until stdin closes.
///
/// # Errors
///
/// Returns an error if reading stdin fails.
pub async fn serve_stdio(handle: BridgeHandle) -> io::Result<()> {
    serve_stream(
        tokio::io::stdin(),
        tokio::io::stdout(),
        handle,
        "stdio".to_string(),
    )
    .await
}

/// Runs the chosen transport until it finishes or a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if binding or transport I/O fails.
pub async fn run(kind: TransportKind, addr: SocketAddr, handle: BridgeHandle) -> io::Result<()> {
    match kind {
        TransportKind::Tcp => {
            let listener = TcpListener::bind(addr).await?;
            info!(address = %listener.local_addr()?, "Listening for TCP clients");
            run_with_shutdown(serve_tcp(listener, handle)).await
        }
        TransportKind::Stdio => {
            info!("Serving a single client over stdio");
            run_with_shutdown(serve_stdio(handle)).await
        }
    }
}

/// Drives `serve` until it completes or the process is asked to stop.
#[cfg(unix)]
async fn run_with_shutdown<F>(serve: F) -> io::Result<()>
where
    F: std::future::Future<Output = io::Result<()>>,
{
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).map_err(io::Error::other)?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(io::Error::other)?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("Received SIGINT, initiating graceful shutdown");
            Ok(())
        }

        _ = sigterm.recv() => {
            info!("Received SIGTERM, initiating graceful shutdown");
            Ok(())
        }

        result = serve => result,
    }
}

/// Drives `serve` until it completes or the process is asked to stop.
#[cfg(windows)]
async fn run_with_shutdown<F>(serve: F) -> io::Result<()>
where
    F: std::future::Future<Output = io::Result<()>>,
{
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, initiating graceful shutdown");
            Ok(())
        }

        result = serve => result,
    }
}
