//! End-to-end tests over real byte streams.
//!
//! A running bridge (dispatcher on its own thread) serves clients over an
//! in-memory duplex pipe and over a loopback TCP socket.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use host_bridge_mcp::config::DispatchConfig;
use host_bridge_mcp::mcp::builtin::builtin_registries;
use host_bridge_mcp::mcp::server::{BridgeServer, RunningBridge};
use host_bridge_mcp::mcp::transport::{serve_stream, serve_tcp};

const WAIT: Duration = Duration::from_secs(5);

fn start_bridge() -> RunningBridge {
    let settings = DispatchConfig {
        tick_interval_ms: 1,
        ..DispatchConfig::default()
    };
    let server = BridgeServer::new(&settings);
    let handle = server.handle();
    let running = server.start().unwrap();
    let (tools, resources) = builtin_registries(&handle);
    assert!(running.initialize(tools, resources));
    running
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_duplex_session() {
    let running = start_bridge();
    let handle = running.handle();

    let (client, server_side) = tokio::io::duplex(4096);
    let (server_read, server_write) = tokio::io::split(server_side);
    let session = tokio::spawn(serve_stream(
        server_read,
        server_write,
        handle.clone(),
        "duplex".to_string(),
    ));

    let (client_read, mut client_write) = tokio::io::split(client);
    let mut lines = BufReader::new(client_read).lines();

    client_write
        .write_all(b"\n{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\r\n")
        .await
        .unwrap();
    let line = timeout(WAIT, lines.next_line()).await.unwrap().unwrap();
    assert_eq!(line.as_deref(), Some(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#));

    client_write
        .write_all(b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n")
        .await
        .unwrap();
    client_write
        .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/call\",\"params\":{\"name\":\"echo\",\"arguments\":{\"message\":\"over the wire\"}}}\n")
        .await
        .unwrap();
    let line = timeout(WAIT, lines.next_line()).await.unwrap().unwrap().unwrap();
    assert!(line.contains(r#""id":2"#));
    assert!(line.contains("over the wire"));

    client_write.shutdown().await.unwrap();
    drop(client_write);
    timeout(WAIT, session).await.unwrap().unwrap().unwrap();
    assert_eq!(handle.connection_count(), 0);

    running.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_invalid_utf8_frame_keeps_session() {
    let running = start_bridge();
    let handle = running.handle();

    let (client, server_side) = tokio::io::duplex(4096);
    let (server_read, server_write) = tokio::io::split(server_side);
    let session = tokio::spawn(serve_stream(
        server_read,
        server_write,
        handle.clone(),
        "duplex".to_string(),
    ));

    let (client_read, mut client_write) = tokio::io::split(client);
    let mut lines = BufReader::new(client_read).lines();

    client_write
        .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\",\"x\":\"\xff\"}\n")
        .await
        .unwrap();
    let line = timeout(WAIT, lines.next_line()).await.unwrap().unwrap().unwrap();
    assert!(line.contains("-32700"));
    assert!(line.contains(r#""id":null"#));

    client_write
        .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n")
        .await
        .unwrap();
    let line = timeout(WAIT, lines.next_line()).await.unwrap().unwrap();
    assert_eq!(line.as_deref(), Some(r#"{"jsonrpc":"2.0","id":2,"result":{}}"#));

    client_write.shutdown().await.unwrap();
    drop(client_write);
    timeout(WAIT, session).await.unwrap().unwrap().unwrap();

    running.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tcp_clients_are_isolated() {
    let running = start_bridge();
    let handle = running.handle();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accept_loop = tokio::spawn(serve_tcp(listener, handle.clone()));

    let first = TcpStream::connect(addr).await.unwrap();
    let second = TcpStream::connect(addr).await.unwrap();
    let (first_read, mut first_write) = first.into_split();
    let (second_read, mut second_write) = second.into_split();
    let mut first_lines = BufReader::new(first_read).lines();
    let mut second_lines = BufReader::new(second_read).lines();

    first_write
        .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":\"a\",\"method\":\"ping\"}\n")
        .await
        .unwrap();
    second_write
        .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":\"b\",\"method\":\"ping\"}\n")
        .await
        .unwrap();

    let line = timeout(WAIT, first_lines.next_line()).await.unwrap().unwrap().unwrap();
    assert!(line.contains(r#""id":"a""#));
    let line = timeout(WAIT, second_lines.next_line()).await.unwrap().unwrap().unwrap();
    assert!(line.contains(r#""id":"b""#));

    // A broadcast from one client reaches both.
    first_write
        .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"tools/call\",\"params\":{\"name\":\"broadcast\",\"arguments\":{\"message\":\"hello\"}}}\n")
        .await
        .unwrap();
    let line = timeout(WAIT, second_lines.next_line()).await.unwrap().unwrap().unwrap();
    assert!(line.contains("notifications/message"));

    accept_loop.abort();
    running.shutdown();
}
