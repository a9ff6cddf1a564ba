//! Model Context Protocol (MCP) bridge.
//!
//! Clients talk JSON-RPC 2.0 over newline-delimited text frames. Frames
//! arrive on any number of network tasks but every handler runs on the one
//! execution thread the host allows.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        BridgeServer                          │
//! │                                                              │
//! │  network tasks                      execution thread         │
//! │  ┌────────────┐   ┌─────────────┐   ┌────────────────────┐   │
//! │  │ Transport  │──▶│   Inbound   │──▶│     Dispatcher     │   │
//! │  │ (tcp/stdio)│   │    queue    │   │  ┌──────────────┐  │   │
//! │  └────────────┘   └─────────────┘   │  │  RpcEngine   │  │   │
//! │        ▲                            │  │ tools / res. │  │   │
//! │        │          ┌─────────────┐   │  └──────────────┘  │   │
//! │        └──────────│ Connections │◀──│                    │   │
//! │                   └─────────────┘   └────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod builtin;
pub mod connections;
pub mod dispatch;
pub mod engine;
pub mod protocol;
pub mod queue;
pub mod registry;
pub mod server;
pub mod transport;

pub use connections::{Connection, ConnectionId, ConnectionRegistry, TransportError};
pub use dispatch::{Dispatcher, HostCommand, TickReport};
pub use engine::RpcEngine;
pub use protocol::{
    ErrorCode, JsonRpcError, JsonRpcRequest, JsonRpcResponse, OutgoingNotification,
    MCP_PROTOCOL_VERSION,
};
pub use registry::{HandlerError, ResourceRegistry, ToolRegistry};
pub use server::{BridgeHandle, BridgeServer, RunningBridge};
