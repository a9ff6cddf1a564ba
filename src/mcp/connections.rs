//! Registry of live client connections.
//!
//! A lookup table from [`ConnectionId`] to something that can deliver a
//! text frame. It knows nothing about the protocol. Delivery is
//! best-effort: a failure on one connection is logged and reported to the
//! caller but never affects any other connection.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Opaque identifier of a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Errors delivering a frame.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No connection is registered under this ID.
    #[error("Connection {0} is not registered")]
    UnknownConnection(ConnectionId),

    /// The connection has gone away.
    #[error("Connection closed")]
    Closed,
}

/// Something that can deliver outbound text frames to one client.
///
/// Implementations must not block: `send` is called from the execution
/// thread and from network threads alike.
pub trait Connection: Send + Sync {
    /// Queues one frame for delivery.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be delivered.
    fn send(&self, text: &str) -> Result<(), TransportError>;

    /// Describes the remote end, for logging.
    fn peer(&self) -> String {
        "unknown".to_string()
    }
}

/// A connection backed by a channel drained by a writer task.
pub struct ChannelConnection {
    tx: mpsc::UnboundedSender<String>,
    peer: String,
}

impl ChannelConnection {
    /// Creates a connection feeding `tx`.
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<String>, peer: impl Into<String>) -> Self {
        Self {
            tx,
            peer: peer.into(),
        }
    }
}

impl Connection for ChannelConnection {
    fn send(&self, text: &str) -> Result<(), TransportError> {
        self.tx
            .send(text.to_string())
            .map_err(|_| TransportError::Closed)
    }

    fn peer(&self) -> String {
        self.peer.clone()
    }
}

/// Thread-safe table of live connections.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Arc<dyn Connection>>>,
    next_id: AtomicU64,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a fresh, never reused, connection ID.
    pub fn allocate_id(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers a connection, replacing any previous one with the same ID.
    pub fn register(&self, id: ConnectionId, connection: Arc<dyn Connection>) {
        debug!(connection = %id, peer = %connection.peer(), "Connection registered");
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, connection);
    }

    /// Removes a connection. Returns `true` if it was registered.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let removed = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();
        if removed {
            debug!(connection = %id, "Connection unregistered");
        }
        removed
    }

    /// Returns `true` if the connection is registered.
    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    /// Number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no connections are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// IDs of all registered connections, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<_> = self
            .connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Drops every connection.
    pub fn clear(&self) {
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn lookup(&self, id: ConnectionId) -> Option<Arc<dyn Connection>> {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Sends a frame to one connection.
    ///
    /// The table lock is released before the frame is handed over.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is unknown or delivery fails.
    pub fn send(&self, id: ConnectionId, text: &str) -> Result<(), TransportError> {
        let connection = self
            .lookup(id)
            .ok_or(TransportError::UnknownConnection(id))?;
        connection.send(text).map_err(|e| {
            warn!(connection = %id, error = %e, "Failed to deliver frame");
            e
        })
    }

    /// Sends a frame to every registered connection.
    ///
    /// Returns the number of connections the frame was delivered to.
    pub fn broadcast(&self, text: &str) -> usize {
        let snapshot: Vec<(ConnectionId, Arc<dyn Connection>)> = self
            .connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, conn)| (*id, Arc::clone(conn)))
            .collect();

        snapshot
            .into_iter()
            .filter(|(id, connection)| match connection.send(text) {
                Ok(()) => true,
                Err(e) => {
                    warn!(connection = %id, error = %e, "Broadcast delivery failed");
                    false
                }
            })
            .count()
    }
}
