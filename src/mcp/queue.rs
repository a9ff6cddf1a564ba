//! Inbound marshaling queue.
//!
//! Network threads push raw frames in through [`InboundSender`], which is
//! cheap to clone and never blocks. Exactly one [`InboundReceiver`] exists;
//! it belongs to the dispatcher, so the single-consumer rule is enforced by
//! ownership rather than by caller discipline.
//!
//! Ordering is FIFO per sender call sequence, which gives per-connection
//! ordering. Nothing is promised across connections. The queue is
//! unbounded: bursts wait here until the dispatcher gets to them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::mcp::connections::ConnectionId;

/// What arrived from a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A raw text frame.
    Frame(String),
    /// A frame the transport could not decode as text. Carries a
    /// description for the parse error sent back.
    Malformed(String),
    /// The connection's reader reached end of input. Queued behind that
    /// connection's frames so their responses go out first.
    Disconnected,
}

/// One queued item and the connection it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    /// Originating connection.
    pub connection: ConnectionId,
    /// The payload.
    pub inbound: Inbound,
}

/// The receiving side has been dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Inbound queue is closed")]
pub struct QueueClosed;

/// Creates a connected sender/receiver pair.
#[must_use]
pub fn inbound_queue() -> (InboundSender, InboundReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let pending = Arc::new(AtomicUsize::new(0));
    (
        InboundSender {
            tx,
            pending: Arc::clone(&pending),
        },
        InboundReceiver { rx, pending },
    )
}

/// Producer handle, usable from any thread.
#[derive(Debug, Clone)]
pub struct InboundSender {
    tx: mpsc::UnboundedSender<QueuedMessage>,
    pending: Arc<AtomicUsize>,
}

impl InboundSender {
    /// Queues a raw frame from `connection`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueClosed`] if the dispatcher is gone.
    pub fn enqueue(&self, raw: impl Into<String>, connection: ConnectionId) -> Result<(), QueueClosed> {
        self.push(QueuedMessage {
            connection,
            inbound: Inbound::Frame(raw.into()),
        })
    }

    /// Queues an undecodable frame from `connection` so it is answered
    /// with a parse error in order with the connection's other frames.
    ///
    /// # Errors
    ///
    /// Returns [`QueueClosed`] if the dispatcher is gone.
    pub fn reject(&self, detail: impl Into<String>, connection: ConnectionId) -> Result<(), QueueClosed> {
        self.push(QueuedMessage {
            connection,
            inbound: Inbound::Malformed(detail.into()),
        })
    }

    /// Queues the end-of-input marker for `connection`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueClosed`] if the dispatcher is gone.
    pub fn disconnect(&self, connection: ConnectionId) -> Result<(), QueueClosed> {
        self.push(QueuedMessage {
            connection,
            inbound: Inbound::Disconnected,
        })
    }

    fn push(&self, message: QueuedMessage) -> Result<(), QueueClosed> {
        // Count first so the receiver never sees the counter go below zero.
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.tx.send(message).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            QueueClosed
        })
    }

    /// Number of items waiting to be dequeued.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Returns `true` if the receiver has been dropped or closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer handle, owned by the dispatcher.
#[derive(Debug)]
pub struct InboundReceiver {
    rx: mpsc::UnboundedReceiver<QueuedMessage>,
    pending: Arc<AtomicUsize>,
}

impl InboundReceiver {
    /// Takes the next item without waiting.
    pub fn try_dequeue(&mut self) -> Option<QueuedMessage> {
        let message = self.rx.try_recv().ok()?;
        self.pending.fetch_sub(1, Ordering::AcqRel);
        Some(message)
    }

    /// Number of items waiting to be dequeued.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Discards everything currently queued. Returns how many items were dropped.
    pub fn discard_all(&mut self) -> usize {
        let mut dropped = 0;
        while self.try_dequeue().is_some() {
            dropped += 1;
        }
        dropped
    }
}
