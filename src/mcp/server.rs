//! Bridge server.
//!
//! [`BridgeServer`] owns every moving part: the inbound queue, the
//! connection registry and the [`Dispatcher`]. Nothing is global. The
//! network side only ever sees a [`BridgeHandle`], which can enqueue
//! frames and deliver outbound text but cannot touch the registries.
//!
//! Two ways to drive it:
//!
//! - Embedded: the host calls [`BridgeServer::drain_tick`] from its own
//!   execution thread on its own schedule.
//! - Standalone: [`BridgeServer::start`] moves the dispatcher onto a
//!   dedicated thread that ticks at the configured cadence.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::DispatchConfig;
use crate::mcp::connections::{Connection, ConnectionId, ConnectionRegistry, TransportError};
use crate::mcp::dispatch::{Dispatcher, HostCommand, StopFlag, TickReport};
use crate::mcp::protocol::OutgoingNotification;
use crate::mcp::queue::{inbound_queue, InboundSender, QueueClosed};
use crate::mcp::registry::{ResourceRegistry, ToolRegistry};

/// Network-side handle. Cheap to clone and safe to use from any thread.
#[derive(Clone)]
pub struct BridgeHandle {
    inbound: InboundSender,
    connections: Arc<ConnectionRegistry>,
}

impl BridgeHandle {
    /// Registers a new connection and returns its ID.
    pub fn open_connection(&self, connection: Arc<dyn Connection>) -> ConnectionId {
        let id = self.connections.allocate_id();
        self.connections.register(id, connection);
        id
    }

    /// Marks a connection as finished.
    ///
    /// The connection stays registered until the dispatcher has answered
    /// everything it queued. If the dispatcher is gone it is dropped at once.
    pub fn close_connection(&self, id: ConnectionId) {
        if self.inbound.disconnect(id).is_err() {
            self.connections.unregister(id);
        }
    }

    /// Queues a raw frame received on `connection`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueClosed`] if the dispatcher has been dropped.
    pub fn enqueue(&self, raw: impl Into<String>, connection: ConnectionId) -> Result<(), QueueClosed> {
        self.inbound.enqueue(raw, connection)
    }

    /// Queues an undecodable frame from `connection` for a parse error reply.
    ///
    /// # Errors
    ///
    /// Returns [`QueueClosed`] if the dispatcher has been dropped.
    pub fn reject(&self, detail: impl Into<String>, connection: ConnectionId) -> Result<(), QueueClosed> {
        self.inbound.reject(detail, connection)
    }

    /// Sends text to one connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is unknown or delivery fails.
    pub fn send(&self, connection: ConnectionId, text: &str) -> Result<(), TransportError> {
        self.connections.send(connection, text)
    }

    /// Sends text to every connection. Returns how many received it.
    pub fn broadcast(&self, text: &str) -> usize {
        self.connections.broadcast(text)
    }

    /// Broadcasts a server-initiated notification.
    pub fn notify_all(&self, notification: &OutgoingNotification) -> usize {
        self.broadcast(&notification.to_json())
    }

    /// Number of registered connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of frames waiting for the dispatcher.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inbound.pending()
    }
}

/// Top-level server owning the queue, connections and dispatcher.
pub struct BridgeServer {
    handle: BridgeHandle,
    dispatcher: Dispatcher,
    settings: DispatchConfig,
}

impl BridgeServer {
    /// Creates a server with empty registries and a closed startup gate.
    #[must_use]
    pub fn new(settings: &DispatchConfig) -> Self {
        let (inbound, receiver) = inbound_queue();
        let connections = Arc::new(ConnectionRegistry::new());
        let dispatcher = Dispatcher::new(
            receiver,
            Arc::clone(&connections),
            settings.startup_delay_ticks,
        );
        Self {
            handle: BridgeHandle {
                inbound,
                connections,
            },
            dispatcher,
            settings: settings.clone(),
        }
    }

    /// A handle for transports and handlers.
    #[must_use]
    pub fn handle(&self) -> BridgeHandle {
        self.handle.clone()
    }

    /// The dispatcher, for direct registration before or between ticks.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// Installs registries and opens the startup gate.
    pub fn initialize(&mut self, tools: ToolRegistry, resources: ResourceRegistry) {
        self.dispatcher.initialize(tools, resources);
    }

    /// Runs one tick with the configured bound. Call from the execution thread.
    pub fn drain_tick(&mut self) -> TickReport {
        self.dispatcher.drain_tick(self.settings.max_messages_per_tick)
    }

    /// Drops queued messages and connections and clears the registries.
    pub fn shutdown(&mut self) {
        shutdown_parts(&mut self.dispatcher, &self.handle.connections);
    }

    /// Moves the dispatcher onto a dedicated execution thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn start(self) -> io::Result<RunningBridge> {
        let Self {
            handle,
            dispatcher,
            settings,
        } = self;

        let (commands, command_rx) = mpsc::unbounded_channel();
        let stop: StopFlag = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("bridge-exec".to_string())
            .spawn(move || {
                dispatcher.run(
                    settings.max_messages_per_tick,
                    settings.tick_interval(),
                    command_rx,
                    &flag,
                )
            })?;

        Ok(RunningBridge {
            handle,
            commands,
            stop,
            thread: Some(thread),
        })
    }
}

fn shutdown_parts(dispatcher: &mut Dispatcher, connections: &ConnectionRegistry) {
    dispatcher.discard_pending();
    dispatcher.reset();
    let dropped = connections.len();
    connections.clear();
    info!(connections = dropped, "Bridge shut down");
}

/// A server whose dispatcher runs on its own thread.
///
/// Dropping it stops the thread, as does [`shutdown`](Self::shutdown).
pub struct RunningBridge {
    handle: BridgeHandle,
    commands: mpsc::UnboundedSender<HostCommand>,
    stop: StopFlag,
    thread: Option<JoinHandle<Dispatcher>>,
}

impl RunningBridge {
    /// A handle for transports and handlers.
    #[must_use]
    pub fn handle(&self) -> BridgeHandle {
        self.handle.clone()
    }

    /// Runs `command` on the execution thread before the next tick.
    ///
    /// Returns `false` if the execution thread has already stopped.
    pub fn submit<F>(&self, command: F) -> bool
    where
        F: FnOnce(&mut Dispatcher) + Send + 'static,
    {
        self.commands.send(Box::new(command)).is_ok()
    }

    /// Installs registries on the execution thread and opens the gate.
    pub fn initialize(&self, tools: ToolRegistry, resources: ResourceRegistry) -> bool {
        self.submit(move |dispatcher| dispatcher.initialize(tools, resources))
    }

    /// Clears the registries and closes the gate, keeping connections.
    pub fn reset(&self) -> bool {
        self.submit(Dispatcher::reset)
    }

    /// Stops the execution thread, then drops queued messages and connections.
    pub fn shutdown(mut self) {
        self.stop_thread();
    }

    fn stop_thread(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.stop.store(true, Ordering::Release);
        match thread.join() {
            Ok(mut dispatcher) => shutdown_parts(&mut dispatcher, &self.handle.connections),
            Err(_) => {
                error!("Execution thread panicked");
                self.handle.connections.clear();
            }
        }
    }
}

impl Drop for RunningBridge {
    fn drop(&mut self) {
        if self.thread.is_some() {
            warn!("RunningBridge dropped without shutdown; stopping execution thread");
            self.stop_thread();
        }
    }
}
