//! Dispatch loop.
//!
//! The [`Dispatcher`] is the only consumer of the inbound queue and the
//! only owner of the tool and resource registries. Everything it does
//! happens on whichever thread calls [`Dispatcher::drain_tick`]; that thread
//! is the host's execution thread by definition. [`Dispatcher::run`] turns
//! the calling thread into one, ticking at a fixed cadence.
//!
//! Draining is held back until the registries are installed with
//! [`Dispatcher::initialize`]. If that never happens, a fixed number of
//! ticks later the gate opens anyway so clients are not starved forever.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::mcp::connections::{ConnectionId, ConnectionRegistry};
use crate::mcp::engine::RpcEngine;
use crate::mcp::protocol::{parse_message, JsonRpcError, JsonRpcResponse, RequestId};
use crate::mcp::queue::{Inbound, InboundReceiver};
use crate::mcp::registry::{panic_message, ResourceRegistry, ToolRegistry};

/// Work submitted to run on the execution thread between ticks.
pub type HostCommand = Box<dyn FnOnce(&mut Dispatcher) + Send>;

/// What one call to [`Dispatcher::drain_tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Queue items taken, including disconnect markers.
    pub processed: usize,
    /// Responses handed to a connection.
    pub responses: usize,
    /// Responses that could not be delivered.
    pub delivery_failures: usize,
    /// `true` if the startup gate kept the queue untouched.
    pub gated: bool,
}

#[derive(Debug)]
struct StartupGate {
    ready: bool,
    delay_ticks: u32,
    remaining: u32,
}

impl StartupGate {
    const fn new(delay_ticks: u32) -> Self {
        Self {
            ready: false,
            delay_ticks,
            remaining: delay_ticks,
        }
    }

    fn open(&mut self) {
        self.ready = true;
    }

    fn close(&mut self) {
        self.ready = false;
        self.remaining = self.delay_ticks;
    }

    /// Counts one tick. Returns `true` once draining may proceed.
    fn poll(&mut self) -> bool {
        if self.ready {
            return true;
        }
        if self.remaining == 0 {
            warn!(
                delay_ticks = self.delay_ticks,
                "Registries were never initialised; draining with what is registered"
            );
            self.ready = true;
            return true;
        }
        self.remaining -= 1;
        false
    }
}

/// Single-consumer dispatcher tying the queue, engine and connections together.
pub struct Dispatcher {
    engine: RpcEngine,
    inbound: InboundReceiver,
    connections: Arc<ConnectionRegistry>,
    gate: StartupGate,
}

impl Dispatcher {
    /// Creates a dispatcher with empty registries and a closed startup gate.
    #[must_use]
    pub fn new(
        inbound: InboundReceiver,
        connections: Arc<ConnectionRegistry>,
        startup_delay_ticks: u32,
    ) -> Self {
        Self {
            engine: RpcEngine::default(),
            inbound,
            connections,
            gate: StartupGate::new(startup_delay_ticks),
        }
    }

    /// Installs the registries and opens the startup gate.
    pub fn initialize(&mut self, tools: ToolRegistry, resources: ResourceRegistry) {
        info!(
            tools = tools.len(),
            resources = resources.len(),
            "Registries initialised"
        );
        self.engine.replace_registries(tools, resources);
        self.gate.open();
    }

    /// Returns `true` once draining is allowed.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.gate.ready
    }

    /// The RPC engine.
    #[must_use]
    pub const fn engine(&self) -> &RpcEngine {
        &self.engine
    }

    /// The RPC engine, for registering tools, resources and methods.
    pub fn engine_mut(&mut self) -> &mut RpcEngine {
        &mut self.engine
    }

    /// The connection registry responses go out through.
    #[must_use]
    pub const fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    /// Number of queued items.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inbound.pending()
    }

    /// Drops every registration and closes the startup gate, ready for a
    /// fresh [`initialize`](Self::initialize).
    pub fn reset(&mut self) {
        info!("Dispatcher reset");
        self.engine.clear();
        self.gate.close();
    }

    /// Discards everything still queued. Returns how many items were dropped.
    pub fn discard_pending(&mut self) -> usize {
        let dropped = self.inbound.discard_all();
        if dropped > 0 {
            info!(dropped, "Discarded queued messages");
        }
        dropped
    }

    /// Processes at most `max_count` queued items.
    ///
    /// Must only be called from the execution thread. A failure while
    /// handling one request is answered with an `InternalError` response
    /// carrying its ID and does not affect the rest of the batch.
    pub fn drain_tick(&mut self, max_count: usize) -> TickReport {
        let mut report = TickReport::default();
        if !self.gate.poll() {
            report.gated = true;
            return report;
        }

        while report.processed < max_count {
            let Some(message) = self.inbound.try_dequeue() else {
                break;
            };
            report.processed += 1;

            match message.inbound {
                Inbound::Frame(raw) => {
                    let Some(text) = self.respond(&raw, message.connection) else {
                        continue;
                    };
                    self.deliver(message.connection, &text, &mut report);
                }
                Inbound::Malformed(detail) => {
                    debug!(connection = %message.connection, error = %detail, "Rejected undecodable frame");
                    let text = JsonRpcResponse::parse_error(detail).to_json();
                    self.deliver(message.connection, &text, &mut report);
                }
                Inbound::Disconnected => {
                    self.connections.unregister(message.connection);
                }
            }
        }

        if report.processed > 0 {
            trace!(
                processed = report.processed,
                responses = report.responses,
                remaining = self.inbound.pending(),
                "Tick complete"
            );
        }
        report
    }

    fn deliver(&self, connection: ConnectionId, text: &str, report: &mut TickReport) {
        if self.connections.send(connection, text).is_ok() {
            report.responses += 1;
        } else {
            report.delivery_failures += 1;
        }
    }

    fn respond(&self, raw: &str, connection: ConnectionId) -> Option<String> {
        let request = match parse_message(raw) {
            Ok(request) => request,
            Err(response) => {
                debug!(connection = %connection, error = ?response.error_data(), "Rejected malformed message");
                return Some(response.to_json());
            }
        };

        let engine = &self.engine;
        panic::catch_unwind(AssertUnwindSafe(|| {
            engine.handle_request(&request).map(|response| response.to_json())
        }))
        .unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            error!(connection = %connection, method = %request.method, error = %message, "Message handling panicked");
            panic_response(request.id.as_ref(), &message)
        })
    }

    /// Runs the dispatch loop on the current thread until `stop` is raised.
    ///
    /// Each iteration first runs any submitted [`HostCommand`]s, then drains
    /// one tick, then sleeps for whatever is left of `interval`. Returns the
    /// dispatcher so the caller can inspect or reuse it.
    #[must_use]
    pub fn run(
        mut self,
        max_per_tick: usize,
        interval: Duration,
        mut commands: mpsc::UnboundedReceiver<HostCommand>,
        stop: &AtomicBool,
    ) -> Self {
        info!(
            max_per_tick,
            interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            "Dispatch loop started"
        );

        while !stop.load(Ordering::Acquire) {
            let started = Instant::now();

            while let Ok(command) = commands.try_recv() {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| command(&mut self)));
                if let Err(payload) = outcome {
                    error!(error = %panic_message(payload.as_ref()), "Host command panicked");
                }
            }

            let report = self.drain_tick(max_per_tick);
            if report.delivery_failures > 0 {
                debug!(
                    failures = report.delivery_failures,
                    "Some responses were not delivered"
                );
            }

            if let Some(rest) = interval.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }

        info!("Dispatch loop stopped");
        self
    }
}

/// The reply for a request whose handling panicked. Notifications get none.
fn panic_response(id: Option<&RequestId>, message: &str) -> Option<String> {
    let id = id?.clone();
    Some(
        JsonRpcResponse::error(id, JsonRpcError::internal(format!("Internal error: {message}")))
            .to_json(),
    )
}

/// Shared stop flag for [`Dispatcher::run`].
pub type StopFlag = Arc<AtomicBool>;
