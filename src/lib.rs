//! host-bridge-mcp: MCP command bridge into a single-threaded host
//!
//! External clients issue JSON-RPC calls over persistent connections. The
//! embedding host only permits side effects from one execution thread, so
//! every call is marshalled onto that thread, run there, and answered on
//! the connection it came from.
//!
//! # Architecture
//!
//! The bridge provides the plumbing. The host provides the behaviour:
//!
//! - **Protocol**: JSON-RPC 2.0 envelopes and the MCP method set
//! - **Marshalling**: a queue from network tasks to the execution thread
//! - **Registries**: named tools and URI-addressed resources with schema checks
//!
//! The host (not this crate) supplies the tool and resource handlers that
//! actually do something.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//! - [`json`] — Dynamic value model and JSON codec
//! - [`mcp`] — MCP protocol, registries, dispatch and transports

pub mod config;
pub mod error;
pub mod json;
pub mod mcp;
