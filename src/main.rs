//! host-bridge-mcp: MCP command bridge into a single-threaded host
//!
//! Standalone entry point. Serves the built-in tools and resources over TCP
//! or stdio, with the dispatcher on its own execution thread.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use host_bridge_mcp::config::{self, TransportKind};
use host_bridge_mcp::mcp::builtin::builtin_registries;
use host_bridge_mcp::mcp::server::BridgeServer;
use host_bridge_mcp::mcp::transport;

/// MCP command bridge into a single-threaded host.
///
/// Accepts JSON-RPC 2.0 calls over newline-delimited TCP or stdio and runs
/// them on a single execution thread.
#[derive(Parser, Debug)]
#[command(name = "host-bridge-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,

    /// Serve a single client over stdin/stdout instead of TCP
    #[arg(long, conflicts_with = "listen")]
    stdio: bool,

    /// TCP address to listen on (overrides the configuration file)
    #[arg(long, value_name = "ADDR")]
    listen: Option<SocketAddr>,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
///
/// Logs always go to stderr; in stdio mode stdout is the protocol channel.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for the host-bridge-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    let config_path = args.config.as_deref();
    let mut cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if args.stdio {
        cfg.transport = TransportKind::Stdio;
    }
    if let Some(addr) = args.listen {
        cfg.transport = TransportKind::Tcp;
        cfg.bind_address = addr.to_string();
    }

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = %cfg.transport,
        "Starting host-bridge-mcp"
    );

    let addr = match cfg.socket_addr() {
        Ok(addr) => addr,
        Err(e) if cfg.transport == TransportKind::Tcp => {
            error!(error = %e, "Invalid listen address");
            return ExitCode::FAILURE;
        }
        Err(_) => SocketAddr::from(([127, 0, 0, 1], 0)),
    };

    let server = BridgeServer::new(&cfg.dispatch);
    let handle = server.handle();
    let running = match server.start() {
        Ok(running) => running,
        Err(e) => {
            error!(error = %e, "Failed to start execution thread");
            return ExitCode::FAILURE;
        }
    };

    let (tools, resources) = builtin_registries(&handle);
    running.initialize(tools, resources);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            running.shutdown();
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(transport::run(cfg.transport, addr, handle));
    running.shutdown();
    // A blocked stdin read would otherwise hold up runtime teardown.
    runtime.shutdown_background();

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
