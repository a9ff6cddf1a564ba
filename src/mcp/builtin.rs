//! Host-agnostic tools and resources registered by the binary.
//!
//! These exist so a freshly started bridge has something to call. Real
//! hosts register their own handlers alongside or instead of them.

use crate::json::{Map, Value};
use crate::mcp::protocol::{
    InputSchema, OutgoingNotification, PropertySchema, ResourceContent, ResourceDefinition,
    ToolCallResult, ToolDefinition, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::registry::{HandlerError, ResourceRegistry, ToolRegistry};
use crate::mcp::server::BridgeHandle;

/// URI of the server information resource.
pub const SERVER_INFO_URI: &str = "bridge://server/info";

/// Prefix of the echo resource family.
pub const ECHO_RESOURCE_PREFIX: &str = "bridge://echo/";

/// Builds registries holding the built-in tools and resources.
#[must_use]
pub fn builtin_registries(handle: &BridgeHandle) -> (ToolRegistry, ResourceRegistry) {
    let mut tools = ToolRegistry::new();
    let mut resources = ResourceRegistry::new();
    register_builtins(&mut tools, &mut resources, handle);
    (tools, resources)
}

/// Adds the built-in tools and resources to existing registries.
pub fn register_builtins(
    tools: &mut ToolRegistry,
    resources: &mut ResourceRegistry,
    handle: &BridgeHandle,
) {
    tools.add(
        ToolDefinition::new(
            "echo",
            "Returns the given message unchanged. Useful for checking the connection.",
            InputSchema::new().required("message", PropertySchema::string("Text to echo back")),
        ),
        echo,
    );

    let broadcaster = handle.clone();
    tools.add(
        ToolDefinition::new(
            "broadcast",
            "Sends a log notification with the given message to every connected client.",
            InputSchema::new()
                .required("message", PropertySchema::string("Text to send"))
                .optional(
                    "level",
                    PropertySchema::string("Log level of the notification")
                        .with_enum(["debug", "info", "notice", "warning", "error"])
                        .with_default("info"),
                ),
        ),
        move |args| broadcast(&broadcaster, args),
    );

    let info_handle = handle.clone();
    resources.add(
        ResourceDefinition::new(SERVER_INFO_URI, "Server information")
            .with_description("Name, version and live connection statistics of this bridge")
            .with_mime_type("application/json"),
        move |uri| server_info(&info_handle, uri),
    );

    resources.add(
        ResourceDefinition::new(format!("{ECHO_RESOURCE_PREFIX}*"), "Echo")
            .with_description("Returns whatever follows the prefix in the requested URI")
            .with_mime_type("text/plain"),
        |uri| {
            let suffix = uri.strip_prefix(ECHO_RESOURCE_PREFIX).unwrap_or_default();
            Ok(ResourceContent::text(uri, suffix))
        },
    );
}

fn required_str<'a>(args: &'a Map, name: &str) -> Result<&'a str, HandlerError> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| HandlerError::invalid_argument(name, "expected a string"))
}

fn echo(args: &Map) -> Result<ToolCallResult, HandlerError> {
    required_str(args, "message").map(ToolCallResult::text)
}

fn broadcast(handle: &BridgeHandle, args: &Map) -> Result<ToolCallResult, HandlerError> {
    let message = required_str(args, "message")?;
    let level = match args.get("level") {
        None | Some(Value::Null) => "info",
        Some(value) => value
            .as_str()
            .ok_or_else(|| HandlerError::invalid_argument("level", "expected a string"))?,
    };

    let delivered = handle.notify_all(&OutgoingNotification::log_message(
        level,
        Value::from(message),
    ));
    Ok(ToolCallResult::text(format!(
        "Delivered to {delivered} connection(s)"
    )))
}

fn server_info(handle: &BridgeHandle, uri: &str) -> Result<ResourceContent, HandlerError> {
    let info: Map = [
        ("name", Value::from(SERVER_NAME)),
        ("version", Value::from(env!("CARGO_PKG_VERSION"))),
        ("protocolVersion", Value::from(MCP_PROTOCOL_VERSION)),
        ("connections", Value::from(handle.connection_count())),
        ("pendingMessages", Value::from(handle.pending())),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    ResourceContent::json(uri, &Value::Object(info))
        .map_err(|e| HandlerError::Execution(e.to_string()))
}
