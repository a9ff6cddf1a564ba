//! JSON-RPC engine.
//!
//! Turns one raw inbound frame into at most one outbound frame:
//!
//! 1. Parse the text; malformed JSON gets a `ParseError` with a `null` ID.
//! 2. Validate the envelope and decide request vs. notification from the
//!    presence of `id`, before any handler runs.
//! 3. Dispatch by method name to a built-in or application-registered handler.
//! 4. Requests get exactly one response. Notifications never get one, even
//!    when their handler fails; the failure is logged instead.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, info, warn};

use crate::json::{self, Map, Value};
use crate::mcp::protocol::{
    parse_message, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ServerCapabilities, ServerInfo, ToolCallParams, MCP_PROTOCOL_VERSION,
};
use crate::mcp::registry::{panic_message, ResourceRegistry, ToolRegistry};

/// Handler for an application-defined method.
pub type MethodHandler = Box<dyn Fn(&JsonRpcRequest) -> Result<Value, JsonRpcError> + Send>;

/// Methods answered by the engine itself. These cannot be overridden.
pub const BUILTIN_METHODS: &[&str] = &[
    "initialize",
    "initialized",
    "notifications/initialized",
    "ping",
    "tools/list",
    "tools/call",
    "resources/list",
    "resources/read",
    "prompts/list",
];

/// Dispatches parsed requests to handlers and builds responses.
pub struct RpcEngine {
    tools: ToolRegistry,
    resources: ResourceRegistry,
    methods: HashMap<String, MethodHandler>,
    server_info: ServerInfo,
}

impl Default for RpcEngine {
    fn default() -> Self {
        Self::new(ToolRegistry::new(), ResourceRegistry::new())
    }
}

impl RpcEngine {
    /// Creates an engine serving the given registries.
    #[must_use]
    pub fn new(tools: ToolRegistry, resources: ResourceRegistry) -> Self {
        Self {
            tools,
            resources,
            methods: HashMap::new(),
            server_info: ServerInfo::default(),
        }
    }

    /// Overrides the name/version reported by `initialize`.
    #[must_use]
    pub fn with_server_info(mut self, server_info: ServerInfo) -> Self {
        self.server_info = server_info;
        self
    }

    /// The tool registry.
    #[must_use]
    pub const fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// The tool registry, for registration.
    pub fn tools_mut(&mut self) -> &mut ToolRegistry {
        &mut self.tools
    }

    /// The resource registry.
    #[must_use]
    pub const fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    /// The resource registry, for registration.
    pub fn resources_mut(&mut self) -> &mut ResourceRegistry {
        &mut self.resources
    }

    /// Swaps in new registries, dropping the old ones.
    pub fn replace_registries(&mut self, tools: ToolRegistry, resources: ResourceRegistry) {
        self.tools = tools;
        self.resources = resources;
    }

    /// Registers an application-defined method.
    ///
    /// Returns `false` (and ignores the handler) if the name is empty or
    /// belongs to a built-in method.
    pub fn register_method<F>(&mut self, name: impl Into<String>, handler: F) -> bool
    where
        F: Fn(&JsonRpcRequest) -> Result<Value, JsonRpcError> + Send + 'static,
    {
        let name = name.into();
        if name.is_empty() || BUILTIN_METHODS.contains(&name.as_str()) {
            warn!(method = %name, "Refusing to register method");
            return false;
        }
        self.methods.insert(name, Box::new(handler));
        true
    }

    /// Removes an application-defined method.
    pub fn unregister_method(&mut self, name: &str) -> bool {
        self.methods.remove(name).is_some()
    }

    /// Drops all registrations: tools, resources and custom methods.
    pub fn clear(&mut self) {
        self.tools.clear();
        self.resources.clear();
        self.methods.clear();
    }

    /// Processes one raw frame and returns the response text, if any.
    #[must_use]
    pub fn process_message(&self, raw: &str) -> Option<String> {
        self.handle_message(raw).map(|response| response.to_json())
    }

    /// Processes one raw frame and returns the typed response, if any.
    #[must_use]
    pub fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        let request = match parse_message(raw) {
            Ok(request) => request,
            Err(response) => {
                debug!(error = ?response.error_data(), "Rejected malformed message");
                return Some(response);
            }
        };
        self.handle_request(&request)
    }

    /// Dispatches an already-parsed request.
    #[must_use]
    pub fn handle_request(&self, request: &JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, id = ?request.id, "Dispatching");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(request)))
            .unwrap_or_else(|payload| {
                Err(JsonRpcError::internal(format!(
                    "Internal error: {}",
                    panic_message(payload.as_ref())
                )))
            });

        let Some(id) = request.id.clone() else {
            if let Err(e) = outcome {
                warn!(method = %request.method, error = %e, "Notification failed; no response sent");
            }
            return None;
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    fn dispatch(&self, request: &JsonRpcRequest) -> Result<Value, JsonRpcError> {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request),
            "initialized" | "notifications/initialized" => {
                info!("Client finished initialisation");
                Ok(Value::object())
            }
            "ping" => Ok(Value::object()),
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tools_call(request),
            "resources/list" => self.handle_resources_list(),
            "resources/read" => self.handle_resources_read(request),
            "prompts/list" => Ok(single_entry("prompts", Value::Array(Vec::new()))),
            other => match self.methods.get(other) {
                Some(handler) => handler(request),
                None => Err(JsonRpcError::method_not_found(other)),
            },
        }
    }

    fn handle_initialize(&self, request: &JsonRpcRequest) -> Result<Value, JsonRpcError> {
        let params = request.params_object();
        let client = params
            .and_then(|p| p.get("clientInfo"))
            .and_then(|c| c.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let requested = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str)
            .unwrap_or("unspecified");
        info!(client = %client, requested_version = %requested, "Client initialising");

        to_result(&InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION,
            capabilities: ServerCapabilities::default(),
            server_info: self.server_info.clone(),
        })
    }

    fn handle_tools_list(&self) -> Result<Value, JsonRpcError> {
        Ok(single_entry("tools", to_result(&self.tools.definitions())?))
    }

    fn handle_tools_call(&self, request: &JsonRpcRequest) -> Result<Value, JsonRpcError> {
        let params = ToolCallParams::from_params(request.params_object())?;
        debug!(tool = %params.name, "Calling tool");
        let result = self.tools.execute(&params.name, &params.arguments);
        to_result(&result)
    }

    fn handle_resources_list(&self) -> Result<Value, JsonRpcError> {
        Ok(single_entry(
            "resources",
            to_result(&self.resources.definitions())?,
        ))
    }

    fn handle_resources_read(&self, request: &JsonRpcRequest) -> Result<Value, JsonRpcError> {
        let uri = request
            .params_object()
            .and_then(|p| p.get("uri"))
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| JsonRpcError::invalid_params("Missing required parameter: uri"))?;

        let content = self.resources.read(uri)?;
        Ok(single_entry(
            "contents",
            Value::Array(vec![to_result(&content)?]),
        ))
    }
}

fn single_entry(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

fn to_result<T: serde::Serialize + ?Sized>(value: &T) -> Result<Value, JsonRpcError> {
    json::to_value(value).map_err(|e| {
        tracing::error!(error = %e, "Failed to serialise result");
        JsonRpcError::internal("Internal error: failed to serialise result")
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::mcp::protocol::{
        ErrorCode, InputSchema, PropertySchema, RequestId, ResourceContent, ResourceDefinition,
        ToolCallResult, ToolDefinition,
    };

    fn engine() -> RpcEngine {
        let mut tools = ToolRegistry::new();
        tools.add(
            ToolDefinition::new(
                "echo",
                "Echoes a message",
                InputSchema::new().required("message", PropertySchema::string("Text")),
            ),
            |args| {
                Ok(ToolCallResult::text(
                    args.get("message").and_then(Value::as_str).unwrap_or_default(),
                ))
            },
        );
        let mut resources = ResourceRegistry::new();
        resources.add(ResourceDefinition::new("ns://thing/*", "things"), |uri| {
            Ok(ResourceContent::text(uri, "a thing"))
        });
        RpcEngine::new(tools, resources)
    }

    fn error_kind(response: &JsonRpcResponse) -> Option<ErrorCode> {
        response.error_data().and_then(JsonRpcError::kind)
    }

    #[test]
    fn ping_round_trip_exact_text() {
        let out = engine()
            .process_message(r#"{"jsonrpc":"2.0","id":1,"method":"ping","params":{}}"#)
            .unwrap();
        assert_eq!(out, r#"{"jsonrpc":"2.0","id":1,"result":{}}"#);
    }

    #[test]
    fn ids_are_echoed_exactly() {
        let engine = engine();
        let out = engine.process_message(r#"{"id":"abc","method":"ping"}"#).unwrap();
        assert!(out.contains(r#""id":"abc""#));
        let out = engine.process_message(r#"{"id":2.0,"method":"ping"}"#).unwrap();
        assert!(out.contains(r#""id":2.0"#));
        let out = engine.process_message(r#"{"id":2,"method":"ping"}"#).unwrap();
        assert!(out.contains(r#""id":2,"#));
    }

    #[test]
    fn notification_gets_no_response() {
        let engine = engine();
        assert!(engine
            .process_message(r#"{"jsonrpc":"2.0","method":"initialized"}"#)
            .is_none());
        assert!(engine.process_message(r#"{"method":"ping"}"#).is_none());
    }

    #[test]
    fn failing_notification_gets_no_response() {
        let engine = engine();
        assert!(engine.process_message(r#"{"method":"no/such/method"}"#).is_none());
        assert!(engine
            .process_message(r#"{"method":"tools/call","params":{}}"#)
            .is_none());
    }

    #[test]
    fn parse_error_has_null_id() {
        let response = engine().handle_message("{oops").unwrap();
        assert_eq!(response.id, RequestId::Null);
        assert_eq!(error_kind(&response), Some(ErrorCode::ParseError));
    }

    #[test]
    fn unknown_method_is_reported() {
        let response = engine()
            .handle_message(r#"{"id":5,"method":"scene/explode"}"#)
            .unwrap();
        assert_eq!(response.id, RequestId::from(5));
        assert_eq!(error_kind(&response), Some(ErrorCode::MethodNotFound));
        assert!(response.error_data().unwrap().message.contains("scene/explode"));
    }

    #[test]
    fn initialize_advertises_capabilities() {
        let response = engine()
            .handle_message(
                r#"{"id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","clientInfo":{"name":"t"}}}"#,
            )
            .unwrap();
        let result = response.result().unwrap();
        assert_eq!(
            result.get("protocolVersion").and_then(Value::as_str),
            Some(MCP_PROTOCOL_VERSION)
        );
        let caps = result.get("capabilities").unwrap();
        assert!(caps.get("tools").is_some());
        assert!(caps.get("resources").is_some());
        assert!(caps.get("prompts").is_some());
        assert!(result.get("serverInfo").and_then(|s| s.get("name")).is_some());
    }

    #[test]
    fn tools_list_returns_definitions() {
        let response = engine().handle_message(r#"{"id":1,"method":"tools/list"}"#).unwrap();
        let tools = response.result().unwrap().get("tools").unwrap().as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].get("name").and_then(Value::as_str), Some("echo"));
        assert!(tools[0].get("inputSchema").is_some());
    }

    #[test]
    fn tools_call_success() {
        let out = engine()
            .process_message(
                r#"{"id":1,"method":"tools/call","params":{"name":"echo","arguments":{"message":"hi"}}}"#,
            )
            .unwrap();
        assert_eq!(
            out,
            r#"{"jsonrpc":"2.0","id":1,"result":{"content":[{"type":"text","text":"hi"}],"isError":false}}"#
        );
    }

    #[test]
    fn tools_call_missing_tool_is_error_result() {
        let response = engine()
            .handle_message(
                r#"{"id":1,"method":"tools/call","params":{"name":"missing_tool","arguments":{}}}"#,
            )
            .unwrap();
        let result = response.result().unwrap();
        assert_eq!(result.get("isError").and_then(Value::as_bool), Some(true));
        assert!(result.to_string().contains("missing_tool"));
    }

    #[test]
    fn tools_call_without_name_is_invalid_params() {
        let response = engine()
            .handle_message(r#"{"id":1,"method":"tools/call","params":{"arguments":{}}}"#)
            .unwrap();
        assert_eq!(error_kind(&response), Some(ErrorCode::InvalidParams));
    }

    #[test]
    fn resources_read_and_list() {
        let engine = engine();
        let response = engine
            .handle_message(r#"{"id":1,"method":"resources/read","params":{"uri":"ns://thing/42"}}"#)
            .unwrap();
        let contents = response.result().unwrap().get("contents").unwrap();
        assert_eq!(
            contents.as_array().unwrap()[0].get("uri").and_then(Value::as_str),
            Some("ns://thing/42")
        );

        let response = engine.handle_message(r#"{"id":2,"method":"resources/list"}"#).unwrap();
        let listed = response.result().unwrap().get("resources").unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[test]
    fn resources_read_errors() {
        let engine = engine();
        let response = engine
            .handle_message(r#"{"id":1,"method":"resources/read","params":{"uri":"ns://nope"}}"#)
            .unwrap();
        assert_eq!(error_kind(&response), Some(ErrorCode::ResourceNotFound));

        let response = engine
            .handle_message(r#"{"id":1,"method":"resources/read","params":{}}"#)
            .unwrap();
        assert_eq!(error_kind(&response), Some(ErrorCode::InvalidParams));
    }

    #[test]
    fn prompts_list_is_empty() {
        let out = engine().process_message(r#"{"id":1,"method":"prompts/list"}"#).unwrap();
        assert_eq!(out, r#"{"jsonrpc":"2.0","id":1,"result":{"prompts":[]}}"#);
    }

    #[test]
    fn custom_methods() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut engine = engine();
        assert!(engine.register_method("host/state", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::from("playing"))
        }));
        assert!(!engine.register_method("ping", |_| Ok(Value::Null)));

        let out = engine.process_message(r#"{"id":1,"method":"host/state"}"#).unwrap();
        assert!(out.contains(r#""result":"playing""#));
        assert!(engine.process_message(r#"{"method":"host/state"}"#).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(engine.unregister_method("host/state"));
        let response = engine.handle_message(r#"{"id":1,"method":"host/state"}"#).unwrap();
        assert_eq!(error_kind(&response), Some(ErrorCode::MethodNotFound));
    }

    #[test]
    fn panicking_method_becomes_internal_error() {
        let mut engine = engine();
        engine.register_method("host/crash", |_| panic!("host exploded"));
        let response = engine.handle_message(r#"{"id":9,"method":"host/crash"}"#).unwrap();
        assert_eq!(response.id, RequestId::from(9));
        assert_eq!(error_kind(&response), Some(ErrorCode::InternalError));
        assert!(response.error_data().unwrap().message.contains("host exploded"));
    }

    #[test]
    fn clear_drops_everything() {
        let mut engine = engine();
        engine.register_method("x/y", |_| Ok(Value::Null));
        engine.clear();
        assert!(engine.tools().is_empty());
        assert!(engine.resources().is_empty());
        let response = engine.handle_message(r#"{"id":1,"method":"x/y"}"#).unwrap();
        assert_eq!(error_kind(&response), Some(ErrorCode::MethodNotFound));
    }
}
