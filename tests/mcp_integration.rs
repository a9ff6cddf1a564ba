//! Integration tests for MCP protocol handling.
//!
//! These tests drive a `BridgeServer` the way an embedding host would: frames
//! go in through the handle, the host ticks the dispatcher, and responses are
//! read back from a recording connection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use host_bridge_mcp::config::DispatchConfig;
use host_bridge_mcp::json::{self, Map, Value};
use host_bridge_mcp::mcp::builtin::builtin_registries;
use host_bridge_mcp::mcp::connections::{Connection, ConnectionId, TransportError};
use host_bridge_mcp::mcp::protocol::{
    InputSchema, PropertySchema, ResourceContent, ResourceDefinition, ToolCallResult,
    ToolDefinition,
};
use host_bridge_mcp::mcp::registry::{ResourceRegistry, ToolRegistry};
use host_bridge_mcp::mcp::server::{BridgeHandle, BridgeServer};

#[derive(Default)]
struct Client {
    frames: Mutex<Vec<String>>,
}

impl Connection for Client {
    fn send(&self, text: &str) -> Result<(), TransportError> {
        self.frames.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

impl Client {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.frames.lock().unwrap())
    }
}

struct Harness {
    server: BridgeServer,
    handle: BridgeHandle,
    client: Arc<Client>,
    id: ConnectionId,
}

impl Harness {
    fn new(tools: ToolRegistry, resources: ResourceRegistry) -> Self {
        let settings = DispatchConfig {
            max_messages_per_tick: 64,
            ..DispatchConfig::default()
        };
        let mut server = BridgeServer::new(&settings);
        server.initialize(tools, resources);
        let handle = server.handle();
        let client = Arc::new(Client::default());
        let id = handle.open_connection(client.clone());
        Self {
            server,
            handle,
            client,
            id,
        }
    }

    fn with_builtins() -> Self {
        let mut harness = Self::new(ToolRegistry::new(), ResourceRegistry::new());
        let (tools, resources) = builtin_registries(&harness.handle);
        harness.server.initialize(tools, resources);
        harness
    }

    /// Sends one frame, runs a tick and returns whatever came back.
    fn call(&mut self, frame: &str) -> Vec<String> {
        self.handle.enqueue(frame, self.id).unwrap();
        self.server.drain_tick();
        self.client.take()
    }

    fn call_one(&mut self, frame: &str) -> Value {
        let frames = self.call(frame);
        assert_eq!(frames.len(), 1, "expected exactly one response to {frame}");
        json::from_str(&frames[0]).unwrap()
    }
}

fn error_code(response: &Value) -> Option<i64> {
    response.get("error")?.get("code")?.as_i64()
}

fn counting_registry(calls: &Arc<AtomicUsize>) -> ToolRegistry {
    let counter = Arc::clone(calls);
    let mut tools = ToolRegistry::new();
    tools.add(
        ToolDefinition::new(
            "read_file",
            "Reads a file",
            InputSchema::new().required("path", PropertySchema::string("File path")),
        ),
        move |args| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(ToolCallResult::text(
                args.get("path").and_then(Value::as_str).unwrap_or_default(),
            ))
        },
    );
    tools
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_ping_exact_response() {
    let mut harness = Harness::new(ToolRegistry::new(), ResourceRegistry::new());
    let frames = harness.call(r#"{"jsonrpc":"2.0","id":1,"method":"ping","params":{}}"#);
    assert_eq!(frames, [r#"{"jsonrpc":"2.0","id":1,"result":{}}"#]);
}

#[test]
fn test_initialize_handshake() {
    let mut harness = Harness::with_builtins();
    let response = harness.call_one(
        r#"{
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {
                    "name": "test-client",
                    "version": "1.0.0"
                }
            }
        }"#,
    );
    let result = response.get("result").unwrap();
    assert_eq!(
        result.get("protocolVersion").and_then(Value::as_str),
        Some("2024-11-05")
    );
    assert_eq!(
        result
            .get("serverInfo")
            .and_then(|s| s.get("name"))
            .and_then(Value::as_str),
        Some("host-bridge-mcp")
    );

    let frames = harness.call(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#);
    assert!(frames.is_empty());
}

// =============================================================================
// Request/Notification Tests
// =============================================================================

#[test]
fn test_response_id_matches_request_id() {
    let mut harness = Harness::new(ToolRegistry::new(), ResourceRegistry::new());
    for id in [r#""req-7""#, "42", "1.5", "null", "-3"] {
        let frames = harness.call(&format!(r#"{{"jsonrpc":"2.0","id":{id},"method":"ping"}}"#));
        assert_eq!(frames.len(), 1);
        assert!(
            frames[0].contains(&format!(r#""id":{id},"#)),
            "id {id} not echoed in {}",
            frames[0]
        );
    }
}

#[test]
fn test_notifications_never_answered() {
    let mut harness = Harness::new(ToolRegistry::new(), ResourceRegistry::new());
    assert!(harness.call(r#"{"jsonrpc":"2.0","method":"ping"}"#).is_empty());
    assert!(harness.call(r#"{"jsonrpc":"2.0","method":"unknown/thing"}"#).is_empty());
    assert!(harness
        .call(r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"nope"}}"#)
        .is_empty());
}

#[test]
fn test_parse_error_uses_null_id() {
    let mut harness = Harness::new(ToolRegistry::new(), ResourceRegistry::new());
    let response = harness.call_one("not valid json");
    assert_eq!(response.get("id"), Some(&Value::Null));
    assert_eq!(error_code(&response), Some(-32700));
}

#[test]
fn test_invalid_requests() {
    let mut harness = Harness::new(ToolRegistry::new(), ResourceRegistry::new());

    let response = harness.call_one("[1,2,3]");
    assert_eq!(error_code(&response), Some(-32600));

    let response = harness.call_one(r#"{"jsonrpc":"2.0","id":4}"#);
    assert_eq!(error_code(&response), Some(-32600));
    assert_eq!(response.get("id").and_then(Value::as_i64), Some(4));

    let frames = harness.call(r#"{"jsonrpc":"1.0","id":7,"method":"ping"}"#);
    assert_eq!(frames.len(), 1);
    assert!(frames[0].contains(r#""id":7,"#), "id not echoed in {}", frames[0]);
    assert!(frames[0].contains("-32600"));
}

#[test]
fn test_unknown_method() {
    let mut harness = Harness::new(ToolRegistry::new(), ResourceRegistry::new());
    let response = harness.call_one(r#"{"jsonrpc":"2.0","id":3,"method":"scene/save"}"#);
    assert_eq!(error_code(&response), Some(-32601));
}

// =============================================================================
// Tool Tests
// =============================================================================

#[test]
fn test_missing_tool_is_error_result() {
    let mut harness = Harness::new(ToolRegistry::new(), ResourceRegistry::new());
    let response = harness.call_one(
        r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"missing_tool","arguments":{}}}"#,
    );
    let result = response.get("result").unwrap();
    assert_eq!(result.get("isError").and_then(Value::as_bool), Some(true));
    assert!(result.to_string().contains("missing_tool"));
}

#[test]
fn test_missing_required_argument_skips_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut harness = Harness::new(counting_registry(&calls), ResourceRegistry::new());

    let response = harness.call_one(
        r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"read_file","arguments":{}}}"#,
    );
    let result = response.get("result").unwrap();
    assert_eq!(result.get("isError").and_then(Value::as_bool), Some(true));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let response = harness.call_one(
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"read_file","arguments":{"path":"a.txt"}}}"#,
    );
    let result = response.get("result").unwrap();
    assert_eq!(result.get("isError").and_then(Value::as_bool), Some(false));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unregistrable_tool_is_never_listed() {
    let mut tools = ToolRegistry::new();
    assert!(!tools.register(
        ToolDefinition::new("", "nameless", InputSchema::new()),
        Some(Box::new(|_: &Map| Ok(ToolCallResult::text("x")))),
    ));
    assert!(!tools.register(
        ToolDefinition::new("handlerless", "no handler", InputSchema::new()),
        None,
    ));
    assert!(!tools.has("handlerless"));

    let mut harness = Harness::new(tools, ResourceRegistry::new());
    let response = harness.call_one(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#);
    let listed = response.get("result").and_then(|r| r.get("tools")).unwrap();
    assert_eq!(listed.as_array().map(Vec::len), Some(0));
}

#[test]
fn test_builtin_echo_tool() {
    let mut harness = Harness::with_builtins();
    let frames = harness.call(
        r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"echo","arguments":{"message":"héllo"}}}"#,
    );
    assert_eq!(
        frames,
        [r#"{"jsonrpc":"2.0","id":1,"result":{"content":[{"type":"text","text":"héllo"}],"isError":false}}"#]
    );
}

#[test]
fn test_builtin_broadcast_reaches_all_clients() {
    let mut harness = Harness::with_builtins();
    let other = Arc::new(Client::default());
    harness.handle.open_connection(other.clone());

    let frames = harness.call(
        r#"{"jsonrpc":"2.0","id":9,"method":"tools/call","params":{"name":"broadcast","arguments":{"message":"saved"}}}"#,
    );
    // The notification goes out during the handler, before the response.
    assert_eq!(frames.len(), 2);
    assert!(frames[0].contains("notifications/message"));
    assert!(frames[1].contains(r#""id":9"#));

    let seen = other.take();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].contains(r#""data":"saved""#));
}

// =============================================================================
// Resource Tests
// =============================================================================

#[test]
fn test_wildcard_resource_read() {
    let mut resources = ResourceRegistry::new();
    resources.add(ResourceDefinition::new("ns://thing/*", "Things"), |uri| {
        Ok(ResourceContent::text(uri, "thing"))
    });
    let mut harness = Harness::new(ToolRegistry::new(), resources);

    let response = harness.call_one(
        r#"{"jsonrpc":"2.0","id":1,"method":"resources/read","params":{"uri":"ns://thing/42"}}"#,
    );
    let contents = response
        .get("result")
        .and_then(|r| r.get("contents"))
        .and_then(Value::as_array)
        .unwrap();
    assert_eq!(contents[0].get("uri").and_then(Value::as_str), Some("ns://thing/42"));

    let response = harness.call_one(
        r#"{"jsonrpc":"2.0","id":2,"method":"resources/read","params":{"uri":"ns://other/1"}}"#,
    );
    assert_eq!(error_code(&response), Some(-32002));
}

#[test]
fn test_builtin_resources() {
    let mut harness = Harness::with_builtins();

    let response = harness.call_one(r#"{"jsonrpc":"2.0","id":1,"method":"resources/list"}"#);
    let listed = response.get("result").and_then(|r| r.get("resources")).unwrap();
    assert_eq!(listed.as_array().map(Vec::len), Some(2));

    let response = harness.call_one(
        r#"{"jsonrpc":"2.0","id":2,"method":"resources/read","params":{"uri":"bridge://echo/abc"}}"#,
    );
    let text = response
        .get("result")
        .and_then(|r| r.get("contents"))
        .and_then(Value::as_array)
        .and_then(|c| c[0].get("text"))
        .and_then(Value::as_str);
    assert_eq!(text, Some("abc"));

    let response = harness.call_one(
        r#"{"jsonrpc":"2.0","id":3,"method":"resources/read","params":{"uri":"bridge://server/info"}}"#,
    );
    assert!(response.get("result").is_some());
}

#[test]
fn test_prompts_list_empty() {
    let mut harness = Harness::new(ToolRegistry::new(), ResourceRegistry::new());
    let frames = harness.call(r#"{"jsonrpc":"2.0","id":1,"method":"prompts/list"}"#);
    assert_eq!(frames, [r#"{"jsonrpc":"2.0","id":1,"result":{"prompts":[]}}"#]);
}
