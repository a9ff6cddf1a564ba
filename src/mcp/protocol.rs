//! JSON-RPC 2.0 message types for the bridge protocol.
//!
//! This module defines the envelopes exchanged with clients and the MCP
//! result records built on top of them. All messages are carried as
//! [`Value`] and written with the crate's own codec.
//!
//! # Message Types
//!
//! - **Request**: A message expecting a response (has `id`)
//! - **Notification**: A one-way message (no `id`, no response expected)
//! - **Response**: A reply to a request, carrying exactly one of `result` or `error`
//!
//! # Request IDs
//!
//! IDs are echoed back verbatim. An integer ID stays an integer and a
//! floating-point ID stays floating-point, so `1` and `1.0` produce
//! different responses.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

use crate::json::{self, Map, Number, Value};

/// The MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "host-bridge-mcp";

/// The only JSON-RPC version accepted.
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC 2.0 request ID.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestId {
    /// Numeric request ID (integer or floating-point).
    Number(Number),
    /// String request ID.
    String(String),
    /// Explicit `null`, also used when the ID could not be determined.
    Null,
}

impl RequestId {
    /// Reads an ID from a parsed value.
    ///
    /// Returns `None` for types that cannot be IDs (booleans, arrays, objects).
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self::Number(*n)),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Null => Some(Self::Null),
            _ => None,
        }
    }

    /// Converts the ID back into a value for writing.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Number(n) => Value::Number(*n),
            Self::String(s) => Value::String(s.clone()),
            Self::Null => Value::Null,
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(Number::Int(n))
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Null => f.write_str("null"),
        }
    }
}

/// An incoming JSON-RPC 2.0 request or notification.
///
/// Whether the message is a notification is decided once, at parse time,
/// from the presence of the `id` member.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    /// Request identifier. `None` means this is a notification.
    pub id: Option<RequestId>,

    /// The method to invoke.
    pub method: String,

    /// Optional parameters for the method.
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a request with an ID.
    #[must_use]
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// Creates a notification (no ID).
    #[must_use]
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id: None,
            method: method.into(),
            params,
        }
    }

    /// Returns `true` if no response may be sent for this message.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Returns the parameters if they are an object.
    #[must_use]
    pub fn params_object(&self) -> Option<&Map> {
        self.params.as_ref().and_then(Value::as_object)
    }

    /// Writes the request as JSON text, as a client would send it.
    #[must_use]
    pub fn to_json(&self) -> String {
        let mut map = Map::new();
        map.insert("jsonrpc".to_string(), Value::from(JSONRPC_VERSION));
        if let Some(id) = &self.id {
            map.insert("id".to_string(), id.to_value());
        }
        map.insert("method".to_string(), Value::from(self.method.as_str()));
        if let Some(params) = &self.params {
            map.insert("params".to_string(), params.clone());
        }
        json::write_compact(&Value::Object(map))
    }
}

/// JSON-RPC error codes: the standard range plus the bridge's own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The JSON sent is not a valid Request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
    /// The named tool is not registered.
    ToolNotFound,
    /// No resource matches the requested URI.
    ResourceNotFound,
    /// A handler failed while executing.
    ExecutionError,
    /// A handler gave up waiting.
    TimeoutError,
    /// The embedding host rejected the operation.
    HostError,
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ToolNotFound => -32001,
            Self::ResourceNotFound => -32002,
            Self::ExecutionError => -32003,
            Self::TimeoutError => -32004,
            Self::HostError => -32005,
        }
    }

    /// Returns the default message for this error code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::ToolNotFound => "Tool not found",
            Self::ResourceNotFound => "Resource not found",
            Self::ExecutionError => "Execution error",
            Self::TimeoutError => "Timeout",
            Self::HostError => "Host error",
        }
    }

    /// Looks up a code by its numeric value.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32603 => Self::InternalError,
            -32001 => Self::ToolNotFound,
            -32002 => Self::ResourceNotFound,
            -32003 => Self::ExecutionError,
            -32004 => Self::TimeoutError,
            -32005 => Self::HostError,
            _ => return None,
        })
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} ({code})")]
pub struct JsonRpcError {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional information about the error.
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Creates a new error from an error code.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.default_message().to_string(),
            data: None,
        }
    }

    /// Creates a new error with a custom message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Adds additional data to the error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Creates a method not found error.
    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::with_message(
            ErrorCode::MethodNotFound,
            format!("Method not found: {method}"),
        )
    }

    /// Creates an invalid params error.
    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidParams, message)
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, message)
    }

    /// Returns the matching [`ErrorCode`], if the code is one of ours.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }

    fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("code".to_string(), Value::from(self.code));
        map.insert("message".to_string(), Value::from(self.message.as_str()));
        if let Some(data) = &self.data {
            map.insert("data".to_string(), data.clone());
        }
        Value::Object(map)
    }
}

/// The payload of a response: exactly one of result or error.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    /// The method succeeded.
    Result(Value),
    /// The method failed.
    Error(JsonRpcError),
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcResponse {
    /// The request ID this response corresponds to (`Null` if unknown).
    pub id: RequestId,

    /// The outcome.
    pub payload: ResponsePayload,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    pub const fn success(id: RequestId, result: Value) -> Self {
        Self {
            id,
            payload: ResponsePayload::Result(result),
        }
    }

    /// Creates a new error response.
    #[must_use]
    pub const fn error(id: RequestId, error: JsonRpcError) -> Self {
        Self {
            id,
            payload: ResponsePayload::Error(error),
        }
    }

    /// Creates a parse error response (ID cannot be determined).
    #[must_use]
    pub fn parse_error(detail: impl Into<String>) -> Self {
        Self::error(
            RequestId::Null,
            JsonRpcError::with_message(ErrorCode::ParseError, detail),
        )
    }

    /// Creates an invalid request error response.
    #[must_use]
    pub fn invalid_request(id: RequestId, detail: impl Into<String>) -> Self {
        Self::error(
            id,
            JsonRpcError::with_message(ErrorCode::InvalidRequest, detail),
        )
    }

    /// Returns the result if this is a success response.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        match &self.payload {
            ResponsePayload::Result(value) => Some(value),
            ResponsePayload::Error(_) => None,
        }
    }

    /// Returns the error if this is an error response.
    #[must_use]
    pub const fn error_data(&self) -> Option<&JsonRpcError> {
        match &self.payload {
            ResponsePayload::Result(_) => None,
            ResponsePayload::Error(error) => Some(error),
        }
    }

    /// Builds the wire representation.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("jsonrpc".to_string(), Value::from(JSONRPC_VERSION));
        map.insert("id".to_string(), self.id.to_value());
        match &self.payload {
            ResponsePayload::Result(value) => {
                map.insert("result".to_string(), value.clone());
            }
            ResponsePayload::Error(error) => {
                map.insert("error".to_string(), error.to_value());
            }
        }
        Value::Object(map)
    }

    /// Writes the response as compact JSON text.
    #[must_use]
    pub fn to_json(&self) -> String {
        json::write_compact(&self.to_value())
    }
}

/// An outgoing JSON-RPC 2.0 notification (server to client).
///
/// Used for sending progress updates and other notifications.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingNotification {
    /// The notification method.
    pub method: String,

    /// Optional parameters for the notification.
    pub params: Option<Value>,
}

impl OutgoingNotification {
    /// Creates a new outgoing notification.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Creates a progress notification.
    #[must_use]
    pub fn progress(
        progress_token: &str,
        progress: u32,
        total: Option<u32>,
        message: Option<&str>,
    ) -> Self {
        let mut params = Map::new();
        params.insert("progressToken".to_string(), Value::from(progress_token));
        params.insert("progress".to_string(), Value::from(progress));
        params.insert("total".to_string(), Value::from(total));
        params.insert("message".to_string(), Value::from(message));
        Self::new("notifications/progress", Some(Value::Object(params)))
    }

    /// Creates a log message notification.
    #[must_use]
    pub fn log_message(level: &str, data: Value) -> Self {
        let mut params = Map::new();
        params.insert("level".to_string(), Value::from(level));
        params.insert("logger".to_string(), Value::from(SERVER_NAME));
        params.insert("data".to_string(), data);
        Self::new("notifications/message", Some(Value::Object(params)))
    }

    /// Tells clients that the tool list has changed.
    #[must_use]
    pub fn tools_list_changed() -> Self {
        Self::new("notifications/tools/list_changed", None)
    }

    /// Writes the notification as compact JSON text.
    #[must_use]
    pub fn to_json(&self) -> String {
        JsonRpcRequest::notification(self.method.clone(), self.params.clone()).to_json()
    }
}

/// Parses a JSON string into a request or notification.
///
/// Failures come back as a ready-made error response. Failures found before
/// the `id` is known carry a `null` ID.
///
/// # Errors
///
/// Returns a `JsonRpcResponse` with a `ParseError` if the text is not JSON,
/// or `InvalidRequest` if it is not a well-formed request object.
pub fn parse_message(text: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value = json::from_str(text).map_err(|e| JsonRpcResponse::parse_error(e.to_string()))?;

    let Value::Object(mut obj) = value else {
        return Err(JsonRpcResponse::invalid_request(
            RequestId::Null,
            "Request must be a JSON object",
        ));
    };

    // Presence of the member, not its value, makes this a request.
    let id = match obj.get("id") {
        Some(raw) => Some(RequestId::from_value(raw).ok_or_else(|| {
            JsonRpcResponse::invalid_request(
                RequestId::Null,
                "id must be a string, number or null",
            )
        })?),
        None => None,
    };

    if let Some(version) = obj.get("jsonrpc") {
        if version.as_str() != Some(JSONRPC_VERSION) {
            return Err(JsonRpcResponse::invalid_request(
                id.unwrap_or(RequestId::Null),
                "jsonrpc field must be \"2.0\"",
            ));
        }
    }

    let method = match obj.get("method").and_then(Value::as_str) {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => {
            return Err(JsonRpcResponse::invalid_request(
                id.unwrap_or(RequestId::Null),
                "method field must be a non-empty string",
            ))
        }
    };

    let params = obj.swap_remove("params").filter(|p| !p.is_null());

    Ok(JsonRpcRequest { id, method, params })
}

/// A flag object advertising whether a list can change during the session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListChangedCapability {
    /// Whether the list can change during the session.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Resource-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCapabilities {
    /// Whether clients can subscribe to resource updates.
    pub subscribe: bool,
    /// Whether the resource list can change during the session.
    pub list_changed: bool,
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    pub tools: ListChangedCapability,
    /// Resource-related capabilities.
    pub resources: ResourceCapabilities,
    /// Prompt-related capabilities. Prompts are never offered.
    pub prompts: ListChangedCapability,
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Result of the `initialize` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Protocol version the server speaks.
    pub protocol_version: &'static str,
    /// What the server offers.
    pub capabilities: ServerCapabilities,
    /// Who the server is.
    pub server_info: ServerInfo,
}

/// Schema for a single tool argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySchema {
    /// JSON type name ("string", "number", ...).
    pub r#type: String,
    /// What the argument means.
    pub description: Option<String>,
    /// Allowed values, if restricted.
    pub r#enum: Option<Vec<String>>,
    /// Value used when the argument is omitted.
    pub default: Option<Value>,
}

impl PropertySchema {
    /// Creates a property of the given JSON type.
    #[must_use]
    pub fn new(kind: &str, description: impl Into<String>) -> Self {
        Self {
            r#type: kind.to_string(),
            description: Some(description.into()),
            r#enum: None,
            default: None,
        }
    }

    /// A string property.
    #[must_use]
    pub fn string(description: impl Into<String>) -> Self {
        Self::new("string", description)
    }

    /// A number property.
    #[must_use]
    pub fn number(description: impl Into<String>) -> Self {
        Self::new("number", description)
    }

    /// An integer property.
    #[must_use]
    pub fn integer(description: impl Into<String>) -> Self {
        Self::new("integer", description)
    }

    /// A boolean property.
    #[must_use]
    pub fn boolean(description: impl Into<String>) -> Self {
        Self::new("boolean", description)
    }

    /// An object property.
    #[must_use]
    pub fn object(description: impl Into<String>) -> Self {
        Self::new("object", description)
    }

    /// Restricts the property to a fixed set of values.
    #[must_use]
    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.r#enum = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Input schema of a tool: named properties plus the required subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSchema {
    /// Always "object".
    pub r#type: &'static str,
    /// Argument schemas by name.
    pub properties: IndexMap<String, PropertySchema>,
    /// Names of arguments that must be present and non-null.
    pub required: Vec<String>,
}

impl Default for InputSchema {
    fn default() -> Self {
        Self {
            r#type: "object",
            properties: IndexMap::new(),
            required: Vec::new(),
        }
    }
}

impl InputSchema {
    /// Creates a schema with no properties.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required property.
    #[must_use]
    pub fn required(mut self, name: impl Into<String>, schema: PropertySchema) -> Self {
        let name = name.into();
        if !self.required.contains(&name) {
            self.required.push(name.clone());
        }
        self.properties.insert(name, schema);
        self
    }

    /// Adds an optional property.
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, schema: PropertySchema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }
}

/// A tool definition for tools/list response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Schema for the tool's input parameters.
    pub input_schema: InputSchema,
}

impl ToolDefinition {
    /// Creates a definition.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, schema: InputSchema) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            input_schema: schema,
        }
    }
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool (empty if omitted).
    pub arguments: Map,
}

impl ToolCallParams {
    /// Extracts `name` and `arguments` from request parameters.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidParams` error if `name` is missing or `arguments`
    /// is present but not an object.
    pub fn from_params(params: Option<&Map>) -> Result<Self, JsonRpcError> {
        let params = params.ok_or_else(|| JsonRpcError::invalid_params("Missing tool call params"))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| JsonRpcError::invalid_params("Missing required parameter: name"))?;
        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(args)) => args.clone(),
            Some(other) => {
                return Err(JsonRpcError::invalid_params(format!(
                    "arguments must be an object, found {}",
                    other.type_name()
                )))
            }
        };
        Ok(Self {
            name: name.to_string(),
            arguments,
        })
    }
}

/// Content item in a tool call response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

impl ToolContent {
    /// Returns the text of this item.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Text { text } => text,
        }
    }
}

/// Result of a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    pub is_error: bool,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates a successful result holding a structured value as JSON text.
    ///
    /// Falls back to an error result if the value cannot be serialised.
    #[must_use]
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        match json::to_string_pretty(value) {
            Ok(text) => Self::text(text),
            Err(e) => Self::error(format!("Failed to serialise tool result: {e}")),
        }
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// Concatenated text of all content items.
    #[must_use]
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(ToolContent::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A resource definition for resources/list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    /// URI, possibly containing a `*` wildcard.
    pub uri: String,
    /// Short name.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// MIME type of the content.
    pub mime_type: Option<String>,
}

impl ResourceDefinition {
    /// Creates a definition.
    #[must_use]
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: None,
            mime_type: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Content of a resource returned by resources/read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContent {
    /// The URI that was read.
    pub uri: String,
    /// MIME type of the content.
    pub mime_type: Option<String>,
    /// The content.
    pub text: String,
}

impl ResourceContent {
    /// Creates plain text content.
    #[must_use]
    pub fn text(uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: Some("text/plain".to_string()),
            text: text.into(),
        }
    }

    /// Creates JSON content from any serialisable value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialised.
    pub fn json<T: Serialize + ?Sized>(uri: impl Into<String>, value: &T) -> json::Result<Self> {
        Ok(Self {
            uri: uri.into(),
            mime_type: Some("application/json".to_string()),
            text: json::to_string_pretty(value)?,
        })
    }
}
