//! Tool and resource registries.
//!
//! Each registry is a name-keyed table of (definition, handler) pairs owned
//! by the dispatch side. Handlers are supplied by the embedding application
//! and run on the execution thread.
//!
//! Failures inside a handler never escape the registry: returned errors and
//! panics are both turned into results the protocol layer can report.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::json::{Map, Value};
use crate::mcp::protocol::{
    ErrorCode, JsonRpcError, ResourceContent, ResourceDefinition, ToolCallResult, ToolDefinition,
};

/// Marker that turns a registered resource URI into a prefix pattern.
pub const WILDCARD: char = '*';

/// Errors a tool or resource handler can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// An argument has the wrong type or an unacceptable value.
    #[error("Invalid parameter '{name}': {message}")]
    InvalidArgument {
        /// Argument name.
        name: String,
        /// Description of what's wrong.
        message: String,
    },

    /// The operation itself failed.
    #[error("{0}")]
    Execution(String),

    /// The embedding host refused or could not perform the operation.
    #[error("Host error: {0}")]
    Host(String),

    /// The handler gave up waiting.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

impl HandlerError {
    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    /// The RPC error code this failure maps to.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument { .. } => ErrorCode::InvalidParams,
            Self::Execution(_) => ErrorCode::ExecutionError,
            Self::Host(_) => ErrorCode::HostError,
            Self::Timeout(_) => ErrorCode::TimeoutError,
        }
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::Execution(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::Execution(message.to_string())
    }
}

/// Handler for a tool: receives the call arguments.
pub type ToolHandler = Box<dyn Fn(&Map) -> Result<ToolCallResult, HandlerError> + Send>;

/// Handler for a resource: receives the URI that was requested, which for a
/// wildcard registration differs from the registered URI.
pub type ResourceHandler = Box<dyn Fn(&str) -> Result<ResourceContent, HandlerError> + Send>;

/// Extracts a printable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

struct ToolBinding {
    definition: ToolDefinition,
    handler: ToolHandler,
}

/// Registry of callable tools, in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, ToolBinding>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool.
    ///
    /// A definition with an empty name, or a missing handler, is logged and
    /// ignored. Registering an existing name replaces the previous binding.
    ///
    /// Returns `true` if the tool was stored.
    pub fn register(&mut self, definition: ToolDefinition, handler: Option<ToolHandler>) -> bool {
        if definition.name.is_empty() {
            warn!("Ignoring tool registration with an empty name");
            return false;
        }
        let Some(handler) = handler else {
            warn!(tool = %definition.name, "Ignoring tool registration without a handler");
            return false;
        };

        debug!(tool = %definition.name, "Registered tool");
        self.tools.insert(
            definition.name.clone(),
            ToolBinding {
                definition,
                handler,
            },
        );
        true
    }

    /// Registers a tool from a closure.
    pub fn add<F>(&mut self, definition: ToolDefinition, handler: F) -> bool
    where
        F: Fn(&Map) -> Result<ToolCallResult, HandlerError> + Send + 'static,
    {
        self.register(definition, Some(Box::new(handler)))
    }

    /// Removes a tool. Returns `true` if it was registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.tools.shift_remove(name).is_some()
    }

    /// Returns `true` if a tool with this name is registered.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Returns the definition of a tool.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name).map(|b| &b.definition)
    }

    /// Returns all definitions in registration order.
    #[must_use]
    pub fn definitions(&self) -> Vec<&ToolDefinition> {
        self.tools.values().map(|b| &b.definition).collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Drops every registration.
    pub fn clear(&mut self) {
        self.tools.clear();
    }

    /// Runs a tool.
    ///
    /// Unknown tools, missing required arguments, handler errors and handler
    /// panics all come back as an error result (`is_error = true`); the
    /// handler is not called when validation fails.
    #[must_use]
    pub fn execute(&self, name: &str, args: &Map) -> ToolCallResult {
        let Some(binding) = self.tools.get(name) else {
            return ToolCallResult::error(format!("Tool not found: {name}"));
        };

        for field in &binding.definition.input_schema.required {
            if args.get(field).map_or(true, Value::is_null) {
                return ToolCallResult::error(format!(
                    "Missing required parameter '{field}' for tool '{name}'"
                ));
            }
        }

        match panic::catch_unwind(AssertUnwindSafe(|| (binding.handler)(args))) {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(tool = %name, error = %e, "Tool handler failed");
                ToolCallResult::error(e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(tool = %name, panic = %message, "Tool handler panicked");
                ToolCallResult::error(format!("Tool '{name}' failed: {message}"))
            }
        }
    }
}

/// Errors from reading a resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// No registration matches the URI.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The handler reported a failure.
    #[error(transparent)]
    Handler(#[from] HandlerError),

    /// The handler panicked.
    #[error("Resource handler failed: {0}")]
    Panicked(String),
}

impl From<ResourceError> for JsonRpcError {
    fn from(err: ResourceError) -> Self {
        let code = match &err {
            ResourceError::NotFound(_) => ErrorCode::ResourceNotFound,
            ResourceError::Handler(e) => e.code(),
            ResourceError::Panicked(_) => ErrorCode::ExecutionError,
        };
        Self::with_message(code, err.to_string())
    }
}

struct ResourceBinding {
    definition: ResourceDefinition,
    handler: ResourceHandler,
}

/// Registry of readable resources, keyed by URI, in registration order.
#[derive(Default)]
pub struct ResourceRegistry {
    resources: IndexMap<String, ResourceBinding>,
}

impl ResourceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource.
    ///
    /// A definition with an empty URI, or a missing handler, is logged and
    /// ignored. Registering an existing URI replaces the previous binding but
    /// keeps its position in the matching order.
    ///
    /// Returns `true` if the resource was stored.
    pub fn register(
        &mut self,
        definition: ResourceDefinition,
        handler: Option<ResourceHandler>,
    ) -> bool {
        if definition.uri.is_empty() {
            warn!(name = %definition.name, "Ignoring resource registration with an empty URI");
            return false;
        }
        let Some(handler) = handler else {
            warn!(uri = %definition.uri, "Ignoring resource registration without a handler");
            return false;
        };

        debug!(uri = %definition.uri, "Registered resource");
        self.resources.insert(
            definition.uri.clone(),
            ResourceBinding {
                definition,
                handler,
            },
        );
        true
    }

    /// Registers a resource from a closure.
    pub fn add<F>(&mut self, definition: ResourceDefinition, handler: F) -> bool
    where
        F: Fn(&str) -> Result<ResourceContent, HandlerError> + Send + 'static,
    {
        self.register(definition, Some(Box::new(handler)))
    }

    /// Removes a resource. Returns `true` if it was registered.
    pub fn unregister(&mut self, uri: &str) -> bool {
        self.resources.shift_remove(uri).is_some()
    }

    /// Returns `true` if this exact URI is registered.
    #[must_use]
    pub fn has(&self, uri: &str) -> bool {
        self.resources.contains_key(uri)
    }

    /// Returns the definition registered under this exact URI.
    #[must_use]
    pub fn get(&self, uri: &str) -> Option<&ResourceDefinition> {
        self.resources.get(uri).map(|b| &b.definition)
    }

    /// Returns all definitions in registration order.
    #[must_use]
    pub fn definitions(&self) -> Vec<&ResourceDefinition> {
        self.resources.values().map(|b| &b.definition).collect()
    }

    /// Number of registered resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns `true` if no resources are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Drops every registration.
    pub fn clear(&mut self) {
        self.resources.clear();
    }

    /// Finds the definition that would serve a URI.
    ///
    /// An exact registration wins. Otherwise the first wildcard registration
    /// (in registration order) whose literal prefix starts the URI matches.
    #[must_use]
    pub fn resolve(&self, uri: &str) -> Option<&ResourceDefinition> {
        self.binding_for(uri).map(|b| &b.definition)
    }

    fn binding_for(&self, uri: &str) -> Option<&ResourceBinding> {
        if let Some(binding) = self.resources.get(uri) {
            return Some(binding);
        }

        self.resources.iter().find_map(|(pattern, binding)| {
            let prefix = &pattern[..pattern.find(WILDCARD)?];
            uri.starts_with(prefix).then_some(binding)
        })
    }

    /// Reads a resource.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] if nothing matches, or the
    /// handler's failure (including a panic) otherwise.
    pub fn read(&self, uri: &str) -> Result<ResourceContent, ResourceError> {
        let binding = self
            .binding_for(uri)
            .ok_or_else(|| ResourceError::NotFound(uri.to_string()))?;

        match panic::catch_unwind(AssertUnwindSafe(|| (binding.handler)(uri))) {
            Ok(result) => result.map_err(|e| {
                warn!(uri = %uri, error = %e, "Resource handler failed");
                ResourceError::Handler(e)
            }),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(uri = %uri, panic = %message, "Resource handler panicked");
                Err(ResourceError::Panicked(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::mcp::protocol::{InputSchema, PropertySchema};

    fn path_tool() -> ToolDefinition {
        ToolDefinition::new(
            "read_asset",
            "Reads an asset",
            InputSchema::new().required("path", PropertySchema::string("Asset path")),
        )
    }

    fn counting_registry() -> (ToolRegistry, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut registry = ToolRegistry::new();
        registry.add(path_tool(), move |args| {
            counter.fetch_add(1, Ordering::SeqCst);
            let path = args.get("path").and_then(Value::as_str).unwrap_or_default();
            Ok(ToolCallResult::text(format!("read {path}")))
        });
        (registry, calls)
    }

    fn args(json: &str) -> Map {
        crate::json::from_str(json)
            .unwrap()
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn register_rejects_empty_name() {
        let mut registry = ToolRegistry::new();
        let def = ToolDefinition::new("", "nameless", InputSchema::new());
        assert!(!registry.add(def, |_| Ok(ToolCallResult::text("x"))));
        assert!(registry.is_empty());
    }

    #[test]
    fn register_rejects_missing_handler() {
        let mut registry = ToolRegistry::new();
        assert!(!registry.register(path_tool(), None));
        assert!(!registry.has("read_asset"));
        assert!(registry.execute("read_asset", &args(r#"{"path":"a"}"#)).is_error);
    }

    #[test]
    fn execute_calls_handler() {
        let (registry, calls) = counting_registry();
        let result = registry.execute("read_asset", &args(r#"{"path":"Assets/a.png"}"#));
        assert!(!result.is_error);
        assert_eq!(result.joined_text(), "read Assets/a.png");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_required_argument_skips_handler() {
        let (registry, calls) = counting_registry();

        let result = registry.execute("read_asset", &Map::new());
        assert!(result.is_error);
        assert!(result.joined_text().contains("path"));

        let result = registry.execute("read_asset", &args(r#"{"path":null}"#));
        assert!(result.is_error);

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_tool_is_error_result() {
        let registry = ToolRegistry::new();
        let result = registry.execute("missing_tool", &Map::new());
        assert!(result.is_error);
        assert!(result.joined_text().contains("missing_tool"));
    }

    #[test]
    fn handler_error_becomes_error_result() {
        let mut registry = ToolRegistry::new();
        registry.add(
            ToolDefinition::new("fail", "Always fails", InputSchema::new()),
            |_| Err(HandlerError::Host("scene is locked".to_string())),
        );
        let result = registry.execute("fail", &Map::new());
        assert!(result.is_error);
        assert_eq!(result.joined_text(), "Host error: scene is locked");
    }

    #[test]
    fn handler_panic_becomes_error_result() {
        let mut registry = ToolRegistry::new();
        registry.add(
            ToolDefinition::new("explode", "Panics", InputSchema::new()),
            |_| panic!("kaboom"),
        );
        let result = registry.execute("explode", &Map::new());
        assert!(result.is_error);
        assert!(result.joined_text().contains("kaboom"));
    }

    #[test]
    fn re_registration_overwrites_in_place() {
        let mut registry = ToolRegistry::new();
        registry.add(ToolDefinition::new("a", "first", InputSchema::new()), |_| {
            Ok(ToolCallResult::text("first"))
        });
        registry.add(ToolDefinition::new("b", "other", InputSchema::new()), |_| {
            Ok(ToolCallResult::text("b"))
        });
        registry.add(ToolDefinition::new("a", "second", InputSchema::new()), |_| {
            Ok(ToolCallResult::text("second"))
        });

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.execute("a", &Map::new()).joined_text(), "second");
        let names: Vec<_> = registry.definitions().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn unregister_and_clear() {
        let (mut registry, _) = counting_registry();
        assert!(registry.unregister("read_asset"));
        assert!(!registry.unregister("read_asset"));
        let (mut registry, _) = counting_registry();
        registry.clear();
        assert!(registry.is_empty());
    }

    fn text_resource(registry: &mut ResourceRegistry, uri: &str, body: &'static str) {
        registry.add(ResourceDefinition::new(uri, body), move |requested| {
            Ok(ResourceContent::text(requested, body))
        });
    }

    #[test]
    fn exact_resource_match() {
        let mut registry = ResourceRegistry::new();
        text_resource(&mut registry, "ns://scene/active", "scene");
        let content = registry.read("ns://scene/active").unwrap();
        assert_eq!(content.text, "scene");
        assert_eq!(content.uri, "ns://scene/active");
    }

    #[test]
    fn wildcard_prefix_match() {
        let mut registry = ResourceRegistry::new();
        text_resource(&mut registry, "ns://thing/*", "thing");
        let content = registry.read("ns://thing/42").unwrap();
        assert_eq!(content.text, "thing");
        assert_eq!(content.uri, "ns://thing/42");
        assert!(matches!(
            registry.read("ns://other/42"),
            Err(ResourceError::NotFound(_))
        ));
    }

    #[test]
    fn exact_match_beats_wildcard() {
        let mut registry = ResourceRegistry::new();
        text_resource(&mut registry, "ns://thing/*", "wildcard");
        text_resource(&mut registry, "ns://thing/special", "exact");
        assert_eq!(registry.read("ns://thing/special").unwrap().text, "exact");
        assert_eq!(registry.read("ns://thing/plain").unwrap().text, "wildcard");
    }

    #[test]
    fn first_registered_wildcard_wins() {
        let mut registry = ResourceRegistry::new();
        text_resource(&mut registry, "ns://*", "broad");
        text_resource(&mut registry, "ns://thing/*", "narrow");
        assert_eq!(registry.read("ns://thing/1").unwrap().text, "broad");
        assert_eq!(registry.resolve("ns://thing/1").unwrap().uri, "ns://*");
    }

    #[test]
    fn resource_handler_failures_map_to_rpc_codes() {
        let mut registry = ResourceRegistry::new();
        registry.add(ResourceDefinition::new("ns://slow", "slow"), |_| {
            Err(HandlerError::Timeout(Duration::from_secs(5)))
        });
        registry.add(ResourceDefinition::new("ns://panic", "panic"), |_| {
            panic!("bad resource")
        });

        let err: JsonRpcError = registry.read("ns://slow").unwrap_err().into();
        assert_eq!(err.kind(), Some(ErrorCode::TimeoutError));

        let err: JsonRpcError = registry.read("ns://panic").unwrap_err().into();
        assert_eq!(err.kind(), Some(ErrorCode::ExecutionError));
        assert!(err.message.contains("bad resource"));

        let err: JsonRpcError = registry.read("ns://nothing").unwrap_err().into();
        assert_eq!(err.kind(), Some(ErrorCode::ResourceNotFound));
    }

    #[test]
    fn resource_registration_rules() {
        let mut registry = ResourceRegistry::new();
        assert!(!registry.register(ResourceDefinition::new("", "empty"), None));
        assert!(!registry.register(ResourceDefinition::new("ns://x", "x"), None));
        assert!(registry.is_empty());

        text_resource(&mut registry, "ns://x", "x");
        assert!(registry.has("ns://x"));
        assert_eq!(registry.get("ns://x").unwrap().name, "x");
        assert!(registry.unregister("ns://x"));
        assert!(!registry.has("ns://x"));
    }
}
