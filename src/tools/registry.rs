//! Tool registry and trait definitions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of a tool invocation.
#[derive(Debug, Clone)]
pub enum ToolOutcome {
    /// Successful result with content
    Success(String),
    /// The tool failed; the message is captured on the owning step
    Error(String),
}

impl ToolOutcome {
    /// Create a success outcome
    pub fn success(content: impl Into<String>) -> Self {
        Self::Success(content.into())
    }

    /// Create an error outcome
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Trait for tool implementations.
///
/// Tools are owned by the caller and only read by the core: the registry
/// serializes their definitions into planning prompts and invokes them with
/// resolved parameters.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name
    fn name(&self) -> &str;

    /// Get the tool description
    fn description(&self) -> &str;

    /// Get the JSON schema for the parameters object
    fn params_schema(&self) -> serde_json::Value;

    /// Optional JSON schema for the result. When present and the result
    /// text parses as JSON, the executor stores the structured form so
    /// later steps can reference individual properties.
    fn result_schema(&self) -> Option<serde_json::Value> {
        None
    }

    /// Invoke the tool with resolved parameters
    async fn invoke(&self, params: serde_json::Value) -> ToolOutcome;

    /// Get the serializable definition shown to models
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            params_schema: self.params_schema(),
            result_schema: self.result_schema(),
        }
    }
}

/// Serializable projection of a tool, as shown to models.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub params_schema: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_schema: Option<serde_json::Value>,
}

/// Registry of available tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Invoke a tool by name
    pub async fn invoke(&self, name: &str, params: serde_json::Value) -> ToolOutcome {
        match self.tools.get(name) {
            Some(tool) => tool.invoke(params).await,
            None => ToolOutcome::error(format!("Unknown tool: {}", name)),
        }
    }

    /// Get all tool definitions
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Check if a tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UpperTool;

    #[async_trait]
    impl Tool for UpperTool {
        fn name(&self) -> &str {
            "upper"
        }

        fn description(&self) -> &str {
            "Uppercase a string"
        }

        fn params_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            })
        }

        async fn invoke(&self, params: serde_json::Value) -> ToolOutcome {
            match params.get("text").and_then(|v| v.as_str()) {
                Some(text) => ToolOutcome::success(text.to_uppercase()),
                None => ToolOutcome::error("missing text"),
            }
        }
    }

    #[test]
    fn test_tool_outcome() {
        assert!(!ToolOutcome::success("ok").is_error());
        assert!(ToolOutcome::error("fail").is_error());
    }

    #[tokio::test]
    async fn test_registry_invoke() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(UpperTool));

        assert!(registry.contains("upper"));
        assert_eq!(registry.names(), vec!["upper"]);

        let outcome = registry
            .invoke("upper", serde_json::json!({"text": "hi"}))
            .await;
        match outcome {
            ToolOutcome::Success(content) => assert_eq!(content, "HI"),
            ToolOutcome::Error(message) => panic!("unexpected error: {}", message),
        }
    }

    #[tokio::test]
    async fn test_registry_unknown_tool() {
        let registry = ToolRegistry::new();
        let outcome = registry.invoke("nope", serde_json::json!({})).await;
        assert!(outcome.is_error());
    }

    #[test]
    fn test_definitions_serialize_camel_case() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(UpperTool));

        let serialized = serde_json::to_string(&registry.definitions()).unwrap();
        assert!(serialized.contains("paramsSchema"));
        assert!(!serialized.contains("resultSchema"));
    }
}
