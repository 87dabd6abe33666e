//! Shared mocks for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use planweave::{
    CompletionOptions, ModelAdapter, ModelError, NativeExecution, Tool, ToolOutcome, ToolRegistry,
};

/// Adapter that replays scripted completions in order and records every
/// prompt it receives.
pub struct ScriptedAdapter {
    completions: Mutex<VecDeque<Result<String, String>>>,
    native_result: Mutex<Option<Result<NativeExecution, String>>>,
    supports_native: bool,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self {
            completions: Mutex::new(VecDeque::new()),
            native_result: Mutex::new(None),
            supports_native: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_completion(self, text: impl Into<String>) -> Self {
        self.completions.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub fn with_completion_error(self, message: impl Into<String>) -> Self {
        self.completions
            .lock()
            .unwrap()
            .push_back(Err(message.into()));
        self
    }

    pub fn with_native_success(mut self, content: impl Into<String>) -> Self {
        self.supports_native = true;
        *self.native_result.lock().unwrap() = Some(Ok(NativeExecution::succeeded(content)));
        self
    }

    pub fn with_native_unsuccessful(mut self, errors: Vec<String>) -> Self {
        self.supports_native = true;
        *self.native_result.lock().unwrap() = Some(Ok(NativeExecution::failed(errors)));
        self
    }

    pub fn with_native_error(mut self, message: impl Into<String>) -> Self {
        self.supports_native = true;
        *self.native_result.lock().unwrap() = Some(Err(message.into()));
        self
    }

    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        "scripted"
    }

    fn supports_native_tools(&self) -> bool {
        self.supports_native
    }

    async fn complete(
        &self,
        prompt: &str,
        _options: &CompletionOptions,
    ) -> Result<String, ModelError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.completions.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(ModelError::Provider(message)),
            None => Err(ModelError::Provider("no scripted completion left".into())),
        }
    }

    async fn execute_with_tools(
        &self,
        prompt: &str,
        _tools: &Arc<ToolRegistry>,
    ) -> Result<NativeExecution, ModelError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.native_result.lock().unwrap().take() {
            Some(Ok(execution)) => Ok(execution),
            Some(Err(message)) => Err(ModelError::Provider(message)),
            None => Err(ModelError::NativeToolsUnsupported),
        }
    }
}

/// Tool that records every invocation and replies with a fixed outcome.
pub struct RecorderTool {
    name: String,
    description: String,
    params_schema: Value,
    result_schema: Option<Value>,
    outcome: ToolOutcome,
    pub calls: Arc<Mutex<Vec<Value>>>,
    order: Option<Arc<Mutex<Vec<String>>>>,
}

impl RecorderTool {
    pub fn new(name: impl Into<String>, params_schema: Value, outcome: ToolOutcome) -> Self {
        let name = name.into();
        Self {
            description: format!("The {} tool", name),
            name,
            params_schema,
            result_schema: None,
            outcome,
            calls: Arc::new(Mutex::new(Vec::new())),
            order: None,
        }
    }

    pub fn with_result_schema(mut self, schema: Value) -> Self {
        self.result_schema = Some(schema);
        self
    }

    /// Share an execution-order log across tools.
    pub fn with_order_log(mut self, order: Arc<Mutex<Vec<String>>>) -> Self {
        self.order = Some(order);
        self
    }

    pub fn calls_handle(&self) -> Arc<Mutex<Vec<Value>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Tool for RecorderTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn params_schema(&self) -> Value {
        self.params_schema.clone()
    }

    fn result_schema(&self) -> Option<Value> {
        self.result_schema.clone()
    }

    async fn invoke(&self, params: Value) -> ToolOutcome {
        self.calls.lock().unwrap().push(params);
        if let Some(order) = &self.order {
            order.lock().unwrap().push(self.name.clone());
        }
        self.outcome.clone()
    }
}

/// Echo tool with a required string parameter.
pub fn echo_tool() -> RecorderTool {
    RecorderTool::new(
        "echo",
        json!({
            "type": "object",
            "properties": {"text": {"type": "string"}},
            "required": ["text"]
        }),
        ToolOutcome::success("hello"),
    )
}

/// Geocode tool returning structured coordinates.
pub fn geocode_tool() -> RecorderTool {
    RecorderTool::new(
        "geocode",
        json!({
            "type": "object",
            "properties": {"location": {"type": "string"}},
            "required": ["location"]
        }),
        ToolOutcome::success(r#"{"latitude": 4.6, "longitude": -74.1}"#),
    )
    .with_result_schema(json!({
        "type": "object",
        "properties": {
            "latitude": {"type": "number"},
            "longitude": {"type": "number"}
        },
        "required": ["latitude", "longitude"]
    }))
}

/// Weather tool requiring numeric coordinates.
pub fn weather_tool() -> RecorderTool {
    RecorderTool::new(
        "weather",
        json!({
            "type": "object",
            "properties": {
                "lat": {"type": "number"},
                "lon": {"type": "number"}
            },
            "required": ["lat", "lon"]
        }),
        ToolOutcome::success("Sunny, 20C"),
    )
}

/// Tool that always fails.
pub fn failing_tool(name: &str) -> RecorderTool {
    RecorderTool::new(
        name,
        json!({"type": "object", "properties": {}}),
        ToolOutcome::error("boom"),
    )
}

pub const ECHO_PLAN: &str =
    r#"[{"id": "s1", "toolName": "echo", "params": {"text": "hello"}, "dependsOn": []}]"#;
