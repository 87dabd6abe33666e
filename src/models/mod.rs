//! Model adapter boundary.
//!
//! The core treats inference as an opaque capability: complete a prompt into
//! text, or run a prompt through the provider's native tool-calling
//! protocol. Adapters implement this trait per provider; the core never
//! sees protocol details.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::tools::ToolRegistry;

/// Options forwarded with a completion call.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionOptions {
    /// Options for calls whose output must parse, like planning.
    pub fn deterministic() -> Self {
        Self {
            temperature: Some(0.0),
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Error from a model adapter call.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ModelError {
    /// The provider rejected or failed the call.
    #[error("provider error: {0}")]
    Provider(String),

    /// The adapter has no native tool-calling protocol.
    #[error("native tool execution is not supported by this adapter")]
    NativeToolsUnsupported,
}

/// One tool call made during a native round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeToolCall {
    pub name: String,
    pub arguments: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Outcome of a native tool-calling round trip.
///
/// `success = false` is equivalent to an adapter error for the engine's
/// fallback decision; adapters use it when the round trip produced partial
/// output worth surfacing in `errors`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NativeExecution {
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<NativeToolCall>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl NativeExecution {
    pub fn succeeded(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            success: true,
            ..Default::default()
        }
    }

    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            success: false,
            errors,
            ..Default::default()
        }
    }
}

/// Trait for model adapters.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Adapter name, used in logs only
    fn name(&self) -> &str;

    /// Whether [`ModelAdapter::execute_with_tools`] is expected to work
    fn supports_native_tools(&self) -> bool {
        false
    }

    /// Complete a prompt into text.
    ///
    /// The returned text may itself be machine-parseable: planning replies
    /// are JSON, possibly inside a markdown fence.
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, ModelError>;

    /// Run the adapter's built-in tool-calling protocol in one round trip.
    ///
    /// The registry is passed so the adapter can invoke tool actions as the
    /// model requests them.
    async fn execute_with_tools(
        &self,
        prompt: &str,
        tools: &Arc<ToolRegistry>,
    ) -> Result<NativeExecution, ModelError> {
        let _ = (prompt, tools);
        Err(ModelError::NativeToolsUnsupported)
    }
}
