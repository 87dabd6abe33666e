//! Typed tool trait with automatic JSON schema generation.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use super::{Tool, ToolOutcome};

/// Schema-based tool trait with typed parameters.
///
/// Provides a higher-level abstraction over `Tool` with typed inputs
/// and automatic schema derivation via schemars.
#[async_trait]
pub trait TypedTool: Send + Sync {
    type Params: JsonSchema + DeserializeOwned + Send;
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    async fn run(&self, params: Self::Params) -> ToolOutcome;

    /// Optional result schema; override for tools with structured results.
    fn result_schema() -> Option<serde_json::Value> {
        None
    }

    fn params_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(Self::Params);
        let mut value =
            serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({"type": "object"}));

        if let Some(obj) = value.as_object_mut()
            && !obj.contains_key("properties")
        {
            obj.insert(
                "properties".to_string(),
                serde_json::Value::Object(serde_json::Map::new()),
            );
        }

        value
    }
}

#[async_trait]
impl<T: TypedTool + 'static> Tool for T {
    fn name(&self) -> &str {
        T::NAME
    }

    fn description(&self) -> &str {
        T::DESCRIPTION
    }

    fn params_schema(&self) -> serde_json::Value {
        T::params_schema()
    }

    fn result_schema(&self) -> Option<serde_json::Value> {
        T::result_schema()
    }

    async fn invoke(&self, params: serde_json::Value) -> ToolOutcome {
        match serde_json::from_value::<T::Params>(params) {
            Ok(typed) => TypedTool::run(self, typed).await,
            Err(e) => ToolOutcome::error(format!("Invalid params: {}", e)),
        }
    }
}
