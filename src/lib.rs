//! # planweave
//!
//! Toolkit for LLM-driven agents that call external tools to satisfy a request.
//!
//! The core turns a natural-language request plus a catalog of callable tools
//! into a validated dependency graph of steps, executes that graph with
//! per-step failure isolation, resolves `{{stepId.property}}` references
//! flowing between steps (with schema-driven type coercion), and chooses
//! between a model's native tool-calling protocol and a self-managed
//! multi-step plan, with automatic multi-tier fallback.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use planweave::{ExecutionContext, ExecutionEngine, ModelAdapter, ToolRegistry};
//!
//! # async fn run(model: Arc<dyn ModelAdapter>) {
//! let mut tools = ToolRegistry::new();
//! // tools.register(Arc::new(MyTool::new()));
//!
//! let engine = ExecutionEngine::new();
//! let context = ExecutionContext::new("What's the weather in Bogota?", model, Arc::new(tools))
//!     .with_system_prompt("You are a helpful assistant.");
//!
//! let answer = engine.execute_to_string(&context).await;
//! println!("{answer}");
//! # }
//! ```
//!
//! ## Execution strategies
//!
//! When the model adapter reports native tool support, the engine tries one
//! native round trip first. Any native failure falls back to planned
//! execution: one planning call produces a JSON step array, the plan is
//! validated (dangling dependencies, cycles), and steps run wave by wave
//! with per-step failure isolation. The raw step trace is then humanized
//! with one more completion call, degrading to the raw trace if that fails.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod engine;
pub mod models;
pub mod observability;
pub mod plan;
pub mod prompts;
pub mod tools;
pub mod validation;

// Re-exports for convenience
pub use engine::{
    ExecutionContext, ExecutionEngine, ResponseProcessor, RetrievalAugmenter, RetrievalError,
    RunOptions,
};
pub use models::{
    CompletionOptions, ModelAdapter, ModelError, NativeExecution, NativeToolCall,
};
pub use observability::SpanContext;
pub use plan::{
    ExecutionPlan, PlanStep, Planner, PlannerConfig, Reference, ResolutionContext, StepMetadata,
    StepStatus, StepValue, extract_template_references, parse_plan_steps, resolve_references,
    validate_parameters, validate_structure,
};
pub use tools::{Tool, ToolDefinition, ToolOutcome, ToolRegistry, TypedTool};
pub use validation::{JsonSchemaValidator, SchemaValidator, ValidationReport};

/// Error type for planweave operations.
///
/// Step-level failures (unknown tool, invalid parameters, a failing tool)
/// never surface here; they are recorded on the owning step while sibling
/// steps continue. These variants cover the conditions that abort a run.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The planning call returned text that could not be parsed into steps.
    #[error("Plan parsing failed: {message}")]
    PlanParse {
        message: String,
        /// Raw model output, kept for diagnosis.
        raw: String,
    },

    /// Two steps in one plan share an id.
    #[error("duplicate step id '{id}'")]
    DuplicateStepId { id: String },

    /// A step depends on an id no step in the plan declares.
    #[error("step '{step}' depends on unknown step '{dependency}'")]
    DanglingDependency { step: String, dependency: String },

    /// The dependency graph contains a cycle.
    #[error("dependency cycle detected: {path}")]
    DependencyCycle { path: String },

    /// Pending steps remain but none is ready. Unreachable after structural
    /// validation; kept as a defensive check.
    #[error("execution deadlock: {pending} pending steps, none ready")]
    Deadlock { pending: usize },

    /// The run exceeded its step budget.
    #[error("step budget exceeded: {executed} steps executed (limit {limit})")]
    StepBudgetExceeded { executed: usize, limit: usize },

    /// The run exceeded its deadline.
    #[error("deadline exceeded after {:.1}s ({completed} steps completed)", .elapsed.as_secs_f64())]
    DeadlineExceeded {
        elapsed: std::time::Duration,
        completed: usize,
    },

    /// A model adapter call failed.
    #[error("Model call failed: {0}")]
    Model(#[from] models::ModelError),

    /// JSON serialization or deserialization failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error came from an exhausted step or time budget.
    pub fn is_budget_exceeded(&self) -> bool {
        matches!(
            self,
            Self::StepBudgetExceeded { .. } | Self::DeadlineExceeded { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
