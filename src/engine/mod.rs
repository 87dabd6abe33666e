//! Execution engine: native/planned decision and multi-tier fallback.
//!
//! State machine for one run:
//!
//! ```text
//! Start -> AttemptNative (adapter supports native tools) -> Succeed
//!                                                        -> FallbackToPlanned
//! Start -> PlannedOnly   (no native support)
//! FallbackToPlanned | PlannedOnly
//!       -> create_plan -> execute_plan -> Humanize -> Succeed
//!                                                  -> Degrade (raw trace)
//! ```
//!
//! The native-to-planned transition is the only automatic retry in the
//! system and is itself not retried. Humanization failure degrades to the
//! raw trace. Only structural validation, plan parsing, deadlock, and
//! budget errors escape [`ExecutionEngine::execute`].

mod context;
mod response;
mod retrieval;

pub use context::{ExecutionContext, RunOptions};
pub use response::ResponseProcessor;
pub use retrieval::{RetrievalAugmenter, RetrievalError};

use tracing::{Instrument, debug, info, warn};

use crate::Result;
use crate::observability::SpanContext;
use crate::plan::Planner;
use crate::prompts;

/// Top-level orchestrator for agent runs.
pub struct ExecutionEngine {
    planner: Planner,
    processor: ResponseProcessor,
}

impl ExecutionEngine {
    pub fn new() -> Self {
        Self {
            planner: Planner::new(),
            processor: ResponseProcessor::new(),
        }
    }

    pub fn with_planner(mut self, planner: Planner) -> Self {
        self.planner = planner;
        self
    }

    /// Run to completion.
    ///
    /// Recoverable failures (native execution, humanization, individual
    /// steps) are absorbed per tier; an `Err` means every tier on the
    /// chosen path is exhausted.
    pub async fn execute(&self, context: &ExecutionContext) -> Result<String> {
        let spans = SpanContext::new();
        let span = spans.engine_span();

        async {
            info!(
                event = "start",
                model = context.model.name(),
                tools = context.tools.len(),
                "starting run"
            );

            if context.model.supports_native_tools() {
                let prompt = self.assemble_prompt(context).await;
                debug!(event = "attempt", strategy = "native", "attempting native execution");

                let native_span = spans.native_span();
                match context
                    .model
                    .execute_with_tools(&prompt, &context.tools)
                    .instrument(native_span)
                    .await
                {
                    Ok(native) if native.success => {
                        info!(
                            event = "success",
                            strategy = "native",
                            tool_calls = native.tool_calls.len(),
                            "native execution succeeded"
                        );
                        return Ok(self.check_required_output(native.content, context));
                    }
                    Ok(native) => {
                        warn!(
                            event = "fallback",
                            errors = %native.errors.join("; "),
                            "native execution unsuccessful, falling back to planned"
                        );
                    }
                    Err(e) => {
                        warn!(
                            event = "fallback",
                            error = %e,
                            "native execution failed, falling back to planned"
                        );
                    }
                }
            } else {
                debug!(
                    event = "attempt",
                    strategy = "planned",
                    "adapter has no native tool support, using planned execution"
                );
            }

            match self.execute_planned(context, &spans).await {
                Ok(answer) => {
                    info!(event = "success", strategy = "planned", "planned execution succeeded");
                    Ok(self.check_required_output(answer, context))
                }
                Err(e) => {
                    warn!(event = "failure", error = %e, "planned execution failed");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Never-erroring surface for embedding callers: recoverable conditions
    /// are absorbed, exhausted tiers become an explicit failure string.
    pub async fn execute_to_string(&self, context: &ExecutionContext) -> String {
        match self.execute(context).await {
            Ok(answer) => answer,
            Err(e) => format!("Execution failed: {}", e),
        }
    }

    async fn execute_planned(
        &self,
        context: &ExecutionContext,
        spans: &SpanContext,
    ) -> Result<String> {
        let mut plan = self
            .planner
            .create_plan(
                context.model.as_ref(),
                &context.message,
                &context.tools,
                &context.memory_context,
                &context.system_prompt,
                spans,
            )
            .await?;

        let trace = self
            .planner
            .execute_plan(&mut plan, &context.tools, &context.options, spans)
            .await?;

        let humanize_span = spans.humanize_span();
        Ok(self
            .processor
            .process(context.model.as_ref(), &context.message, &trace)
            .instrument(humanize_span)
            .await)
    }

    /// Assemble the outbound prompt: retrieval-augmented when configured,
    /// basic concatenation otherwise. Memory context is spliced in front of
    /// the user-request marker in both cases.
    async fn assemble_prompt(&self, context: &ExecutionContext) -> String {
        if let Some(retrieval) = &context.retrieval {
            match retrieval
                .augment(&context.message, &context.system_prompt)
                .await
            {
                Ok(augmented) => {
                    return prompts::splice_memory(&augmented, &context.memory_context);
                }
                Err(e) => {
                    warn!(error = %e, "retrieval augmentation failed, using basic prompt");
                }
            }
        }

        prompts::basic_prompt(
            &context.system_prompt,
            &context.memory_context,
            &context.message,
        )
    }

    fn check_required_output(&self, answer: String, context: &ExecutionContext) -> String {
        if let Some(pattern) = &context.options.required_output_regex {
            match regex::Regex::new(pattern) {
                Ok(re) => {
                    if !re.is_match(&answer) {
                        warn!(pattern = %pattern, "final answer does not match required output pattern");
                    }
                }
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "invalid required output pattern");
                }
            }
        }
        answer
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new()
    }
}
