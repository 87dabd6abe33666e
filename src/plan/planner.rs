//! Plan creation and wave-by-wave execution.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use serde_json::Value;
use tracing::{Instrument, debug, info, warn};

use super::{
    ExecutionPlan, StepMetadata, StepStatus, parse_plan_steps, resolve_references,
    validate_structure,
};
use crate::engine::RunOptions;
use crate::models::{CompletionOptions, ModelAdapter};
use crate::observability::SpanContext;
use crate::prompts;
use crate::tools::{Tool, ToolOutcome, ToolRegistry};
use crate::validation::{JsonSchemaValidator, SchemaValidator};
use crate::{Error, Result};

/// Planner configuration.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Options for the planning completion call. Deterministic by default:
    /// the reply must parse as JSON.
    pub completion: CompletionOptions,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            completion: CompletionOptions::deterministic(),
        }
    }
}

/// Creates plans from a single planning call and drives their execution.
pub struct Planner {
    config: PlannerConfig,
    validator: Arc<dyn SchemaValidator>,
}

/// A step readied for its wave: resolution and parameter validation happen
/// in the coordinating task, the invocation in the wave.
struct PreparedStep {
    id: String,
    tool_name: String,
    resolved: Value,
    result_schema: Option<Value>,
    action: PreparedAction,
}

enum PreparedAction {
    /// Failed before invocation (unknown tool, invalid parameters)
    Fail(String),
    Invoke(Arc<dyn Tool>),
}

struct StepCompletion {
    id: String,
    resolved: Value,
    status: StepStatus,
    result: String,
    structured: Option<Value>,
}

impl Planner {
    pub fn new() -> Self {
        Self {
            config: PlannerConfig::default(),
            validator: Arc::new(JsonSchemaValidator),
        }
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Build the planning prompt, issue exactly one completion call, and
    /// parse the reply into a pending plan.
    pub async fn create_plan(
        &self,
        model: &dyn ModelAdapter,
        message: &str,
        tools: &ToolRegistry,
        memory_context: &str,
        system_prompt: &str,
        spans: &SpanContext,
    ) -> Result<ExecutionPlan> {
        let span = spans.plan_create_span();
        async {
            let prompt = prompts::planning_prompt(
                message,
                &tools.definitions(),
                memory_context,
                system_prompt,
            );
            debug!(
                prompt_len = prompt.len(),
                tools = tools.len(),
                "requesting plan"
            );

            let raw = model.complete(&prompt, &self.config.completion).await?;
            let steps = parse_plan_steps(&raw)?;
            info!(steps = steps.len(), "plan created");

            let metadata = steps
                .iter()
                .filter_map(|step| {
                    tools.get(&step.tool_name).map(|tool| {
                        (
                            step.id.clone(),
                            StepMetadata {
                                tool_name: step.tool_name.clone(),
                                result_schema: tool.result_schema(),
                            },
                        )
                    })
                })
                .collect();

            Ok(ExecutionPlan::with_metadata(steps, metadata))
        }
        .instrument(span)
        .await
    }

    /// Execute a plan wave by wave.
    ///
    /// Returns the newline-joined `"{stepId}: {result}"` trace in completion
    /// order. Step failures are isolated; only structural, deadlock, and
    /// budget conditions abort the run.
    pub async fn execute_plan(
        &self,
        plan: &mut ExecutionPlan,
        tools: &ToolRegistry,
        options: &RunOptions,
        spans: &SpanContext,
    ) -> Result<String> {
        validate_structure(plan, tools)?;

        let span = spans.plan_execute_span(plan.steps.len());
        async {
            let started = Instant::now();
            let deadline = options.max_duration.map(|limit| started + limit);
            let concurrency = options.max_concurrency.max(1);
            let mut trace: Vec<String> = Vec::with_capacity(plan.steps.len());
            let mut executed = 0usize;

            while plan.has_pending() {
                check_deadline(deadline, started, trace.len())?;

                // Steps behind a failed dependency can never become ready;
                // fail them now so the loop always makes progress.
                for (id, dependency) in plan.blocked_step_ids() {
                    warn!(step = %id, dependency = %dependency, "dependency failed, step will not run");
                    let message = format!("Error: dependency '{}' failed", dependency);
                    plan.record_terminal(&id, StepStatus::Failed, message.clone(), None);
                    trace.push(format!("{}: {}", id, message));
                }

                let ready = plan.ready_step_ids();
                if ready.is_empty() {
                    if plan.has_pending() {
                        return Err(Error::Deadlock {
                            pending: plan.pending_count(),
                        });
                    }
                    break;
                }

                let mut wave = Vec::with_capacity(ready.len());
                for id in ready {
                    if let Some(limit) = options.max_steps
                        && executed >= limit
                    {
                        return Err(Error::StepBudgetExceeded { executed, limit });
                    }
                    check_deadline(deadline, started, trace.len())?;
                    executed += 1;

                    let prepared = self.prepare_step(plan, tools, &id);
                    let step_span = spans.step_span(&prepared.id, &prepared.tool_name);
                    let validator = Arc::clone(&self.validator);
                    wave.push(run_prepared(prepared, validator, deadline).instrument(step_span));
                }

                // Single-coordinator design: the wave only computes
                // completions, all plan and context mutation happens here.
                let mut completions = futures::stream::iter(wave).buffer_unordered(concurrency);
                let mut wave_failed = false;
                while let Some(completion) = completions.next().await {
                    wave_failed |= completion.status == StepStatus::Failed;
                    apply_completion(plan, &mut trace, completion);
                }
                drop(completions);

                if options.stop_on_first_tool_error && wave_failed {
                    warn!("step failed with stop_on_first_tool_error set, aborting remaining steps");
                    break;
                }
            }

            info!(
                steps = trace.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "plan execution finished"
            );
            Ok(trace.join("\n"))
        }
        .instrument(span)
        .await
    }

    /// Resolve and validate one ready step against the current context.
    fn prepare_step(&self, plan: &ExecutionPlan, tools: &ToolRegistry, id: &str) -> PreparedStep {
        let Some(step) = plan.step(id) else {
            // ids come from the plan itself; reaching this is a logic error
            return PreparedStep {
                id: id.to_string(),
                tool_name: String::new(),
                resolved: Value::Null,
                result_schema: None,
                action: PreparedAction::Fail(format!("Error: unknown step '{}'", id)),
            };
        };

        let Some(tool) = tools.get(&step.tool_name) else {
            return PreparedStep {
                id: step.id.clone(),
                tool_name: step.tool_name.clone(),
                resolved: step.params.clone(),
                result_schema: None,
                action: PreparedAction::Fail(format!(
                    "Error: tool not found: {}",
                    step.tool_name
                )),
            };
        };

        let schema = tool.params_schema();
        let resolved = resolve_references(&step.params, &plan.resolution_context(), Some(&schema));

        let report = self.validator.validate(&resolved, &schema);
        let action = if report.is_valid {
            PreparedAction::Invoke(Arc::clone(tool))
        } else {
            PreparedAction::Fail(format!(
                "Error: invalid parameters: {}",
                report.errors.join("; ")
            ))
        };

        let result_schema = plan
            .metadata
            .get(id)
            .and_then(|meta| meta.result_schema.clone())
            .or_else(|| tool.result_schema());

        PreparedStep {
            id: step.id.clone(),
            tool_name: step.tool_name.clone(),
            resolved,
            result_schema,
            action,
        }
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_prepared(
    prepared: PreparedStep,
    validator: Arc<dyn SchemaValidator>,
    deadline: Option<Instant>,
) -> StepCompletion {
    let PreparedStep {
        id,
        tool_name,
        resolved,
        result_schema,
        action,
    } = prepared;

    let tool = match action {
        PreparedAction::Fail(message) => {
            warn!(step = %id, tool = %tool_name, message = %message, "step failed before invocation");
            return StepCompletion {
                id,
                resolved,
                status: StepStatus::Failed,
                result: message,
                structured: None,
            };
        }
        PreparedAction::Invoke(tool) => tool,
    };

    // A hung tool must not outlive the run's deadline.
    let outcome = match deadline {
        Some(deadline) => {
            match tokio::time::timeout_at(deadline.into(), tool.invoke(resolved.clone())).await {
                Ok(outcome) => outcome,
                Err(_) => ToolOutcome::error("run deadline exceeded during invocation"),
            }
        }
        None => tool.invoke(resolved.clone()).await,
    };

    match outcome {
        ToolOutcome::Success(text) => {
            let structured = parse_structured_result(&id, &text, result_schema.as_ref(), &*validator);
            debug!(step = %id, tool = %tool_name, "step completed");
            StepCompletion {
                id,
                resolved,
                status: StepStatus::Completed,
                result: text,
                structured,
            }
        }
        ToolOutcome::Error(message) => {
            warn!(step = %id, tool = %tool_name, error = %message, "step failed");
            StepCompletion {
                id,
                resolved,
                status: StepStatus::Failed,
                result: format!("Error: {}", message),
                structured: None,
            }
        }
    }
}

/// Parse a result into its structured form when the tool declared a result
/// schema. A schema mismatch is advisory: logged, never a step failure.
fn parse_structured_result(
    step_id: &str,
    text: &str,
    result_schema: Option<&Value>,
    validator: &dyn SchemaValidator,
) -> Option<Value> {
    let schema = result_schema?;
    let parsed = serde_json::from_str::<Value>(text).ok()?;

    let report = validator.validate(&parsed, schema);
    if !report.is_valid {
        warn!(
            step = %step_id,
            errors = %report.errors.join("; "),
            "result does not match declared schema"
        );
    }
    Some(parsed)
}

fn apply_completion(plan: &mut ExecutionPlan, trace: &mut Vec<String>, completion: StepCompletion) {
    let StepCompletion {
        id,
        resolved,
        status,
        result,
        structured,
    } = completion;

    if let Some(step) = plan.step_mut(&id) {
        step.params = resolved;
    }
    plan.record_terminal(&id, status, result, structured);

    let rendered = plan
        .context
        .get(&id)
        .map(|value| value.render())
        .unwrap_or_default();
    trace.push(format!("{}: {}", id, rendered));
}

fn check_deadline(deadline: Option<Instant>, started: Instant, completed: usize) -> Result<()> {
    if let Some(deadline) = deadline
        && Instant::now() >= deadline
    {
        return Err(Error::DeadlineExceeded {
            elapsed: started.elapsed(),
            completed,
        });
    }
    Ok(())
}
