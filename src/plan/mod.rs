//! Plan data model and execution.
//!
//! A plan is a directed acyclic graph of tool-invocation steps produced
//! from one planning call:
//! - parsing of model output into steps ([`parse_plan_steps`])
//! - inter-step reference resolution ([`resolve_references`])
//! - structural and parameter validation ([`validate_structure`])
//! - plan creation and wave-by-wave execution ([`Planner`])

mod parser;
mod planner;
mod resolver;
mod validator;

pub use parser::parse_plan_steps;
pub use planner::{Planner, PlannerConfig};
pub use resolver::{Reference, extract_template_references, resolve_references};
pub use validator::{validate_parameters, validate_structure};

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a plan step. Transitions pending to completed or failed,
/// never back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One tool invocation with declared dependencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    /// Unique within a plan
    pub id: String,
    pub tool_name: String,
    /// Raw parameters; may contain `{{stepId}}` / `{{stepId.property}}`
    /// placeholders until the step is resolved for execution.
    #[serde(default = "empty_params")]
    pub params: serde_json::Value,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_result: Option<serde_json::Value>,
}

fn empty_params() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl PlanStep {
    pub fn new(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        params: serde_json::Value,
        depends_on: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            params,
            depends_on,
            status: StepStatus::Pending,
            result: None,
            structured_result: None,
        }
    }
}

/// A step's stored result value.
///
/// `Structured` is used when the tool declared a result schema and the
/// result text parsed as JSON; the resolver pattern-matches on this instead
/// of speculatively re-parsing strings.
#[derive(Debug, Clone, PartialEq)]
pub enum StepValue {
    Raw(String),
    Structured(serde_json::Value),
}

impl StepValue {
    /// The value as JSON: structured form directly, raw text as a string node.
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            Self::Raw(text) => serde_json::Value::String(text.clone()),
            Self::Structured(value) => value.clone(),
        }
    }

    /// Render for the execution trace: composite values pretty-printed,
    /// everything else stringified.
    pub fn render(&self) -> String {
        match self {
            Self::Raw(text) => text.clone(),
            Self::Structured(value) => match value {
                serde_json::Value::String(text) => text.clone(),
                composite @ (serde_json::Value::Object(_) | serde_json::Value::Array(_)) => {
                    serde_json::to_string_pretty(composite)
                        .unwrap_or_else(|_| composite.to_string())
                }
                scalar => scalar.to_string(),
            },
        }
    }
}

/// Execution-time metadata the resolver consults per step.
#[derive(Debug, Clone)]
pub struct StepMetadata {
    pub tool_name: String,
    pub result_schema: Option<serde_json::Value>,
}

/// Read-only view the resolver works against.
#[derive(Clone, Copy)]
pub struct ResolutionContext<'a> {
    pub results: &'a HashMap<String, StepValue>,
    pub metadata: &'a HashMap<String, StepMetadata>,
}

/// A DAG of steps plus per-run execution state.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub steps: Vec<PlanStep>,
    /// Step id to resolved result value. Append-only: written exactly once
    /// per step, when it reaches a terminal state.
    pub context: HashMap<String, StepValue>,
    pub metadata: HashMap<String, StepMetadata>,
    pub created_at: DateTime<Utc>,
}

impl ExecutionPlan {
    pub fn new(steps: Vec<PlanStep>) -> Self {
        Self::with_metadata(steps, HashMap::new())
    }

    pub fn with_metadata(steps: Vec<PlanStep>, metadata: HashMap<String, StepMetadata>) -> Self {
        Self {
            steps,
            context: HashMap::new(),
            metadata,
            created_at: Utc::now(),
        }
    }

    pub fn step(&self, id: &str) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn step_mut(&mut self, id: &str) -> Option<&mut PlanStep> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    pub fn has_pending(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Pending)
    }

    pub fn pending_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Pending)
            .count()
    }

    /// Ids of pending steps whose dependencies have all completed.
    ///
    /// Steps in the returned set are independent by construction: none can
    /// depend on another, or that other would still be pending.
    pub fn ready_step_ids(&self) -> Vec<String> {
        self.steps
            .iter()
            .filter(|step| step.status == StepStatus::Pending)
            .filter(|step| {
                step.depends_on.iter().all(|dep| {
                    self.step(dep)
                        .is_some_and(|d| d.status == StepStatus::Completed)
                })
            })
            .map(|step| step.id.clone())
            .collect()
    }

    /// Pending steps with at least one failed dependency, paired with the
    /// first failed dependency id. These can never become ready.
    pub fn blocked_step_ids(&self) -> Vec<(String, String)> {
        self.steps
            .iter()
            .filter(|step| step.status == StepStatus::Pending)
            .filter_map(|step| {
                step.depends_on
                    .iter()
                    .find(|dep| {
                        self.step(dep)
                            .is_some_and(|d| d.status == StepStatus::Failed)
                    })
                    .map(|dep| (step.id.clone(), dep.clone()))
            })
            .collect()
    }

    pub fn resolution_context(&self) -> ResolutionContext<'_> {
        ResolutionContext {
            results: &self.context,
            metadata: &self.metadata,
        }
    }

    /// Move a step to a terminal state and write its context entry.
    ///
    /// The context write happens exactly here, so a key can never exist for
    /// a step that is still pending and is never overwritten.
    pub(crate) fn record_terminal(
        &mut self,
        id: &str,
        status: StepStatus,
        result: String,
        structured: Option<serde_json::Value>,
    ) {
        debug_assert!(status.is_terminal());
        debug_assert!(!self.context.contains_key(id));

        let value = match &structured {
            Some(parsed) => StepValue::Structured(parsed.clone()),
            None => StepValue::Raw(result.clone()),
        };
        if let Some(step) = self.step_mut(id) {
            step.status = status;
            step.result = Some(result);
            step.structured_result = structured;
            self.context.insert(id.to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_step_plan() -> ExecutionPlan {
        ExecutionPlan::new(vec![
            PlanStep::new("s1", "geocode", json!({"location": "Bogota"}), vec![]),
            PlanStep::new(
                "s2",
                "weather",
                json!({"lat": "{{s1.latitude}}"}),
                vec!["s1".to_string()],
            ),
        ])
    }

    #[test]
    fn test_ready_steps_respect_dependencies() {
        let mut plan = two_step_plan();
        assert_eq!(plan.ready_step_ids(), vec!["s1".to_string()]);

        plan.record_terminal("s1", StepStatus::Completed, "{}".to_string(), None);
        assert_eq!(plan.ready_step_ids(), vec!["s2".to_string()]);
    }

    #[test]
    fn test_blocked_steps_after_dependency_failure() {
        let mut plan = two_step_plan();
        plan.record_terminal("s1", StepStatus::Failed, "Error: boom".to_string(), None);

        assert!(plan.ready_step_ids().is_empty());
        assert_eq!(
            plan.blocked_step_ids(),
            vec![("s2".to_string(), "s1".to_string())]
        );
    }

    #[test]
    fn test_context_written_once_at_terminal_state() {
        let mut plan = two_step_plan();
        assert!(plan.context.is_empty());

        plan.record_terminal(
            "s1",
            StepStatus::Completed,
            "{\"latitude\":4.6}".to_string(),
            Some(json!({"latitude": 4.6})),
        );

        assert_eq!(
            plan.context.get("s1"),
            Some(&StepValue::Structured(json!({"latitude": 4.6})))
        );
        assert_eq!(plan.step("s1").unwrap().status, StepStatus::Completed);
    }

    #[test]
    fn test_step_value_render() {
        assert_eq!(StepValue::Raw("plain".into()).render(), "plain");
        assert_eq!(StepValue::Structured(json!(42)).render(), "42");

        let rendered = StepValue::Structured(json!({"a": 1})).render();
        assert!(rendered.contains('\n'), "objects are pretty-printed");
    }

    #[test]
    fn test_wire_step_deserializes_camel_case() {
        let step: PlanStep = serde_json::from_str(
            r#"{"id": "s1", "toolName": "geocode", "params": {"q": "x"}, "dependsOn": []}"#,
        )
        .unwrap();
        assert_eq!(step.tool_name, "geocode");
        assert_eq!(step.status, StepStatus::Pending);
    }
}
