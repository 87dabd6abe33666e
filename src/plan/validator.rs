//! Structural plan validation and parameter checks.
//!
//! Structural failures (duplicate ids, dangling dependencies, cycles) are
//! fatal and block all execution. An unknown tool is only a warning here:
//! the executor isolates it to the owning step.

use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;

use super::{ExecutionPlan, PlanStep};
use crate::tools::ToolRegistry;
use crate::validation::{SchemaValidator, ValidationReport};
use crate::{Error, Result};

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    Visiting,
    Visited,
}

/// Validate a plan before execution: unique ids, declared dependencies,
/// acyclic graph.
pub fn validate_structure(plan: &ExecutionPlan, tools: &ToolRegistry) -> Result<()> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(plan.steps.len());
    for (position, step) in plan.steps.iter().enumerate() {
        if index.insert(step.id.as_str(), position).is_some() {
            return Err(Error::DuplicateStepId {
                id: step.id.clone(),
            });
        }
    }

    for step in &plan.steps {
        if !tools.contains(&step.tool_name) {
            warn!(
                step = %step.id,
                tool = %step.tool_name,
                "plan references unregistered tool"
            );
        }
        for dependency in &step.depends_on {
            if !index.contains_key(dependency.as_str()) {
                return Err(Error::DanglingDependency {
                    step: step.id.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
    }

    detect_cycles(&plan.steps, &index)
}

/// Three-color DFS over the dependency adjacency. An explicit work stack
/// keeps recursion depth independent of plan size.
fn detect_cycles(steps: &[PlanStep], index: &HashMap<&str, usize>) -> Result<()> {
    let mut marks = vec![Mark::Unvisited; steps.len()];

    for start in 0..steps.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }

        // (node, next outgoing edge to examine)
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        marks[start] = Mark::Visiting;

        while let Some(frame) = stack.last_mut() {
            let (node, edge) = (frame.0, frame.1);

            if edge >= steps[node].depends_on.len() {
                marks[node] = Mark::Visited;
                stack.pop();
                continue;
            }
            frame.1 += 1;

            let target = index[steps[node].depends_on[edge].as_str()];
            match marks[target] {
                Mark::Unvisited => {
                    marks[target] = Mark::Visiting;
                    stack.push((target, 0));
                }
                Mark::Visiting => {
                    return Err(Error::DependencyCycle {
                        path: cycle_path(steps, &stack, target),
                    });
                }
                Mark::Visited => {}
            }
        }
    }

    Ok(())
}

/// Render the discovered cycle, e.g. `a -> b -> c -> a`. Visiting nodes are
/// exactly the stack members, so the re-entered node is on the stack.
fn cycle_path(steps: &[PlanStep], stack: &[(usize, usize)], reentered: usize) -> String {
    let entry = stack
        .iter()
        .position(|(node, _)| *node == reentered)
        .unwrap_or(0);

    let mut path: Vec<&str> = stack[entry..]
        .iter()
        .map(|(node, _)| steps[*node].id.as_str())
        .collect();
    path.push(steps[reentered].id.as_str());
    path.join(" -> ")
}

/// Validate resolved parameters against a tool schema.
///
/// Returns a report instead of failing: the caller decides what an invalid
/// report means for the owning step.
pub fn validate_parameters(
    params: &Value,
    schema: &Value,
    validator: &dyn SchemaValidator,
) -> ValidationReport {
    validator.validate(params, schema)
}
