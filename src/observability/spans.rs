//! Structured span definitions for tracing.
//!
//! A [`SpanContext`] is created per engine run and passed explicitly into
//! planner calls; there is no global observability state. Events emitted
//! under these spans use the stable vocabulary `start`, `attempt`,
//! `success`, `fallback`, `failure` in their `event` field.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{Level, Span, span};

/// Context for creating structured spans within one run.
pub struct SpanContext {
    run_id: String,
    step_seq: AtomicU64,
}

impl SpanContext {
    pub fn new() -> Self {
        Self::with_run_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_run_id(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            step_seq: AtomicU64::new(0),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    fn next_step_seq(&self) -> u64 {
        self.step_seq.fetch_add(1, Ordering::Relaxed)
    }

    pub fn engine_span(&self) -> Span {
        span!(Level::INFO, "engine.execute", run_id = %self.run_id)
    }

    pub fn native_span(&self) -> Span {
        span!(Level::INFO, "engine.native_attempt", run_id = %self.run_id)
    }

    pub fn plan_create_span(&self) -> Span {
        span!(Level::INFO, "plan.create", run_id = %self.run_id)
    }

    pub fn plan_execute_span(&self, steps: usize) -> Span {
        span!(Level::INFO, "plan.execute", run_id = %self.run_id, steps)
    }

    pub fn step_span(&self, step_id: &str, tool: &str) -> Span {
        span!(
            Level::INFO,
            "step.execute",
            run_id = %self.run_id,
            step_id,
            tool,
            seq = self.next_step_seq(),
        )
    }

    pub fn humanize_span(&self) -> Span {
        span!(Level::INFO, "response.humanize", run_id = %self.run_id)
    }
}

impl Default for SpanContext {
    fn default() -> Self {
        Self::new()
    }
}
