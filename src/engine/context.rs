//! Per-run execution context and options.

use std::sync::Arc;
use std::time::Duration;

use super::retrieval::RetrievalAugmenter;
use crate::models::ModelAdapter;
use crate::tools::ToolRegistry;

/// Advisory ceilings and knobs for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Maximum number of plan steps executed before the run aborts.
    pub max_steps: Option<usize>,
    /// Wall-clock ceiling for the whole plan execution.
    pub max_duration: Option<Duration>,
    /// Abort remaining independent steps after the first failed step.
    pub stop_on_first_tool_error: bool,
    /// Pattern the final answer is expected to match; mismatches are
    /// logged, not rejected.
    pub required_output_regex: Option<String>,
    /// Concurrent step limit within one wave. The default of 1 preserves
    /// sequential execution; raising it is safe because steps in a wave
    /// are independent by construction.
    pub max_concurrency: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_steps: None,
            max_duration: None,
            stop_on_first_tool_error: false,
            required_output_regex: None,
            max_concurrency: 1,
        }
    }
}

impl RunOptions {
    pub fn with_max_steps(mut self, limit: usize) -> Self {
        self.max_steps = Some(limit);
        self
    }

    pub fn with_max_duration(mut self, limit: Duration) -> Self {
        self.max_duration = Some(limit);
        self
    }

    pub fn with_stop_on_first_tool_error(mut self, stop: bool) -> Self {
        self.stop_on_first_tool_error = stop;
        self
    }

    pub fn with_required_output_regex(mut self, pattern: impl Into<String>) -> Self {
        self.required_output_regex = Some(pattern.into());
        self
    }

    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit.max(1);
        self
    }
}

/// Read-only inputs for one engine run, constructed once per request.
#[derive(Clone)]
pub struct ExecutionContext {
    pub message: String,
    pub tools: Arc<ToolRegistry>,
    pub model: Arc<dyn ModelAdapter>,
    pub memory_context: String,
    pub system_prompt: String,
    pub options: RunOptions,
    pub retrieval: Option<Arc<dyn RetrievalAugmenter>>,
}

impl ExecutionContext {
    pub fn new(
        message: impl Into<String>,
        model: Arc<dyn ModelAdapter>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            message: message.into(),
            tools,
            model,
            memory_context: String::new(),
            system_prompt: String::new(),
            options: RunOptions::default(),
            retrieval: None,
        }
    }

    /// Prior-conversation text supplied by the memory manager.
    pub fn with_memory_context(mut self, text: impl Into<String>) -> Self {
        self.memory_context = text.into();
        self
    }

    pub fn with_system_prompt(mut self, text: impl Into<String>) -> Self {
        self.system_prompt = text.into();
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_retrieval(mut self, retrieval: Arc<dyn RetrievalAugmenter>) -> Self {
        self.retrieval = Some(retrieval);
        self
    }
}
