//! Response post-processing.
//!
//! Planned execution produces a structured step trace; one more completion
//! call turns it into a conversational answer. If that call fails, the raw
//! trace is returned unchanged.

use tracing::warn;

use crate::models::{CompletionOptions, ModelAdapter};
use crate::prompts;

/// Turns raw step traces into conversational answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseProcessor;

impl ResponseProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Humanize a step trace, degrading to the trace itself on any failure.
    pub async fn process(&self, model: &dyn ModelAdapter, message: &str, trace: &str) -> String {
        let prompt = prompts::humanize_prompt(message, trace);
        match model.complete(&prompt, &CompletionOptions::default()).await {
            Ok(answer) if !answer.trim().is_empty() => answer,
            Ok(_) => {
                warn!("humanization returned empty text, returning raw trace");
                trace.to_string()
            }
            Err(e) => {
                warn!(error = %e, "humanization failed, returning raw trace");
                trace.to_string()
            }
        }
    }
}
