//! Tolerant extraction of plan steps from model output.
//!
//! Models answer planning prompts with JSON in varying dress: a bare array,
//! a `{"steps": [...]}` wrapper, markdown fences, leading or trailing
//! prose. Extraction order: raw parse, fenced block, bracket substring.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use super::PlanStep;
use crate::{Error, Result};

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("valid fence regex"))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WirePlan {
    Steps(Vec<PlanStep>),
    Wrapped { steps: Vec<PlanStep> },
}

impl WirePlan {
    fn into_steps(self) -> Vec<PlanStep> {
        match self {
            Self::Steps(steps) | Self::Wrapped { steps } => steps,
        }
    }
}

/// Parse the raw text of a planning completion into pending steps.
///
/// Failure is not retried at this layer; the raw text rides along in the
/// error for diagnosis.
pub fn parse_plan_steps(raw: &str) -> Result<Vec<PlanStep>> {
    for candidate in candidate_payloads(raw) {
        if let Ok(plan) = serde_json::from_str::<WirePlan>(&candidate) {
            return Ok(plan.into_steps());
        }
    }

    Err(Error::PlanParse {
        message: "no JSON step array found in model output".to_string(),
        raw: raw.to_string(),
    })
}

/// Candidate JSON payloads in decreasing order of confidence.
fn candidate_payloads(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let mut candidates = vec![trimmed.to_string()];

    for capture in fence_regex().captures_iter(raw) {
        candidates.push(capture[1].trim().to_string());
    }

    if let Some(slice) = delimited_slice(trimmed, '[', ']') {
        candidates.push(slice.to_string());
    }
    if let Some(slice) = delimited_slice(trimmed, '{', '}') {
        candidates.push(slice.to_string());
    }

    candidates
}

fn delimited_slice(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}
