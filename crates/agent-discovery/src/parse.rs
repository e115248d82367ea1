//! Defensive parsing of agent replies.
//!
//! Agents are told to return bare JSON, but replies routinely arrive wrapped
//! in markdown code fences or with stray prose. Parsing failures are typed
//! outcomes, never panics.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{AgentError, AgentResult};

/// Strip a surrounding ``` / ```json fence, if present.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // The first fence line may carry a language tag.
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a reply that should be a JSON array of strings. Non-string elements
/// are dropped; a reply that is not a JSON array at all is a typed failure.
pub fn parse_agent_list(text: &str) -> AgentResult<Vec<String>> {
    let content = strip_code_fences(text);
    let value: Value = serde_json::from_str(content)
        .map_err(|e| AgentError::ParseFailed(format!("not valid JSON: {e}")))?;

    let Value::Array(items) = value else {
        return Err(AgentError::ParseFailed(
            "expected a JSON array".to_string(),
        ));
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect())
}

/// Parse a `metric : chart_type` line-per-entry reply.
pub fn parse_chart_map(text: &str) -> BTreeMap<String, String> {
    strip_code_fences(text)
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(metric, chart)| (metric.trim().to_string(), chart.trim().to_string()))
        .filter(|(metric, chart)| !metric.is_empty() && !chart.is_empty())
        .collect()
}
