//! Chat-completions client with model failover.
//!
//! Talks to any OpenAI-compatible endpoint. Models are tried in configured
//! order until one produces a reply; only when every model fails does the
//! call surface an error.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, AgentResult};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODELS: &str = "gpt-4o-mini,gpt-4o";

/// Configuration for the agent endpoint, read once at process start.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub api_base: String,
    pub api_key: String,
    /// Candidate models, tried in order.
    pub models: Vec<String>,
    pub temperature: f64,
    pub timeout: Duration,
}

fn parse_models(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect()
}

impl Default for AgentConfig {
    fn default() -> Self {
        let models = std::env::var("AGENT_MODELS").unwrap_or_else(|_| DEFAULT_MODELS.to_string());
        Self {
            api_base: std::env::var("AGENT_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            api_key: std::env::var("AGENT_API_KEY").unwrap_or_default(),
            models: parse_models(&models),
            temperature: 0.4,
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    config: AgentConfig,
}

impl ChatClient {
    pub fn new(config: AgentConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, config }
    }

    pub fn from_env() -> Self {
        Self::new(AgentConfig::default())
    }

    /// Generate a reply, trying each configured model in order.
    pub async fn generate(&self, system: &str, user: &str) -> AgentResult<String> {
        for model in &self.config.models {
            tracing::debug!("Trying model: {}", model);
            match self.complete(model, system, user).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    tracing::warn!("Model {} failed: {}", model, e);
                }
            }
        }
        Err(AgentError::AllModelsFailed)
    }

    async fn complete(&self, model: &str, system: &str, user: &str) -> AgentResult<String> {
        let request = ChatRequest {
            model,
            temperature: self.config.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AgentError::InvalidResponse(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| AgentError::InvalidResponse("reply carried no content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_list_splits_on_commas_and_drops_blanks() {
        assert_eq!(parse_models("a, b,,c"), vec!["a", "b", "c"]);
        assert_eq!(parse_models("gpt-4o-mini"), vec!["gpt-4o-mini"]);
        assert!(parse_models("").is_empty());
    }

    #[test]
    fn chat_response_deserializes() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": "[\"AAPL\"]"}}]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("[\"AAPL\"]")
        );
    }
}
