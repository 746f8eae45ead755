use crate::config::LlmConfig;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// A prompt-in, text-out generative model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct LlmClient {
    api_key: String,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Llm(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            api_key,
            base_url,
            model,
            http,
        })
    }

    pub fn from_config(config: &LlmConfig, timeout: Duration) -> Result<Self> {
        Self::new(
            config.api_key.clone(),
            config.model.clone(),
            config.base_url.clone(),
            timeout,
        )
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "You are a SQL assistant for a business database. Return JSON only, no text."},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.1,
        });

        // Reasoning models spend part of the budget on hidden reasoning tokens.
        if self.model.starts_with("gpt-5") || self.model.contains("o1") {
            body["max_completion_tokens"] = serde_json::json!(2000);
        } else if self.model.starts_with("gpt-4") {
            body["max_completion_tokens"] = serde_json::json!(800);
        } else {
            body["max_tokens"] = serde_json::json!(800);
        }
        body
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, prompt_len = prompt.len(), "Calling language model");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| EngineError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EngineError::Llm(format!("LLM API error ({}): {}", status, error_text)));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EngineError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        extract_content(&response_json)
    }
}

/// Pull the first choice's message content out of a chat completions reply.
fn extract_content(response_json: &serde_json::Value) -> Result<String> {
    if let Some(error) = response_json.get("error") {
        return Err(EngineError::Llm(format!("LLM API error: {}", error)));
    }

    let choice = response_json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| EngineError::Llm("No choices in LLM response".to_string()))?;

    match choice.get("finish_reason").and_then(|r| r.as_str()) {
        Some("length") => warn!("LLM response was truncated due to length limit"),
        Some("content_filter") => {
            return Err(EngineError::Llm(
                "LLM response was filtered by content policy".to_string(),
            ))
        }
        _ => {}
    }

    let content = choice["message"]["content"]
        .as_str()
        .ok_or_else(|| EngineError::Llm("No content in LLM response".to_string()))?;

    if content.trim().is_empty() {
        return Err(EngineError::Llm("Empty content in LLM response".to_string()));
    }

    Ok(content.to_string())
}
