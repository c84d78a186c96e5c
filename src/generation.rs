//! Text generation backends used to write query overviews and summaries.
//!
//! | Config Value | Generator |
//! |-------------|-----------|
//! | `"disabled"` | [`DisabledGenerator`] |
//! | `"openai"` | [`OpenAIGenerator`] (`POST {url}/v1/chat/completions`) |
//! | `"ollama"` | [`OllamaGenerator`] (`POST {url}/api/chat`) |
//!
//! Both HTTP generators share the retry and backoff policy of the embedding
//! providers.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::GenerationConfig;
use crate::embedding::{http_client, post_with_retry};

/// One generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn model_name(&self) -> &str;
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

fn chat_messages(request: &GenerationRequest) -> Vec<serde_json::Value> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &request.system {
        messages.push(serde_json::json!({ "role": "system", "content": system }));
    }
    messages.push(serde_json::json!({ "role": "user", "content": request.prompt }));
    messages
}

/// Always fails; callers fall back to their canned text.
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
        bail!("Text generation is disabled")
    }
}

// ============ OpenAI ============

pub struct OpenAIGenerator {
    model: String,
    base_url: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("generation.model required for OpenAI generator"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;

        Ok(Self {
            model,
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
            api_key,
            max_retries: config.max_retries,
            client: http_client(config.timeout_secs)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

fn parse_openai_chat(json: serde_json::Value) -> Result<String> {
    let parsed: ChatResponse = serde_json::from_value(json)
        .map_err(|e| anyhow!("Invalid OpenAI chat response: {}", e))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow!("OpenAI chat response contained no message"))
}

#[async_trait]
impl TextGenerator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": chat_messages(request),
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let json = post_with_retry(
            &self.client,
            &url,
            Some(&self.api_key),
            &body,
            self.max_retries,
            "OpenAI",
        )
        .await?;
        parse_openai_chat(json)
    }
}

// ============ Ollama ============

pub struct OllamaGenerator {
    model: String,
    base_url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("generation.model required for Ollama generator"))?;
        Ok(Self {
            model,
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            max_retries: config.max_retries,
            client: http_client(config.timeout_secs)?,
        })
    }
}

fn parse_ollama_chat(json: &serde_json::Value) -> Result<String> {
    json.get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow!("Invalid Ollama chat response: missing message.content"))
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": chat_messages(request),
            "stream": false,
            "options": {
                "num_predict": request.max_tokens,
                "temperature": request.temperature,
            }
        });
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let json =
            post_with_retry(&self.client, &url, None, &body, self.max_retries, "Ollama").await?;
        parse_ollama_chat(&json)
    }
}

pub fn create_generator(config: &GenerationConfig) -> Result<Box<dyn TextGenerator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledGenerator)),
        "openai" => Ok(Box::new(OpenAIGenerator::new(config)?)),
        "ollama" => Ok(Box::new(OllamaGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}
