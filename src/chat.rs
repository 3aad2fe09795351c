//! Chat completion providers.
//!
//! [`ChatProvider`] sends one system message and one user message and
//! returns the assistant's reply. No streaming and no conversation state.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::json;

use crate::config::ChatConfig;
use crate::http;

#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn model_name(&self) -> &str;
    async fn complete(&self, system: &str, user: &str, temperature: f32) -> Result<String>;
}

pub struct DisabledChat;

#[async_trait]
impl ChatProvider for DisabledChat {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn complete(&self, _system: &str, _user: &str, _temperature: f32) -> Result<String> {
        bail!("Chat provider is disabled. Set [chat] provider in config.")
    }
}

fn messages(system: &str, user: &str) -> serde_json::Value {
    json!([
        { "role": "system", "content": system },
        { "role": "user", "content": user },
    ])
}

/// OpenAI `POST /v1/chat/completions`. Requires `OPENAI_API_KEY`.
pub struct OpenAIChat {
    model: String,
    api_key: String,
    endpoint: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIChat {
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let base = config.url.as_deref().unwrap_or(http::OPENAI_BASE_URL);
        Ok(Self {
            model: config.model.clone(),
            api_key: http::openai_api_key()?,
            endpoint: http::endpoint(base, "/chat/completions"),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAIChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str, temperature: f32) -> Result<String> {
        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": messages(system, user),
                "temperature": temperature,
            }));
        let body = http::send_json(request, self.max_retries, "OpenAI").await?;
        parse_openai_chat(&body)
    }
}

/// Ollama `POST /api/chat` with `stream: false`.
pub struct OllamaChat {
    model: String,
    endpoint: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaChat {
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let base = config.url.as_deref().unwrap_or(http::OLLAMA_BASE_URL);
        Ok(Self {
            model: config.model.clone(),
            endpoint: http::endpoint(base, "/api/chat"),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl ChatProvider for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str, temperature: f32) -> Result<String> {
        let request = self.client.post(&self.endpoint).json(&json!({
            "model": self.model,
            "messages": messages(system, user),
            "stream": false,
            "options": { "temperature": temperature },
        }));
        let body = http::send_json(request, self.max_retries, "Ollama").await?;
        parse_ollama_chat(&body)
    }
}

fn parse_openai_chat(json: &serde_json::Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices[0].message.content"))
}

fn parse_ollama_chat(json: &serde_json::Value) -> Result<String> {
    json.pointer("/message/content")
        .and_then(|c| c.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing message.content"))
}

pub fn create_chat_provider(config: &ChatConfig) -> Result<Box<dyn ChatProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledChat)),
        "openai" => Ok(Box::new(OpenAIChat::new(config)?)),
        "ollama" => Ok(Box::new(OllamaChat::new(config)?)),
        other => bail!("Unknown chat provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_openai_chat_trims() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "  A mammogram is an X-ray.\n" } }]
        });
        assert_eq!(parse_openai_chat(&json).unwrap(), "A mammogram is an X-ray.");
    }

    #[test]
    fn test_parse_openai_chat_missing_content() {
        let json = serde_json::json!({ "choices": [] });
        assert!(parse_openai_chat(&json).is_err());
    }

    #[test]
    fn test_parse_ollama_chat() {
        let json = serde_json::json!({
            "model": "llama3",
            "message": { "role": "assistant", "content": "Hello." },
            "done": true
        });
        assert_eq!(parse_ollama_chat(&json).unwrap(), "Hello.");
    }

    #[tokio::test]
    async fn test_disabled_chat_errors() {
        let err = DisabledChat.complete("s", "u", 0.2).await.unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }

    #[test]
    fn test_create_ollama_needs_no_key() {
        let config = ChatConfig {
            provider: "ollama".into(),
            model: "llama3".into(),
            ..ChatConfig::default()
        };
        let provider = create_chat_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "llama3");
    }
}
