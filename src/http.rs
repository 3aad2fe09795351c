//! Shared JSON-over-HTTP plumbing for the embedding and chat providers.
//!
//! # Retry Strategy
//!
//! `max_retries` defaults to 0, so a failing call surfaces immediately.
//! When raised, transient errors are retried with exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{anyhow, bail, Result};
use std::time::Duration;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

pub fn client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

pub fn openai_api_key() -> Result<String> {
    std::env::var("OPENAI_API_KEY")
        .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))
}

/// `base` with any trailing slash removed, joined to `path`.
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Send `request` and decode the JSON body, retrying per the module policy.
/// `label` names the service in error messages.
pub async fn send_json(
    request: reqwest::RequestBuilder,
    max_retries: u32,
    label: &str,
) -> Result<serde_json::Value> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let Some(req) = request.try_clone() else {
            bail!("{} request body cannot be retried", label);
        };

        let response = match req.send().await {
            Ok(r) => r,
            Err(e) => {
                last_err = Some(anyhow!("{} request failed: {}", label, e));
                continue;
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body_text = response.text().await.unwrap_or_default();
        let err = anyhow!("{} API error {}: {}", label, status, body_text);
        if status.as_u16() == 429 || status.is_server_error() {
            last_err = Some(err);
            continue;
        }
        return Err(err);
    }

    Err(last_err.unwrap_or_else(|| anyhow!("{} request failed after retries", label)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_slash() {
        assert_eq!(
            endpoint("http://localhost:11434/", "/api/chat"),
            "http://localhost:11434/api/chat"
        );
        assert_eq!(
            endpoint(OPENAI_BASE_URL, "/embeddings"),
            "https://api.openai.com/v1/embeddings"
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_reported() {
        let client = client(2).unwrap();
        let request = client.post("http://127.0.0.1:9/api/embed").json(&serde_json::json!({}));
        let err = send_json(request, 0, "Ollama").await.unwrap_err();
        assert!(err.to_string().starts_with("Ollama request failed"));
    }
}
