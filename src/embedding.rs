//! Embedding backends.
//!
//! - [`DisabledProvider`] refuses every call; the index build checks for it
//!   up front.
//! - [`OpenAIProvider`] calls `POST {base}/embeddings`.
//! - [`OllamaProvider`] calls `POST {url}/api/embed`.
//!
//! Vectors leave this module un-normalized. Callers apply [`l2_normalize`]
//! before adding to or querying the index.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::EmbeddingConfig;
use crate::http;

/// A backend that turns texts into fixed-dimension vectors.
///
/// Implementations must return exactly one vector per input, in input
/// order, each of length [`dims`](EmbeddingProvider::dims).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier, recorded next to every indexed chunk.
    fn model_name(&self) -> &str;
    fn dims(&self) -> usize;
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single query text.
pub async fn embed_query(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    provider
        .embed_texts(&[text.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("{} returned no vector for the query", provider.model_name()))
}

pub struct DisabledProvider;

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed_texts(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        bail!("Embedding provider is disabled")
    }
}

/// Model and dimensionality are mandatory for every live backend.
fn model_and_dims(config: &EmbeddingConfig) -> Result<(String, usize)> {
    let model = config
        .model
        .clone()
        .ok_or_else(|| anyhow!("embedding.model required for {} provider", config.provider))?;
    let dims = config
        .dims
        .ok_or_else(|| anyhow!("embedding.dims required for {} provider", config.provider))?;
    Ok((model, dims))
}

/// OpenAI (or compatible gateway via `embedding.url`). Requires
/// `OPENAI_API_KEY`.
pub struct OpenAIProvider {
    model: String,
    dims: usize,
    api_key: String,
    endpoint: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dims) = model_and_dims(config)?;
        let base = config.url.as_deref().unwrap_or(http::OPENAI_BASE_URL);
        Ok(Self {
            model,
            dims,
            api_key: http::openai_api_key()?,
            endpoint: http::endpoint(base, "/embeddings"),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "input": texts }));
        let body = http::send_json(request, self.max_retries, "OpenAI").await?;
        parse_openai_response(&body)
    }
}

/// Local Ollama instance, `http://localhost:11434` unless `embedding.url`
/// says otherwise.
pub struct OllamaProvider {
    model: String,
    dims: usize,
    endpoint: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dims) = model_and_dims(config)?;
        let base = config.url.as_deref().unwrap_or(http::OLLAMA_BASE_URL);
        Ok(Self {
            model,
            dims,
            endpoint: http::endpoint(base, "/api/embed"),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "model": self.model, "input": texts }));
        let body = http::send_json(request, self.max_retries, "Ollama").await?;
        parse_ollama_response(&body)
    }
}

fn float_array(value: &Value, what: &str) -> Result<Vec<f32>> {
    let items = value
        .as_array()
        .ok_or_else(|| anyhow!("Invalid {} response: embedding is not an array", what))?;
    items
        .iter()
        .map(|v| {
            let x = v
                .as_f64()
                .ok_or_else(|| anyhow!("Invalid {} response: non-numeric embedding value", what))?
                as f32;
            if !x.is_finite() {
                bail!("Invalid {} response: embedding value out of range", what);
            }
            Ok(x)
        })
        .collect()
}

/// `data[].embedding`, reordered by each item's `index`.
fn parse_openai_response(body: &Value) -> Result<Vec<Vec<f32>>> {
    let data = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut indexed = data
        .iter()
        .enumerate()
        .map(|(pos, item)| {
            let index = item
                .get("index")
                .and_then(Value::as_u64)
                .map_or(pos, |i| i as usize);
            let vector = float_array(item.get("embedding").unwrap_or(&Value::Null), "OpenAI")?;
            Ok((index, vector))
        })
        .collect::<Result<Vec<_>>>()?;

    indexed.sort_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

fn parse_ollama_response(body: &Value) -> Result<Vec<Vec<f32>>> {
    body.get("embeddings")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing embeddings array"))?
        .iter()
        .map(|e| float_array(e, "Ollama"))
        .collect()
}

/// Build the provider named by `embedding.provider`: `disabled`, `openai`
/// or `ollama`.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledProvider)),
        "openai" => Ok(Box::new(OpenAIProvider::new(config)?)),
        "ollama" => Ok(Box::new(OllamaProvider::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Scale `v` to unit L2 norm in place. Zero vectors are left unchanged.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize_unit_length() {
        let mut v = vec![3.0f32, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        let mut v = vec![0.0f32; 4];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0; 4]);
    }

    #[test]
    fn test_parse_openai_orders_by_index() {
        let body = json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        });
        let vecs = parse_openai_response(&body).unwrap();
        assert_eq!(vecs, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_parse_openai_missing_data() {
        let body = json!({"error": {"message": "nope"}});
        assert!(parse_openai_response(&body).is_err());
        let body = json!({"data": [{"index": 0}]});
        assert!(parse_openai_response(&body).is_err());
    }

    #[test]
    fn test_non_numeric_or_overflowing_values_rejected() {
        let body = json!({"embeddings": [[0.5, "x"]]});
        let err = parse_ollama_response(&body).unwrap_err();
        assert!(err.to_string().contains("non-numeric"));

        let body = json!({"data": [{"index": 0, "embedding": [1.0e300, 0.0]}]});
        let err = parse_openai_response(&body).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_parse_ollama_response() {
        let body = json!({"embeddings": [[0.5, 0.5], [1.0, 0.0]]});
        let vecs = parse_ollama_response(&body).unwrap();
        assert_eq!(vecs.len(), 2);
        assert_eq!(vecs[1], vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_disabled_provider_errors() {
        let err = DisabledProvider
            .embed_texts(&["x".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }

    #[test]
    fn test_live_provider_needs_dims() {
        let config = EmbeddingConfig {
            provider: "ollama".into(),
            dims: None,
            ..EmbeddingConfig::default()
        };
        let err = create_provider(&config).err().unwrap();
        assert!(err.to_string().contains("embedding.dims required for ollama"));
    }

    #[test]
    fn test_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "bert".into(),
            ..EmbeddingConfig::default()
        };
        assert!(create_provider(&config).is_err());
    }
}
