use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::DocType;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub doc_types: DocTypesConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Filesystem layout. Store and artifact paths are derived from the
/// directories unless set explicitly.
#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_raw_dir")]
    pub raw_dir: PathBuf,
    /// Scanned only when `raw_dir` holds no files at all.
    #[serde(default)]
    pub fallback_dir: Option<PathBuf>,
    #[serde(default = "default_excluded_dir")]
    pub excluded_dir: PathBuf,
    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    #[serde(default)]
    pub docs_jsonl: Option<PathBuf>,
    #[serde(default)]
    pub chunks_jsonl: Option<PathBuf>,
    #[serde(default)]
    pub index_path: Option<PathBuf>,
    #[serde(default)]
    pub meta_path: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: default_raw_dir(),
            fallback_dir: None,
            excluded_dir: default_excluded_dir(),
            processed_dir: default_processed_dir(),
            index_dir: default_index_dir(),
            results_dir: default_results_dir(),
            docs_jsonl: None,
            chunks_jsonl: None,
            index_path: None,
            meta_path: None,
        }
    }
}

impl PathsConfig {
    pub fn docs_jsonl(&self) -> PathBuf {
        self.docs_jsonl
            .clone()
            .unwrap_or_else(|| self.processed_dir.join("docs.jsonl"))
    }

    pub fn chunks_jsonl(&self) -> PathBuf {
        self.chunks_jsonl
            .clone()
            .unwrap_or_else(|| self.processed_dir.join("chunks.jsonl"))
    }

    pub fn index_path(&self) -> PathBuf {
        self.index_path
            .clone()
            .unwrap_or_else(|| self.index_dir.join("vectors.index"))
    }

    pub fn meta_path(&self) -> PathBuf {
        self.meta_path
            .clone()
            .unwrap_or_else(|| self.index_dir.join("metadata.sqlite"))
    }
}

fn default_raw_dir() -> PathBuf {
    PathBuf::from("data/raw")
}
fn default_excluded_dir() -> PathBuf {
    PathBuf::from("data/excluded")
}
fn default_processed_dir() -> PathBuf {
    PathBuf::from("data/processed")
}
fn default_index_dir() -> PathBuf {
    PathBuf::from("index")
}
fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.txt".to_string(), "**/*.docx".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassificationConfig {
    /// File-name fragments that mark a document as a personal story. The
    /// defaults include two storytellers' names. Plain substring matching
    /// means `pamphlet` also counts as a story.
    #[serde(default = "default_story_keywords")]
    pub story_keywords: Vec<String>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            story_keywords: default_story_keywords(),
        }
    }
}

fn default_story_keywords() -> Vec<String> {
    vec!["story".to_string(), "luella".to_string(), "pam".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocTypesConfig {
    #[serde(default = "default_allow_doc_types")]
    pub allow: Vec<DocType>,
    #[serde(default = "default_block_doc_types")]
    pub block: Vec<DocType>,
}

impl Default for DocTypesConfig {
    fn default() -> Self {
        Self {
            allow: default_allow_doc_types(),
            block: default_block_doc_types(),
        }
    }
}

impl DocTypesConfig {
    pub fn is_allowed(&self, doc_type: DocType) -> bool {
        self.allow.contains(&doc_type)
    }

    pub fn is_blocked(&self, doc_type: DocType) -> bool {
        self.block.contains(&doc_type)
    }
}

fn default_allow_doc_types() -> Vec<DocType> {
    vec![
        DocType::EducationScript,
        DocType::ScreeningProcess,
        DocType::InequalityContext,
        DocType::CommunicationTraining,
    ]
}

fn default_block_doc_types() -> Vec<DocType> {
    vec![
        DocType::PersonalStory,
        DocType::MeetingNotes,
        DocType::RoundtableTranscript,
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_min_tokens")]
    pub min_tokens: usize,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_tokens: default_min_tokens(),
            max_tokens: default_max_tokens(),
            encoding: default_encoding(),
        }
    }
}

fn default_min_tokens() -> usize {
    120
}
fn default_max_tokens() -> usize {
    420
}
fn default_encoding() -> String {
    "cl100k_base".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_context_tokens: default_max_context_tokens(),
        }
    }
}

fn default_top_k() -> usize {
    8
}
fn default_max_context_tokens() -> usize {
    1200
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: Option<String>,
    #[serde(default = "default_embedding_dims")]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL override (OpenAI-compatible gateway or Ollama host).
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            dims: default_embedding_dims(),
            batch_size: default_batch_size(),
            max_retries: 0,
            timeout_secs: default_timeout_secs(),
            url: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_embedding_model() -> Option<String> {
    Some("text-embedding-3-large".to_string())
}
fn default_embedding_dims() -> Option<usize> {
    Some(3072)
}
fn default_batch_size() -> usize {
    96
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_chat_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_chat_model(),
            temperature: default_temperature(),
            max_retries: 0,
            timeout_secs: default_chat_timeout_secs(),
            url: None,
        }
    }
}

impl ChatConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_chat_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

impl Config {
    /// Configuration with every section at its default.
    pub fn minimal() -> Self {
        Self {
            paths: PathsConfig::default(),
            sources: SourcesConfig::default(),
            classification: ClassificationConfig::default(),
            doc_types: DocTypesConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig::default(),
            chat: ChatConfig::default(),
            server: ServerConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        // Validate chunking
        if self.chunking.max_tokens == 0 {
            anyhow::bail!("chunking.max_tokens must be > 0");
        }
        if self.chunking.min_tokens > self.chunking.max_tokens {
            anyhow::bail!(
                "chunking.min_tokens ({}) must be <= chunking.max_tokens ({})",
                self.chunking.min_tokens,
                self.chunking.max_tokens
            );
        }

        // Validate retrieval
        if self.retrieval.top_k < 1 {
            anyhow::bail!("retrieval.top_k must be >= 1");
        }
        if self.retrieval.max_context_tokens == 0 {
            anyhow::bail!("retrieval.max_context_tokens must be > 0");
        }

        if let Some(overlap) = self
            .doc_types
            .allow
            .iter()
            .find(|t| self.doc_types.block.contains(t))
        {
            anyhow::bail!(
                "doc type '{}' appears in both doc_types.allow and doc_types.block",
                overlap
            );
        }

        // Validate embedding
        if self.embedding.is_enabled() {
            if self.embedding.dims.is_none() || self.embedding.dims == Some(0) {
                anyhow::bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    self.embedding.provider
                );
            }
            if self.embedding.model.is_none() {
                anyhow::bail!(
                    "embedding.model must be specified when provider is '{}'",
                    self.embedding.provider
                );
            }
            if self.embedding.batch_size == 0 {
                anyhow::bail!("embedding.batch_size must be > 0");
            }
        }

        match self.embedding.provider.as_str() {
            "disabled" | "openai" | "ollama" => {}
            other => anyhow::bail!(
                "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
                other
            ),
        }

        match self.chat.provider.as_str() {
            "disabled" | "openai" | "ollama" => {}
            other => anyhow::bail!(
                "Unknown chat provider: '{}'. Must be disabled, openai, or ollama.",
                other
            ),
        }

        if !(0.0..=2.0).contains(&self.chat.temperature) {
            anyhow::bail!("chat.temperature must be in [0.0, 2.0]");
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}
