//! Index build: embed every chunk and persist the vector index plus the
//! position-aligned metadata table.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Config;
use crate::embedding::{self, l2_normalize, EmbeddingProvider};
use crate::metadata::MetadataStore;
use crate::models::ChunkRecord;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::store::read_jsonl;
use crate::vector_index::FlatIpIndex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub chunks: usize,
    pub dims: usize,
    pub batches: usize,
    pub model: String,
}

pub async fn run_index(config: &Config, progress: &dyn ProgressReporter) -> Result<IndexReport> {
    let chunks = load_chunks(config)?;
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }
    let provider = embedding::create_provider(&config.embedding)?;
    let report = build_index_from(config, &chunks, provider.as_ref(), progress).await?;

    println!("index");
    println!("  chunks: {}", report.chunks);
    println!("  model: {} ({} dims)", report.model, report.dims);
    println!("  batches: {}", report.batches);
    println!("  vectors: {}", config.paths.index_path().display());
    println!("  metadata: {}", config.paths.meta_path().display());
    println!("ok");

    Ok(report)
}

/// Read the chunk store. A missing or empty store is an error.
pub fn load_chunks(config: &Config) -> Result<Vec<ChunkRecord>> {
    let chunks_path = config.paths.chunks_jsonl();
    let chunks: Vec<ChunkRecord> = if chunks_path.exists() {
        read_jsonl(&chunks_path)?
    } else {
        Vec::new()
    };
    if chunks.is_empty() {
        bail!("No chunks found. Run `prag chunk` first.");
    }
    Ok(chunks)
}

/// Embed all chunks from the chunk store in order and write both artifacts.
pub async fn build_index(
    config: &Config,
    provider: &dyn EmbeddingProvider,
    progress: &dyn ProgressReporter,
) -> Result<IndexReport> {
    let chunks = load_chunks(config)?;
    build_index_from(config, &chunks, provider, progress).await
}

/// Vector row `i` and metadata row `position = i` describe `chunks[i]`.
/// Any provider error aborts the build before either artifact is written.
pub async fn build_index_from(
    config: &Config,
    chunks: &[ChunkRecord],
    provider: &dyn EmbeddingProvider,
    progress: &dyn ProgressReporter,
) -> Result<IndexReport> {
    let dims = provider.dims();
    let batch_size = config.embedding.batch_size.max(1);
    let total = chunks.len() as u64;
    let mut index = FlatIpIndex::new(dims);
    let mut batches = 0usize;

    for batch in chunks.chunks(batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = provider.embed_texts(&texts).await?;
        if vectors.len() != texts.len() {
            bail!(
                "embedding provider returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            );
        }

        for mut vec in vectors {
            if vec.len() != dims {
                bail!(
                    "embedding has {} dims, expected {} for model {}",
                    vec.len(),
                    dims,
                    provider.model_name()
                );
            }
            l2_normalize(&mut vec);
            index.add(&vec)?;
        }

        batches += 1;
        debug!("embedded batch {} ({} chunks)", batches, batch.len());
        progress.report(ProgressEvent::Advancing {
            stage: "index".to_string(),
            n: index.len() as u64,
            total,
        });
    }

    publish(config, &index, chunks, provider.model_name()).await?;

    info!(
        "indexed {} chunks with {} ({} dims)",
        chunks.len(),
        provider.model_name(),
        dims
    );

    Ok(IndexReport {
        chunks: chunks.len(),
        dims,
        batches,
        model: provider.model_name().to_string(),
    })
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write the index and metadata next to their targets, then rename both into
/// place. On failure the previous artifacts are left untouched.
async fn publish(
    config: &Config,
    index: &FlatIpIndex,
    chunks: &[ChunkRecord],
    model: &str,
) -> Result<()> {
    let index_path = config.paths.index_path();
    let meta_path = config.paths.meta_path();
    let staged_index = staging_path(&index_path);
    let staged_meta = staging_path(&meta_path);

    let staged = async {
        index.save(&staged_index)?;
        let meta = MetadataStore::create(&staged_meta).await?;
        meta.write_all(chunks, model).await?;
        meta.close().await;
        Ok::<_, anyhow::Error>(())
    }
    .await;
    if let Err(e) = staged {
        let _ = std::fs::remove_file(&staged_index);
        let _ = std::fs::remove_file(&staged_meta);
        return Err(e);
    }

    std::fs::rename(&staged_meta, &meta_path)
        .with_context(|| format!("Failed to move metadata into {}", meta_path.display()))?;
    std::fs::rename(&staged_index, &index_path)
        .with_context(|| format!("Failed to move index into {}", index_path.display()))?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::embedding::EmbeddingProvider;

    /// Deterministic embedder: one axis per keyword, plus a bias axis.
    pub struct KeywordEmbedder {
        pub keywords: Vec<&'static str>,
        pub calls: AtomicUsize,
    }

    impl KeywordEmbedder {
        pub fn new(keywords: Vec<&'static str>) -> Self {
            Self {
                keywords,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn vector(&self, text: &str) -> Vec<f32> {
            let lower = text.to_lowercase();
            let mut v: Vec<f32> = self
                .keywords
                .iter()
                .map(|k| lower.matches(k).count() as f32)
                .collect();
            v.push(0.1);
            v
        }
    }

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        fn model_name(&self) -> &str {
            "keyword-test"
        }
        fn dims(&self) -> usize {
            self.keywords.len() + 1
        }
        async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| self.vector(t)).collect())
        }
    }
}
