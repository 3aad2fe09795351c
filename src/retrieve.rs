//! Query-time nearest-neighbour lookup over the built index.

use anyhow::{bail, Context, Result};
use tracing::warn;

use crate::config::{Config, PathsConfig};
use crate::embedding::{self, embed_query, l2_normalize, EmbeddingProvider};
use crate::metadata::MetadataStore;
use crate::models::RetrievalHit;
use crate::vector_index::FlatIpIndex;

/// Open handles on the vector index and its metadata table.
pub struct Retriever {
    index: FlatIpIndex,
    meta: MetadataStore,
    model: Option<String>,
}

impl Retriever {
    /// Open both artifacts, checking they exist and describe the same rows.
    pub async fn open(paths: &PathsConfig) -> Result<Self> {
        let index_path = paths.index_path();
        let meta_path = paths.meta_path();

        if !index_path.exists() {
            bail!(
                "Vector index not found at {}. Run `prag index` first.",
                index_path.display()
            );
        }
        if !meta_path.exists() {
            bail!(
                "Metadata table not found at {}. Run `prag index` first.",
                meta_path.display()
            );
        }

        let index = FlatIpIndex::load(&index_path)?;
        let meta = MetadataStore::open(&meta_path)
            .await
            .with_context(|| format!("Failed to open metadata {}", meta_path.display()))?;

        let rows = meta.count().await?;
        if rows != index.len() {
            bail!(
                "Index has {} vectors but metadata has {} rows. Rebuild with `prag index`.",
                index.len(),
                rows
            );
        }

        let model = meta.embedding_model().await?;
        Ok(Self { index, meta, model })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Embed `query` and return up to `top_k` hits, best first.
    pub async fn retrieve(
        &self,
        provider: &dyn EmbeddingProvider,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalHit>> {
        if let Some(model) = self.model.as_deref() {
            if model != provider.model_name() {
                warn!(
                    "index was built with {} but queries use {}",
                    model,
                    provider.model_name()
                );
            }
        }

        let mut q = embed_query(provider, query).await?;
        if q.len() != self.index.dims() {
            bail!(
                "query embedding has {} dims but the index was built with {}",
                q.len(),
                self.index.dims()
            );
        }
        l2_normalize(&mut q);

        let mut hits = Vec::new();
        for (position, score) in self.index.search(&q, top_k)? {
            if position < 0 {
                continue;
            }
            let chunk = self.meta.get(position as usize).await?.ok_or_else(|| {
                anyhow::anyhow!("metadata row {} missing; rebuild with `prag index`", position)
            })?;
            hits.push(RetrievalHit { chunk, score });
        }

        Ok(hits)
    }

    pub async fn close(self) {
        self.meta.close().await;
    }
}

pub async fn run_retrieve(config: &Config, query: &str, top_k: Option<usize>) -> Result<()> {
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    if top_k < 1 {
        bail!("--top-k must be >= 1");
    }
    let provider = embedding::create_provider(&config.embedding)?;
    let retriever = Retriever::open(&config.paths).await?;
    let hits = retriever.retrieve(provider.as_ref(), query, top_k).await?;
    retriever.close().await;

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let preview: String = hit.chunk.text.chars().take(160).collect();
        println!(
            "{}. [{:.4}] {} ({})",
            i + 1,
            hit.score,
            hit.chunk.source_name,
            hit.chunk.chunk_id
        );
        println!("   doc_type: {}  module: {}", hit.chunk.doc_type, hit.chunk.module);
        println!("   {}", preview.replace('\n', " "));
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build_index;
    use crate::index::test_support::KeywordEmbedder;
    use crate::models::{ChunkRecord, DocType};
    use crate::progress::NoProgress;
    use crate::store::JsonlWriter;
    use tempfile::TempDir;

    async fn built(root: &std::path::Path, texts: &[&str]) -> (Config, KeywordEmbedder) {
        let mut cfg = Config::minimal();
        cfg.paths.processed_dir = root.join("processed");
        cfg.paths.index_dir = root.join("index");
        let mut w = JsonlWriter::create(&cfg.paths.chunks_jsonl()).unwrap();
        for (i, t) in texts.iter().enumerate() {
            w.write(&ChunkRecord {
                chunk_id: format!("c_{}", i),
                doc_id: "c".into(),
                source_path: format!("data/raw/s{}.txt", i),
                source_name: format!("s{}", i),
                module: "Unknown".into(),
                doc_type: DocType::EducationScript,
                text: t.to_string(),
                n_tokens: 1,
            })
            .unwrap();
        }
        w.finish().unwrap();
        let embedder = KeywordEmbedder::new(vec!["mammogram", "bus", "cost"]);
        build_index(&cfg, &embedder, &NoProgress).await.unwrap();
        (cfg, embedder)
    }

    #[tokio::test]
    async fn test_top_k_over_larger_index() {
        let tmp = TempDir::new().unwrap();
        let (cfg, embedder) = built(
            tmp.path(),
            &[
                "bus",
                "mammogram mammogram",
                "cost",
                "mammogram bus",
                "nothing here",
            ],
        )
        .await;

        let retriever = Retriever::open(&cfg.paths).await.unwrap();
        assert_eq!(retriever.len(), 5);
        let hits = retriever.retrieve(&embedder, "mammogram", 3).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].chunk.chunk_id, "c_1");
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_top_k_beyond_index_skips_padding() {
        let tmp = TempDir::new().unwrap();
        let (cfg, embedder) = built(tmp.path(), &["bus", "cost"]).await;
        let retriever = Retriever::open(&cfg.paths).await.unwrap();
        let hits = retriever.retrieve(&embedder, "bus", 8).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.source_name, "s0");
    }

    #[tokio::test]
    async fn test_missing_artifacts_name_the_fix() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = Config::minimal();
        cfg.paths.index_dir = tmp.path().join("index");
        let err = Retriever::open(&cfg.paths).await.err().unwrap().to_string();
        assert!(err.contains("prag index"), "{}", err);
    }

    #[tokio::test]
    async fn test_count_mismatch_rejected() {
        let tmp = TempDir::new().unwrap();
        let (cfg, _) = built(tmp.path(), &["bus", "cost"]).await;
        let mut bigger = FlatIpIndex::new(4);
        for _ in 0..3 {
            bigger.add(&[0.0, 0.0, 0.0, 1.0]).unwrap();
        }
        bigger.save(&cfg.paths.index_path()).unwrap();

        let err = Retriever::open(&cfg.paths).await.err().unwrap().to_string();
        assert!(err.contains("3 vectors"), "{}", err);
    }

    #[tokio::test]
    async fn test_query_dims_must_match() {
        let tmp = TempDir::new().unwrap();
        let (cfg, _) = built(tmp.path(), &["bus"]).await;
        let retriever = Retriever::open(&cfg.paths).await.unwrap();
        let other = KeywordEmbedder::new(vec!["a"]);
        assert!(retriever.retrieve(&other, "a", 1).await.is_err());
    }
}
