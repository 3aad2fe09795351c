//! Chunk metadata table keyed by vector position.
//!
//! Row `position = i` describes the chunk whose vector sits at row `i` of
//! the flat index. The table is rebuilt from scratch on every index build.

use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};
use std::path::Path;

use crate::db;
use crate::models::{ChunkRecord, DocType};

pub struct MetadataStore {
    pool: SqlitePool,
}

impl MetadataStore {
    /// Replace any existing table at `path` with an empty one.
    pub async fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to remove old metadata {}", path.display()))?;
        }
        let pool = db::connect(path, true).await?;

        sqlx::query(
            r#"
            CREATE TABLE chunk_meta (
                position INTEGER PRIMARY KEY,
                chunk_id TEXT NOT NULL,
                doc_id TEXT NOT NULL,
                source_path TEXT NOT NULL,
                source_name TEXT NOT NULL,
                module TEXT NOT NULL,
                doc_type TEXT NOT NULL,
                text TEXT NOT NULL,
                n_tokens INTEGER NOT NULL,
                embedding_model TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Open an existing table. A missing file is an error.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect(path, false).await?;
        Ok(Self { pool })
    }

    /// Insert `chunks` with positions `0..len` in one transaction.
    pub async fn write_all(&self, chunks: &[ChunkRecord], embedding_model: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (position, chunk) in chunks.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO chunk_meta (position, chunk_id, doc_id, source_path, source_name,
                                        module, doc_type, text, n_tokens, embedding_model)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(position as i64)
            .bind(&chunk.chunk_id)
            .bind(&chunk.doc_id)
            .bind(&chunk.source_path)
            .bind(&chunk.source_name)
            .bind(&chunk.module)
            .bind(chunk.doc_type.as_str())
            .bind(&chunk.text)
            .bind(chunk.n_tokens as i64)
            .bind(embedding_model)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunk_meta")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as usize)
    }

    pub async fn get(&self, position: usize) -> Result<Option<ChunkRecord>> {
        let row = sqlx::query(
            r#"
            SELECT chunk_id, doc_id, source_path, source_name, module, doc_type, text, n_tokens
            FROM chunk_meta WHERE position = ?
            "#,
        )
        .bind(position as i64)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let doc_type: String = row.get("doc_type");
        let n_tokens: i64 = row.get("n_tokens");
        Ok(Some(ChunkRecord {
            chunk_id: row.get("chunk_id"),
            doc_id: row.get("doc_id"),
            source_path: row.get("source_path"),
            source_name: row.get("source_name"),
            module: row.get("module"),
            doc_type: doc_type.parse::<DocType>()?,
            text: row.get("text"),
            n_tokens: n_tokens as usize,
        }))
    }

    /// Embedding model recorded at build time, if any rows exist.
    pub async fn embedding_model(&self) -> Result<Option<String>> {
        let model: Option<String> =
            sqlx::query_scalar("SELECT embedding_model FROM chunk_meta ORDER BY position LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(model)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
