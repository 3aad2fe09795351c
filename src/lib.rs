//! # Privacy RAG
//!
//! A privacy-first retrieval-augmented answering pipeline for breast-cancer
//! education materials.
//!
//! Source documents are filtered for personal or narrative content twice
//! (whole document at ingestion, every chunk at chunking), embedded into an
//! exact inner-product index, and used as token-budgeted background for a
//! chat model behind a fixed education-only system prompt.
//!
//! ## Architecture
//!
//! ```text
//! raw files ──▶ ingest ──▶ docs.jsonl ──▶ chunk ──▶ chunks.jsonl ──▶ index
//!   (privacy + type filter)        (privacy + size filter)            │
//!                                                                     ▼
//!                                          vectors.index + metadata.sqlite
//!                                                                     │
//!        question ──▶ retrieve ──▶ assemble context ──▶ chat ──▶ answer
//!                                                                     │
//!                                   CLI · HTTP · batch CSV · eval · ask
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Documents, chunks, hits, answers |
//! | [`privacy`] | Heuristic personal-content filter |
//! | [`ingest`] | Raw files to the document store |
//! | [`chunk`] | Paragraph-bounded, token-bounded chunking |
//! | [`index`] | Embedding and index build |
//! | [`retrieve`] | Query-time nearest-neighbour lookup |
//! | [`context`] | Deduplicated, token-budgeted context assembly |
//! | [`answer`] | RAG and static answer orchestration |
//! | [`server`] | HTTP answer endpoint |

pub mod answer;
pub mod batch;
pub mod chat;
pub mod chunk;
pub mod classify;
pub mod config;
pub mod connector_fs;
pub mod context;
pub mod db;
pub mod embedding;
pub mod eval;
pub mod extract;
pub mod http;
pub mod index;
pub mod ingest;
pub mod interactive;
pub mod metadata;
pub mod models;
pub mod privacy;
pub mod progress;
pub mod prompts;
pub mod retrieve;
pub mod server;
pub mod store;
pub mod tokens;
pub mod vector_index;
