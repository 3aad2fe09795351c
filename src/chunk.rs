//! Paragraph-boundary, token-bounded text chunker.
//!
//! Paragraphs (non-empty trimmed lines) are accumulated greedily into a
//! buffer until the next paragraph would push the buffer past `max_tokens`;
//! the buffer is then emitted and a new one started. A single paragraph
//! larger than `max_tokens` is emitted as its own oversized chunk and never
//! split further.
//!
//! Every accumulated chunk is re-checked by the privacy filter and dropped
//! if flagged, then dropped if it has fewer than `min_tokens` tokens. Chunk
//! ids are `<doc_id>_<n>` where `n` is the position in the accumulation
//! output before filtering, so surviving ids may have gaps.

use anyhow::Result;
use tracing::debug;

use crate::config::{ChunkingConfig, Config};
use crate::models::{ChunkRecord, Document};
use crate::privacy::{HeuristicPrivacyFilter, PrivacyClassifier};
use crate::store::{read_jsonl, JsonlWriter};
use crate::tokens::{BpeCounter, TokenCounter};

/// Split text into trimmed, non-empty lines.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Greedily pack paragraphs into `\n`-joined chunks of at most `max_tokens`
/// (summed per paragraph). Each paragraph is counted once.
pub fn chunk_paragraphs(
    paragraphs: &[&str],
    max_tokens: usize,
    counter: &dyn TokenCounter,
) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buf: Vec<&str> = Vec::new();
    let mut buf_tokens = 0usize;

    for p in paragraphs {
        let p_tokens = counter.count(p);
        if buf_tokens + p_tokens > max_tokens && !buf.is_empty() {
            chunks.push(buf.join("\n"));
            buf.clear();
            buf_tokens = 0;
        }
        buf.push(p);
        buf_tokens += p_tokens;
    }

    if !buf.is_empty() {
        chunks.push(buf.join("\n"));
    }

    chunks
}

/// Per-run chunking counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChunkReport {
    pub documents: u64,
    pub skipped_type: u64,
    pub chunks_written: u64,
    pub dropped_personal: u64,
    pub dropped_small: u64,
}

/// Turns documents into chunk records.
pub struct Chunker<'a> {
    config: &'a ChunkingConfig,
    counter: &'a dyn TokenCounter,
    privacy: &'a dyn PrivacyClassifier,
}

impl<'a> Chunker<'a> {
    pub fn new(
        config: &'a ChunkingConfig,
        counter: &'a dyn TokenCounter,
        privacy: &'a dyn PrivacyClassifier,
    ) -> Self {
        Self {
            config,
            counter,
            privacy,
        }
    }

    /// Chunk one document, updating `report` with what was dropped.
    pub fn chunk_document(&self, doc: &Document, report: &mut ChunkReport) -> Vec<ChunkRecord> {
        let paragraphs = split_paragraphs(&doc.text);
        let mut records = Vec::new();

        for (idx, text) in chunk_paragraphs(&paragraphs, self.config.max_tokens, self.counter)
            .into_iter()
            .enumerate()
        {
            if self.privacy.is_personal(&text) {
                debug!("dropping personal chunk {}_{}", doc.doc_id, idx);
                report.dropped_personal += 1;
                continue;
            }
            let n_tokens = self.counter.count(&text);
            if n_tokens < self.config.min_tokens {
                report.dropped_small += 1;
                continue;
            }

            records.push(ChunkRecord {
                chunk_id: format!("{}_{}", doc.doc_id, idx),
                doc_id: doc.doc_id.clone(),
                source_path: doc.source_path.clone(),
                source_name: doc.source_name.clone(),
                module: doc.module.clone(),
                doc_type: doc.doc_type,
                text,
                n_tokens,
            });
        }

        records
    }
}

/// Chunk every allow-listed document from the document store into the
/// chunk store. Documents of any other type are dropped silently.
pub fn chunk_documents(
    config: &Config,
    counter: &dyn TokenCounter,
    privacy: &dyn PrivacyClassifier,
) -> Result<ChunkReport> {
    let docs: Vec<Document> = read_jsonl(&config.paths.docs_jsonl())?;
    let chunker = Chunker::new(&config.chunking, counter, privacy);
    let mut report = ChunkReport::default();
    let mut out = JsonlWriter::create(&config.paths.chunks_jsonl())?;

    for doc in &docs {
        if !config.doc_types.is_allowed(doc.doc_type) {
            debug!(
                "skipping {} (doc_type {} not allowed)",
                doc.source_name, doc.doc_type
            );
            report.skipped_type += 1;
            continue;
        }
        report.documents += 1;
        for record in chunker.chunk_document(doc, &mut report) {
            out.write(&record)?;
            report.chunks_written += 1;
        }
    }

    out.finish()?;
    Ok(report)
}

pub fn run_chunk(config: &Config) -> Result<ChunkReport> {
    let counter = BpeCounter::new(&config.chunking.encoding)?;
    let report = chunk_documents(config, &counter, &HeuristicPrivacyFilter)?;

    println!("chunk");
    println!("  documents chunked: {}", report.documents);
    println!("  documents skipped (type): {}", report.skipped_type);
    println!("  chunks written: {}", report.chunks_written);
    println!("  dropped (personal): {}", report.dropped_personal);
    println!("  dropped (below {} tokens): {}", config.chunking.min_tokens, report.dropped_small);
    println!("ok");

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocType;
    use crate::tokens::WhitespaceCounter;

    fn words(letter: &str, n: usize) -> String {
        vec![letter; n].join(" ")
    }

    fn doc(text: &str) -> Document {
        Document {
            doc_id: "d1".into(),
            source_path: "data/raw/screening.txt".into(),
            source_name: "screening".into(),
            doc_type: DocType::ScreeningProcess,
            module: "Unknown".into(),
            text: text.into(),
        }
    }

    #[test]
    fn test_split_paragraphs_trims_and_drops_blank() {
        assert_eq!(
            split_paragraphs("  one \n\n\t\ntwo\r\n three"),
            vec!["one", "two", "three"]
        );
    }

    #[test]
    fn test_greedy_accumulation_pairs_when_budget_allows() {
        let a = words("A", 10);
        let b = words("B", 10);
        let c = words("C", 10);
        let chunks = chunk_paragraphs(&[&a, &b, &c], 20, &WhitespaceCounter);
        assert_eq!(chunks, vec![format!("{}\n{}", a, b), c.clone()]);
    }

    #[test]
    fn test_greedy_accumulation_splits_each_when_pair_exceeds() {
        let a = words("A", 10);
        let b = words("B", 10);
        let c = words("C", 10);
        let chunks = chunk_paragraphs(&[&a, &b, &c], 15, &WhitespaceCounter);
        assert_eq!(chunks, vec![a, b, c]);
    }

    #[test]
    fn test_oversized_paragraph_is_its_own_chunk() {
        // Accepted edge case: no sub-splitting of a single long paragraph.
        let small = words("s", 3);
        let big = words("B", 50);
        let chunks = chunk_paragraphs(&[&small, &big, &small], 10, &WhitespaceCounter);
        assert_eq!(chunks, vec![small.clone(), big, small]);
    }

    #[test]
    fn test_no_paragraphs_no_chunks() {
        assert!(chunk_paragraphs(&[], 10, &WhitespaceCounter).is_empty());
    }

    #[test]
    fn test_chunk_document_ids_and_token_counts() {
        let cfg = ChunkingConfig {
            min_tokens: 2,
            max_tokens: 6,
            encoding: "cl100k_base".into(),
        };
        let text = format!("{}\n{}\n{}", words("a", 4), words("b", 4), words("c", 2));
        let chunker = Chunker::new(&cfg, &WhitespaceCounter, &HeuristicPrivacyFilter);
        let mut report = ChunkReport::default();
        let records = chunker.chunk_document(&doc(&text), &mut report);

        let ids: Vec<&str> = records.iter().map(|r| r.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["d1_0", "d1_1"]);
        for r in &records {
            assert_eq!(WhitespaceCounter.count(&r.text), r.n_tokens);
            assert!(r.n_tokens >= cfg.min_tokens);
            assert_eq!(r.doc_type, DocType::ScreeningProcess);
        }
        assert_eq!(records[1].text, format!("{}\n{}", words("b", 4), words("c", 2)));
    }

    #[test]
    fn test_small_chunks_dropped_and_ids_keep_gaps() {
        let cfg = ChunkingConfig {
            min_tokens: 3,
            max_tokens: 4,
            encoding: "cl100k_base".into(),
        };
        let text = format!("{}\n{}\n{}", words("a", 4), words("b", 1), words("c", 4));
        let chunker = Chunker::new(&cfg, &WhitespaceCounter, &HeuristicPrivacyFilter);
        let mut report = ChunkReport::default();
        let records = chunker.chunk_document(&doc(&text), &mut report);

        // "b" merges with nothing (4+1 > 4), stands alone and is too small.
        let ids: Vec<&str> = records.iter().map(|r| r.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["d1_0", "d1_2"]);
        assert_eq!(report.dropped_small, 1);
    }

    #[test]
    fn test_personal_chunk_dropped() {
        let cfg = ChunkingConfig {
            min_tokens: 1,
            max_tokens: 5,
            encoding: "cl100k_base".into(),
        };
        let text = "screening finds changes early\nmy brother reminded everyone\nclinics offer evening hours";
        let chunker = Chunker::new(&cfg, &WhitespaceCounter, &HeuristicPrivacyFilter);
        let mut report = ChunkReport::default();
        let records = chunker.chunk_document(&doc(text), &mut report);

        assert_eq!(report.dropped_personal, 1);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| !r.text.contains("brother")));
    }

    #[test]
    fn test_bpe_counts_are_idempotent() {
        let counter = BpeCounter::cl100k().unwrap();
        let cfg = ChunkingConfig {
            min_tokens: 1,
            max_tokens: 30,
            encoding: "cl100k_base".into(),
        };
        let text = "A mammogram is an X-ray picture of the breast.\n\
                    Screening can find changes before symptoms appear.\n\
                    Clinics can help with transportation and interpreters.\n\
                    Ask which days have walk-in appointments.";
        let chunker = Chunker::new(&cfg, &counter, &HeuristicPrivacyFilter);
        let mut report = ChunkReport::default();
        let records = chunker.chunk_document(&doc(text), &mut report);
        assert!(!records.is_empty());
        for r in &records {
            assert_eq!(counter.count(&r.text), r.n_tokens);
        }
    }
}
