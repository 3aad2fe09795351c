//! Token-budgeted context assembly.

use std::collections::HashSet;

use crate::models::RetrievalHit;
use crate::tokens::TokenCounter;

pub const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

/// Format one hit as a prompt block.
pub fn format_block(hit: &RetrievalHit) -> String {
    format!("Source: {}\n{}", hit.chunk.source_name, hit.chunk.text)
}

/// Join hits into a single background block.
///
/// Hits are deduplicated by `(doc_id, chunk_id)`, first occurrence wins.
/// Blocks are taken in order while the running token total stays within
/// `max_tokens`; the first block that would exceed it ends assembly, so the
/// result is always a prefix of the deduplicated list. Separators are not
/// counted. Returns an empty string when nothing fits.
pub fn assemble_context(
    hits: &[RetrievalHit],
    max_tokens: usize,
    counter: &dyn TokenCounter,
) -> String {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut blocks = Vec::new();
    let mut used = 0usize;

    for hit in hits {
        if !seen.insert((hit.chunk.doc_id.as_str(), hit.chunk.chunk_id.as_str())) {
            continue;
        }
        let block = format_block(hit);
        let n = counter.count(&block);
        if used + n > max_tokens {
            break;
        }
        used += n;
        blocks.push(block);
    }

    blocks.join(BLOCK_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChunkRecord, DocType};
    use crate::tokens::WhitespaceCounter;

    fn hit(doc: &str, chunk: &str, name: &str, text: &str) -> RetrievalHit {
        RetrievalHit {
            chunk: ChunkRecord {
                chunk_id: chunk.into(),
                doc_id: doc.into(),
                source_path: format!("data/raw/{}.txt", name),
                source_name: name.into(),
                module: "Unknown".into(),
                doc_type: DocType::ScreeningProcess,
                text: text.into(),
                n_tokens: 0,
            },
            score: 0.9,
        }
    }

    #[test]
    fn test_empty_hits() {
        assert_eq!(assemble_context(&[], 100, &WhitespaceCounter), "");
    }

    #[test]
    fn test_duplicates_contribute_once() {
        let h = hit("d", "d_0", "faq", "Screening saves lives.");
        let ctx = assemble_context(&[h.clone(), h], 1000, &WhitespaceCounter);
        assert_eq!(ctx, "Source: faq\nScreening saves lives.");
    }

    #[test]
    fn test_same_chunk_id_in_other_doc_is_distinct() {
        let a = hit("d1", "x_0", "a", "one");
        let b = hit("d2", "x_0", "b", "two");
        let ctx = assemble_context(&[a, b], 1000, &WhitespaceCounter);
        assert_eq!(ctx, "Source: a\none\n\n---\n\nSource: b\ntwo");
    }

    #[test]
    fn test_budget_is_a_strict_prefix() {
        // Each block is "Source: n" (2 words) + body.
        let a = hit("d", "d_0", "a", "one two");
        let b = hit("d", "d_1", "b", "three four five six seven eight");
        let c = hit("d", "d_2", "c", "nine");
        // a = 4, b = 8, c = 3; budget 10 admits a, rejects b and stops.
        let ctx = assemble_context(&[a, b, c], 10, &WhitespaceCounter);
        assert_eq!(ctx, "Source: a\none two");
    }

    #[test]
    fn test_first_block_over_budget_yields_nothing() {
        let a = hit("d", "d_0", "a", "one two three four five");
        let b = hit("d", "d_1", "b", "x");
        assert_eq!(assemble_context(&[a, b], 3, &WhitespaceCounter), "");
    }

    #[test]
    fn test_exact_budget_fits() {
        let a = hit("d", "d_0", "a", "one two");
        let b = hit("d", "d_1", "b", "three four");
        let ctx = assemble_context(&[a, b], 8, &WhitespaceCounter);
        assert_eq!(ctx.matches("Source:").count(), 2);
        assert!(ctx.contains(BLOCK_SEPARATOR));
    }
}
