//! Token counting.
//!
//! Chunk sizes and the context budget are measured in tokens of a fixed
//! BPE encoding so that limits line up with what the language model sees.

use anyhow::{bail, Result};
use tiktoken_rs::CoreBPE;

/// Counts tokens in a piece of text.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// BPE token counter backed by `tiktoken-rs`.
pub struct BpeCounter {
    bpe: CoreBPE,
}

impl BpeCounter {
    /// Load a named encoding. Only `cl100k_base` and `o200k_base` are supported.
    pub fn new(encoding: &str) -> Result<Self> {
        let bpe = match encoding {
            "cl100k_base" => tiktoken_rs::cl100k_base()?,
            "o200k_base" => tiktoken_rs::o200k_base()?,
            other => bail!(
                "Unknown token encoding: '{}'. Must be cl100k_base or o200k_base.",
                other
            ),
        };
        Ok(Self { bpe })
    }

    pub fn cl100k() -> Result<Self> {
        Self::new("cl100k_base")
    }
}

impl TokenCounter for BpeCounter {
    fn count(&self, text: &str) -> usize {
        // Special-token strings are counted as ordinary text.
        self.bpe.encode_ordinary(text).len()
    }
}

/// Counts whitespace-separated words. Deterministic stand-in for tests and
/// offline dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceCounter;

impl TokenCounter for WhitespaceCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}
