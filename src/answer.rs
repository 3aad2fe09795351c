//! Answer orchestration: retrieve, assemble, prompt.

use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

use crate::chat::{create_chat_provider, ChatProvider};
use crate::config::Config;
use crate::context::assemble_context;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::models::{Answer, RetrievalHit};
use crate::prompts::{render_user_message, NO_BACKGROUND, SYSTEM_PROMPT};
use crate::retrieve::Retriever;
use crate::tokens::{BpeCounter, TokenCounter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerMode {
    /// Retrieve background from the index before prompting.
    Rag,
    /// Prompt with the placeholder background only.
    Static,
}

impl AnswerMode {
    pub fn from_use_rag(use_rag: bool) -> Self {
        if use_rag {
            AnswerMode::Rag
        } else {
            AnswerMode::Static
        }
    }
}

/// Everything one answer call needs. Cheap to share behind an `Arc`.
///
/// Index handles are not held: each RAG call reopens them.
pub struct Answerer {
    config: Config,
    embedder: Arc<dyn EmbeddingProvider>,
    chat: Arc<dyn ChatProvider>,
    counter: Arc<dyn TokenCounter>,
}

impl Answerer {
    pub fn new(
        config: Config,
        embedder: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatProvider>,
        counter: Arc<dyn TokenCounter>,
    ) -> Self {
        Self {
            config,
            embedder,
            chat,
            counter,
        }
    }

    /// Build the configured embedding and chat providers.
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::from(create_provider(&config.embedding)?);
        let chat: Arc<dyn ChatProvider> = Arc::from(create_chat_provider(&config.chat)?);
        let counter: Arc<dyn TokenCounter> = Arc::new(BpeCounter::new(&config.chunking.encoding)?);
        Ok(Self::new(config.clone(), embedder, chat, counter))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn answer(&self, question: &str, mode: AnswerMode) -> Result<Answer> {
        let (context, hits) = match mode {
            AnswerMode::Rag => {
                let hits = self.retrieve(question).await?;
                let context = assemble_context(
                    &hits,
                    self.config.retrieval.max_context_tokens,
                    self.counter.as_ref(),
                );
                (context, hits)
            }
            AnswerMode::Static => (NO_BACKGROUND.to_string(), Vec::new()),
        };

        let user = render_user_message(question, &context);
        debug!(
            "asking {} ({:?}, {} hits)",
            self.chat.model_name(),
            mode,
            hits.len()
        );
        let text = self
            .chat
            .complete(SYSTEM_PROMPT, &user, self.config.chat.temperature)
            .await?;

        Ok(Answer {
            text: text.trim().to_string(),
            hits,
        })
    }

    async fn retrieve(&self, question: &str) -> Result<Vec<RetrievalHit>> {
        let retriever = Retriever::open(&self.config.paths).await?;
        let hits = retriever
            .retrieve(self.embedder.as_ref(), question, self.config.retrieval.top_k)
            .await;
        retriever.close().await;
        hits
    }
}

pub async fn run_answer(config: &Config, question: &str, mode: AnswerMode) -> Result<()> {
    let answerer = Answerer::from_config(config)?;
    let answer = answerer.answer(question, mode).await?;

    println!("{}", answer.text);
    if !answer.hits.is_empty() {
        println!();
        println!("sources:");
        for hit in &answer.hits {
            println!(
                "  [{:.4}] {} ({})",
                hit.score, hit.chunk.source_name, hit.chunk.chunk_id
            );
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::chat::ChatProvider;

    /// Records every user message and answers with a fixed reply.
    pub struct RecordingChat {
        pub reply: String,
        pub fail: bool,
        pub seen: Mutex<Vec<String>>,
    }

    impl RecordingChat {
        pub fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                fail: false,
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new("")
            }
        }

        pub fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatProvider for RecordingChat {
        fn model_name(&self) -> &str {
            "recording"
        }
        async fn complete(&self, _system: &str, user: &str, _temperature: f32) -> Result<String> {
            self.seen.lock().unwrap().push(user.to_string());
            if self.fail {
                bail!("upstream unavailable");
            }
            Ok(format!("  {}  ", self.reply))
        }
    }
}
