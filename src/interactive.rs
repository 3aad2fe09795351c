//! Interactive terminal loop comparing RAG and static answers.

use anyhow::Result;
use std::io::{BufRead, Write};

use crate::answer::{AnswerMode, Answerer};
use crate::config::Config;

pub const EMPTY_INPUT_REPLY: &str = "Please enter a question.";

/// One turn's output, ready to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Empty,
    Answers { rag: String, static_answer: String },
}

impl Reply {
    pub fn render(&self) -> String {
        match self {
            Reply::Empty => EMPTY_INPUT_REPLY.to_string(),
            Reply::Answers { rag, static_answer } => format!(
                "## RAG Answer\n\n{}\n\n## Static Answer (No RAG)\n\n{}",
                rag, static_answer
            ),
        }
    }
}

/// Answer one message both ways. Blank input makes no external call.
pub async fn respond(answerer: &Answerer, message: &str) -> Result<Reply> {
    let question = message.trim();
    if question.is_empty() {
        return Ok(Reply::Empty);
    }
    let rag = answerer.answer(question, AnswerMode::Rag).await?;
    let static_answer = answerer.answer(question, AnswerMode::Static).await?;
    Ok(Reply::Answers {
        rag: rag.text,
        static_answer: static_answer.text,
    })
}

/// Read questions line by line until `exit`, `quit`, or end of input.
pub async fn repl<R: BufRead, W: Write>(answerer: &Answerer, input: R, out: &mut W) -> Result<()> {
    write!(out, "> ")?;
    out.flush()?;

    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
            break;
        }

        match respond(answerer, trimmed).await {
            Ok(reply) => writeln!(out, "{}\n", reply.render())?,
            Err(e) => writeln!(out, "error: {:#}\n", e)?,
        }
        write!(out, "> ")?;
        out.flush()?;
    }

    writeln!(out)?;
    Ok(())
}

pub async fn run_interactive(config: &Config) -> Result<()> {
    let answerer = Answerer::from_config(config)?;

    println!("Breast Cancer Education Assistant");
    println!("Educational information only; no diagnoses or treatment advice.");
    println!("Type a question, or `exit` to quit.");
    println!();

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    repl(&answerer, stdin.lock(), &mut stdout).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::test_support::RecordingChat;
    use crate::index::test_support::KeywordEmbedder;
    use crate::tokens::WhitespaceCounter;
    use std::sync::Arc;

    fn static_only_answerer(chat: Arc<RecordingChat>) -> Answerer {
        let mut cfg = Config::minimal();
        cfg.paths.index_dir = std::env::temp_dir().join("prag-interactive-no-index");
        Answerer::new(
            cfg,
            Arc::new(KeywordEmbedder::new(vec!["x"])),
            chat,
            Arc::new(WhitespaceCounter),
        )
    }

    #[tokio::test]
    async fn test_blank_input_makes_no_call() {
        let chat = Arc::new(RecordingChat::new("unused"));
        let answerer = static_only_answerer(chat.clone());
        let reply = respond(&answerer, "   ").await.unwrap();
        assert_eq!(reply, Reply::Empty);
        assert_eq!(reply.render(), "Please enter a question.");
        assert_eq!(chat.calls(), 0);
    }

    #[test]
    fn test_render_headers() {
        let reply = Reply::Answers {
            rag: "grounded".into(),
            static_answer: "general".into(),
        };
        assert_eq!(
            reply.render(),
            "## RAG Answer\n\ngrounded\n\n## Static Answer (No RAG)\n\ngeneral"
        );
    }

    #[tokio::test]
    async fn test_repl_stops_at_quit() {
        let chat = Arc::new(RecordingChat::new("unused"));
        let answerer = static_only_answerer(chat.clone());
        let input = std::io::Cursor::new("\nquit\nWhat is a mammogram?\n");
        let mut out = Vec::new();
        repl(&answerer, input, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Please enter a question."));
        assert_eq!(chat.calls(), 0);
    }

    #[tokio::test]
    async fn test_repl_reports_errors_and_continues() {
        let chat = Arc::new(RecordingChat::new("unused"));
        let answerer = static_only_answerer(chat);
        let input = std::io::Cursor::new("first?\nsecond?\n");
        let mut out = Vec::new();
        repl(&answerer, input, &mut out).await.unwrap();

        // No index: each RAG call fails, the loop keeps going.
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("error:").count(), 2);
    }
}
