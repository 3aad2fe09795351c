//! Fixed-question comparison of RAG and static answers.

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::path::PathBuf;

use crate::answer::{AnswerMode, Answerer};
use crate::config::Config;
use crate::models::HitSummary;
use crate::store::JsonlWriter;

pub const EVAL_QUESTIONS: [&str; 3] = [
    "What happens during a mammogram?",
    "I have no symptoms. Do I still need screening?",
    "When should I start screening?",
];

#[derive(Debug, Serialize)]
pub struct EvalRecord {
    pub timestamp: String,
    pub question: String,
    pub rag_response: String,
    pub static_response: String,
    pub rag_hits: Vec<HitSummary>,
}

pub async fn run_eval(config: &Config) -> Result<()> {
    let answerer = Answerer::from_config(config)?;
    let path = evaluate(&answerer, &EVAL_QUESTIONS).await?;

    println!("eval");
    println!("  questions: {}", EVAL_QUESTIONS.len());
    println!("  output: {}", path.display());
    println!("ok");
    Ok(())
}

/// Answer each question both ways and write `results_dir/eval.jsonl`.
/// The first failing call aborts the run.
pub async fn evaluate(answerer: &Answerer, questions: &[&str]) -> Result<PathBuf> {
    let path = answerer.config().paths.results_dir.join("eval.jsonl");
    let mut out = JsonlWriter::create(&path)?;

    for question in questions {
        let rag = answerer.answer(question, AnswerMode::Rag).await?;
        let static_answer = answerer.answer(question, AnswerMode::Static).await?;

        out.write(&EvalRecord {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            question: question.to_string(),
            rag_hits: rag.hit_summaries(),
            rag_response: rag.text,
            static_response: static_answer.text,
        })?;
    }

    out.finish()?;
    Ok(path)
}
