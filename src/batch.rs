//! Batch CSV answering for case studies.
//!
//! Reads a CSV with a `question` column, answers each row with and without
//! retrieval, and writes the input columns plus `static_response`,
//! `rag_response` and `rag_sources`.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::answer::{AnswerMode, Answerer};
use crate::config::Config;
use crate::progress::{ProgressEvent, ProgressMode, ProgressReporter};

pub const OUTPUT_COLUMNS: [&str; 3] = ["static_response", "rag_response", "rag_sources"];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub rows: u64,
    pub answered: u64,
    pub failed: u64,
    pub skipped: u64,
}

/// `results_dir/case_study_YYYYMMDD_HHMMSS.csv` in local time.
pub fn default_output_path(config: &Config) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    config
        .paths
        .results_dir
        .join(format!("case_study_{}.csv", stamp))
}

pub async fn run_batch(
    config: &Config,
    input: &Path,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    if !input.exists() {
        bail!("Input file not found: {}", input.display());
    }
    let output = output.unwrap_or_else(|| default_output_path(config));
    let progress = if quiet {
        ProgressMode::Off
    } else {
        ProgressMode::default_for_tty()
    }
    .reporter();

    let answerer = Answerer::from_config(config)?;
    let report = batch_answer(&answerer, input, &output, progress.as_ref()).await?;

    println!("batch");
    println!("  rows: {}", report.rows);
    println!("  answered: {}", report.answered);
    println!("  failed: {}", report.failed);
    println!("  skipped (empty question): {}", report.skipped);
    if report.rows > 0 {
        println!("  output: {}", output.display());
    }
    println!("ok");
    Ok(())
}

/// Answer every row of `input` and write the results to `output`.
///
/// A row whose question fails records `ERROR: <message>` in both response
/// columns and processing continues. Rows with a blank question are
/// skipped. An input with no data rows writes no file.
pub async fn batch_answer(
    answerer: &Answerer,
    input: &Path,
    output: &Path,
    progress: &dyn ProgressReporter,
) -> Result<BatchReport> {
    let mut reader = csv::Reader::from_path(input)
        .with_context(|| format!("Failed to open {}", input.display()))?;
    let headers = reader.headers()?.clone();
    let Some(question_col) = headers.iter().position(|h| h == "question") else {
        bail!("Input CSV must contain a 'question' column");
    };

    let records = reader
        .records()
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let mut report = BatchReport {
        rows: records.len() as u64,
        ..BatchReport::default()
    };
    if records.is_empty() {
        println!("No questions found in input file.");
        return Ok(report);
    }

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut out_headers: Vec<&str> = headers.iter().collect();
    out_headers.extend(OUTPUT_COLUMNS);
    writer.write_record(&out_headers)?;

    for (i, record) in records.iter().enumerate() {
        progress.report(ProgressEvent::Advancing {
            stage: "batch".to_string(),
            n: i as u64 + 1,
            total: report.rows,
        });

        let question = record.get(question_col).unwrap_or("").trim();
        if question.is_empty() {
            warn!("skipping row {} with empty question", i + 1);
            report.skipped += 1;
            continue;
        }

        let (static_response, rag_response, rag_sources) = match answer_both(answerer, question).await
        {
            Ok(cols) => {
                report.answered += 1;
                cols
            }
            Err(e) => {
                warn!("row {} failed: {:#}", i + 1, e);
                report.failed += 1;
                let msg = format!("ERROR: {:#}", e);
                (msg.clone(), msg, String::new())
            }
        };

        let mut row: Vec<&str> = record.iter().collect();
        row.push(&static_response);
        row.push(&rag_response);
        row.push(&rag_sources);
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(report)
}

/// `(static_response, rag_response, rag_sources)` for one question.
async fn answer_both(answerer: &Answerer, question: &str) -> Result<(String, String, String)> {
    let rag = answerer.answer(question, AnswerMode::Rag).await?;
    let static_answer = answerer.answer(question, AnswerMode::Static).await?;
    let sources = rag
        .hits
        .iter()
        .map(|h| h.chunk.source_name.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    Ok((static_answer.text, rag.text, sources))
}
