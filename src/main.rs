//! # Privacy RAG CLI (`prag`)
//!
//! ## Usage
//!
//! ```bash
//! prag --config ./config/prag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `prag ingest` | Read, classify and privacy-filter raw files into the document store |
//! | `prag chunk` | Split allowed documents into token-bounded chunks |
//! | `prag index` | Embed chunks and write the vector index and metadata table |
//! | `prag retrieve "<query>"` | Show the nearest chunks for a query |
//! | `prag answer "<question>"` | Answer a question (add `--static` to skip retrieval) |
//! | `prag batch --input q.csv` | Answer every row of a CSV both ways |
//! | `prag eval` | Run the fixed evaluation questions |
//! | `prag ask` | Interactive terminal loop |
//! | `prag serve` | Start the HTTP answer server |
//!
//! ## Examples
//!
//! ```bash
//! prag ingest && prag chunk && prag index
//! prag answer "What happens during a mammogram?"
//! prag batch --input data/test_questions.csv --quiet
//! PRAG_LOG=privacy_rag=debug prag retrieve "screening age" --top-k 3
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use privacy_rag::answer::{self, AnswerMode};
use privacy_rag::progress::ProgressMode;
use privacy_rag::{batch, chunk, config, eval, index, ingest, interactive, retrieve, server};

/// Privacy-first retrieval-augmented answering for breast-cancer education
/// materials.
///
/// All commands read a TOML configuration file. See
/// `config/prag.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "prag",
    about = "Privacy-first RAG pipeline for breast-cancer education materials",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/prag.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace). Overridden by `PRAG_LOG`.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors; also hides batch progress.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest raw documents.
    ///
    /// Walks the intake directory, extracts text from `.txt` and `.docx`
    /// files, classifies each document, and writes those that pass the
    /// type block list and the privacy filter to the document store.
    /// Excluded intake files are moved to the excluded-items directory.
    Ingest {
        /// Progress output on stderr: `off`, `human`, or `json`.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Chunk ingested documents.
    ///
    /// Only documents whose type is on the allow list are chunked.
    Chunk,

    /// Build the vector index and metadata table from the chunk store.
    Index {
        /// Progress output on stderr: `off`, `human`, or `json`.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Print the chunks nearest to a query.
    Retrieve {
        query: String,

        /// Number of hits (defaults to `retrieval.top_k`).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Answer one question.
    Answer {
        question: String,

        /// Skip retrieval and answer without background.
        #[arg(long = "static")]
        static_mode: bool,
    },

    /// Answer every question of a CSV file with and without retrieval.
    Batch {
        /// Input CSV with a `question` column.
        #[arg(long, short)]
        input: PathBuf,

        /// Output CSV (default: `results_dir/case_study_YYYYMMDD_HHMMSS.csv`).
        /// Progress is shown on a terminal unless `--quiet` is given.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Answer the fixed evaluation questions and write `eval.jsonl`.
    Eval,

    /// Interactive question loop in the terminal.
    Ask,

    /// Start the HTTP answer server on `server.bind`.
    Serve,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("PRAG_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn progress_mode(flag: Option<&str>) -> anyhow::Result<ProgressMode> {
    match flag {
        None => Ok(ProgressMode::default_for_tty()),
        Some(s) => ProgressMode::parse(s).ok_or_else(|| {
            anyhow::anyhow!("Invalid --progress value '{}'. Use off, human, or json.", s)
        }),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest { progress } => {
            let reporter = progress_mode(progress.as_deref())?.reporter();
            ingest::run_ingest(&cfg, reporter.as_ref())?;
        }
        Commands::Chunk => {
            chunk::run_chunk(&cfg)?;
        }
        Commands::Index { progress } => {
            let reporter = progress_mode(progress.as_deref())?.reporter();
            index::run_index(&cfg, reporter.as_ref()).await?;
        }
        Commands::Retrieve { query, top_k } => {
            retrieve::run_retrieve(&cfg, &query, top_k).await?;
        }
        Commands::Answer {
            question,
            static_mode,
        } => {
            let mode = AnswerMode::from_use_rag(!static_mode);
            answer::run_answer(&cfg, &question, mode).await?;
        }
        Commands::Batch { input, output } => {
            batch::run_batch(&cfg, &input, output, cli.quiet).await?;
        }
        Commands::Eval => {
            eval::run_eval(&cfg).await?;
        }
        Commands::Ask => {
            interactive::run_interactive(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
