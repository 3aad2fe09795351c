//! Document ingestion.
//!
//! Walks the intake directory, extracts text, classifies each file, and
//! writes surviving documents to the document store. Documents of a blocked
//! type, or whose full text the privacy filter flags, never reach the store;
//! when they came from the intake directory they are moved aside into the
//! excluded-items directory so they are not picked up again.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::classify::{infer_module, DocTypeClassifier, FilenameClassifier};
use crate::config::Config;
use crate::connector_fs::{self, SourceFile};
use crate::extract;
use crate::models::Document;
use crate::privacy::{HeuristicPrivacyFilter, PrivacyClassifier};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::store::JsonlWriter;

/// Counts produced by one ingestion run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub scanned: u64,
    pub written: u64,
    pub excluded_blocked: u64,
    pub excluded_personal: u64,
    pub relocated: u64,
    pub skipped: u64,
}

/// Content hash used as the document id: the first 16 hex chars of SHA-256.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

/// Why a document was kept out of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exclusion {
    BlockedType,
    Personal,
}

/// Ingest with the default filename classifier and heuristic privacy filter.
pub fn run_ingest(config: &Config, progress: &dyn ProgressReporter) -> Result<IngestReport> {
    let classifier = FilenameClassifier::new(&config.classification);
    let report = ingest(config, &classifier, &HeuristicPrivacyFilter, progress)?;

    println!("ingest");
    println!("  scanned: {} files", report.scanned);
    println!("  documents written: {}", report.written);
    println!("  excluded (blocked type): {}", report.excluded_blocked);
    println!("  excluded (personal): {}", report.excluded_personal);
    println!("  relocated: {}", report.relocated);
    println!("  skipped (empty/unreadable): {}", report.skipped);
    println!("  store: {}", config.paths.docs_jsonl().display());
    println!("ok");

    Ok(report)
}

pub fn ingest(
    config: &Config,
    classifier: &dyn DocTypeClassifier,
    privacy: &dyn PrivacyClassifier,
    progress: &dyn ProgressReporter,
) -> Result<IngestReport> {
    let paths = &config.paths;
    std::fs::create_dir_all(&paths.processed_dir)?;
    std::fs::create_dir_all(&paths.excluded_dir)?;

    progress.report(ProgressEvent::Discovering {
        stage: "ingest".to_string(),
    });

    // (file, came from the intake directory)
    let mut files: Vec<(SourceFile, bool)> = connector_fs::scan_dir(&paths.raw_dir, &config.sources)?
        .into_iter()
        .map(|f| (f, true))
        .collect();

    if let Some(fallback) = &paths.fallback_dir {
        if connector_fs::is_empty_dir(&paths.raw_dir) {
            info!(
                "intake directory {} is empty, scanning {}",
                paths.raw_dir.display(),
                fallback.display()
            );
            files.extend(
                connector_fs::scan_dir(fallback, &config.sources)?
                    .into_iter()
                    .map(|f| (f, false)),
            );
        }
    }

    let total = files.len() as u64;
    let mut report = IngestReport::default();
    let mut out = JsonlWriter::create(&paths.docs_jsonl())?;

    for (file, from_intake) in &files {
        report.scanned += 1;
        progress.report(ProgressEvent::Advancing {
            stage: "ingest".to_string(),
            n: report.scanned,
            total,
        });

        let text = match extract::read_source_text(&file.path) {
            Ok(t) => t.trim().to_string(),
            Err(e) => {
                debug!("skipping {}: {}", file.path.display(), e);
                report.skipped += 1;
                continue;
            }
        };
        if text.is_empty() {
            debug!("skipping empty file {}", file.path.display());
            report.skipped += 1;
            continue;
        }

        let doc_type = classifier.classify(&file.path);

        let exclusion = if config.doc_types.is_blocked(doc_type) {
            Some(Exclusion::BlockedType)
        } else if privacy.is_personal(&text) {
            Some(Exclusion::Personal)
        } else {
            None
        };

        if let Some(reason) = exclusion {
            match reason {
                Exclusion::BlockedType => report.excluded_blocked += 1,
                Exclusion::Personal => report.excluded_personal += 1,
            }
            info!(
                "excluding {} ({:?}, doc_type={})",
                file.relative, reason, doc_type
            );
            if *from_intake {
                relocate(&file.path, &paths.excluded_dir)?;
                report.relocated += 1;
            }
            continue;
        }

        let doc = Document {
            doc_id: content_hash(&text),
            source_path: file.path.display().to_string(),
            source_name: file
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            doc_type,
            module: infer_module(&file.path),
            text,
        };
        out.write(&doc)?;
        report.written += 1;
    }

    out.finish()?;
    Ok(report)
}

/// Move `path` into `excluded_dir`, keeping its file name.
fn relocate(path: &Path, excluded_dir: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("no file name: {}", path.display()))?;
    let target = excluded_dir.join(name);
    if std::fs::rename(path, &target).is_err() {
        // rename fails across filesystems
        warn!("rename failed for {}, copying instead", path.display());
        std::fs::copy(path, &target)
            .with_context(|| format!("Failed to move {} to {}", path.display(), target.display()))?;
        std::fs::remove_file(path)?;
    }
    Ok(target)
}
