//! Core data models used throughout the pipeline.
//!
//! These types represent the documents, chunks, and retrieval hits that flow
//! from ingestion through to answer generation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse document category inferred from the source file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    PersonalStory,
    ScreeningProcess,
    InequalityContext,
    EducationScript,
    CommunicationTraining,
    MeetingNotes,
    RoundtableTranscript,
    Unknown,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::PersonalStory => "personal_story",
            DocType::ScreeningProcess => "screening_process",
            DocType::InequalityContext => "inequality_context",
            DocType::EducationScript => "education_script",
            DocType::CommunicationTraining => "communication_training",
            DocType::MeetingNotes => "meeting_notes",
            DocType::RoundtableTranscript => "roundtable_transcript",
            DocType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "personal_story" => Ok(DocType::PersonalStory),
            "screening_process" => Ok(DocType::ScreeningProcess),
            "inequality_context" => Ok(DocType::InequalityContext),
            "education_script" => Ok(DocType::EducationScript),
            "communication_training" => Ok(DocType::CommunicationTraining),
            "meeting_notes" => Ok(DocType::MeetingNotes),
            "roundtable_transcript" => Ok(DocType::RoundtableTranscript),
            "unknown" => Ok(DocType::Unknown),
            other => anyhow::bail!("unknown doc type: '{}'", other),
        }
    }
}

/// Normalized document written to the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: String,
    pub source_path: String,
    pub source_name: String,
    pub doc_type: DocType,
    pub module: String,
    pub text: String,
}

/// A token-bounded slice of a document, written to the chunk store and
/// mirrored row-for-row in the metadata table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub doc_id: String,
    pub source_path: String,
    pub source_name: String,
    pub module: String,
    pub doc_type: DocType,
    pub text: String,
    pub n_tokens: usize,
}

/// A chunk returned by the retriever with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    #[serde(flatten)]
    pub chunk: ChunkRecord,
    pub score: f32,
}

/// Compact hit description used in API responses and evaluation output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitSummary {
    pub chunk_id: String,
    pub source_name: String,
    pub score: f32,
}

impl From<&RetrievalHit> for HitSummary {
    fn from(hit: &RetrievalHit) -> Self {
        Self {
            chunk_id: hit.chunk.chunk_id.clone(),
            source_name: hit.chunk.source_name.clone(),
            score: hit.score,
        }
    }
}

/// Generated answer text plus the hits it was grounded on.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub hits: Vec<RetrievalHit>,
}

impl Answer {
    pub fn hit_summaries(&self) -> Vec<HitSummary> {
        self.hits.iter().map(HitSummary::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_type_serde_is_snake_case() {
        let json = serde_json::to_string(&DocType::InequalityContext).unwrap();
        assert_eq!(json, "\"inequality_context\"");
        let back: DocType = serde_json::from_str("\"roundtable_transcript\"").unwrap();
        assert_eq!(back, DocType::RoundtableTranscript);
    }

    #[test]
    fn test_doc_type_from_str_matches_display() {
        for t in [
            DocType::PersonalStory,
            DocType::ScreeningProcess,
            DocType::InequalityContext,
            DocType::EducationScript,
            DocType::CommunicationTraining,
            DocType::MeetingNotes,
            DocType::RoundtableTranscript,
            DocType::Unknown,
        ] {
            assert_eq!(t.to_string().parse::<DocType>().unwrap(), t);
        }
        assert!("memoir".parse::<DocType>().is_err());
    }

    #[test]
    fn test_hit_serializes_flat() {
        let hit = RetrievalHit {
            chunk: ChunkRecord {
                chunk_id: "abc_0".into(),
                doc_id: "abc".into(),
                source_path: "data/raw/x.txt".into(),
                source_name: "x".into(),
                module: "Unknown".into(),
                doc_type: DocType::ScreeningProcess,
                text: "body".into(),
                n_tokens: 1,
            },
            score: 0.5,
        };
        let v = serde_json::to_value(&hit).unwrap();
        assert_eq!(v["chunk_id"], "abc_0");
        assert_eq!(v["doc_type"], "screening_process");
        assert_eq!(v["score"], 0.5);
    }
}
