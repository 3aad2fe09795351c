//! File-name heuristics for document type and module labels.

use std::path::Path;

use crate::config::ClassificationConfig;
use crate::models::DocType;

/// Assigns a [`DocType`] to a source file.
pub trait DocTypeClassifier: Send + Sync {
    fn classify(&self, path: &Path) -> DocType;
}

/// Ordered keyword rules over the lowercased file name. The first rule with
/// a matching keyword wins.
#[derive(Debug, Clone)]
pub struct FilenameClassifier {
    rules: Vec<(DocType, Vec<String>)>,
}

impl FilenameClassifier {
    pub fn new(config: &ClassificationConfig) -> Self {
        let story = config
            .story_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .collect();
        let words = |ws: &[&str]| ws.iter().map(|w| w.to_string()).collect::<Vec<_>>();
        Self {
            rules: vec![
                (DocType::PersonalStory, story),
                (DocType::ScreeningProcess, words(&["screen"])),
                (
                    DocType::InequalityContext,
                    words(&["barrier", "access", "inequal"]),
                ),
                (
                    DocType::EducationScript,
                    words(&["module", "script", "training"]),
                ),
            ],
        }
    }
}

impl Default for FilenameClassifier {
    fn default() -> Self {
        Self::new(&ClassificationConfig::default())
    }
}

impl DocTypeClassifier for FilenameClassifier {
    fn classify(&self, path: &Path) -> DocType {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| name.contains(k.as_str())))
            .map(|(doc_type, _)| *doc_type)
            .unwrap_or(DocType::Unknown)
    }
}

/// Derive a module label such as `"Module 3"` from the file stem.
///
/// The label is the first two space-separated words of the stem when any
/// space- or underscore-separated token starts with `module`; otherwise
/// `"Unknown"`.
pub fn infer_module(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let has_module_token = stem
        .replace('_', " ")
        .split_whitespace()
        .any(|token| token.to_lowercase().starts_with("module"));

    if has_module_token {
        stem.split_whitespace().take(2).collect::<Vec<_>>().join(" ")
    } else {
        "Unknown".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(name: &str) -> DocType {
        FilenameClassifier::default().classify(Path::new(name))
    }

    #[test]
    fn test_rule_order() {
        assert_eq!(classify("Survivor Story.docx"), DocType::PersonalStory);
        // story wins over screen
        assert_eq!(classify("screening_story.txt"), DocType::PersonalStory);
        assert_eq!(classify("Screening Steps.docx"), DocType::ScreeningProcess);
        assert_eq!(classify("access_barriers.txt"), DocType::InequalityContext);
        assert_eq!(classify("Inequality Overview.txt"), DocType::InequalityContext);
        assert_eq!(classify("Module 2 Basics.docx"), DocType::EducationScript);
        assert_eq!(classify("outreach_script.txt"), DocType::EducationScript);
        assert_eq!(classify("faq.txt"), DocType::Unknown);
    }

    #[test]
    fn test_storyteller_names_are_personal_stories() {
        assert_eq!(classify("Pam screening.docx"), DocType::PersonalStory);
        assert_eq!(classify("Luella interview.docx"), DocType::PersonalStory);
        assert_eq!(classify("pam_notes.txt"), DocType::PersonalStory);
        // substring match, so this is blocked too
        assert_eq!(classify("screening pamphlet.txt"), DocType::PersonalStory);
    }

    #[test]
    fn test_extra_story_keywords() {
        let cfg = ClassificationConfig {
            story_keywords: vec!["story".into(), "Interview".into()],
        };
        let c = FilenameClassifier::new(&cfg);
        assert_eq!(
            c.classify(Path::new("interview_notes.txt")),
            DocType::PersonalStory
        );
    }

    #[test]
    fn test_only_file_name_is_classified() {
        assert_eq!(classify("screening/faq.txt"), DocType::Unknown);
    }

    #[test]
    fn test_infer_module_with_spaces() {
        assert_eq!(
            infer_module(Path::new("data/raw/Module 3 Screening Basics.docx")),
            "Module 3"
        );
    }

    #[test]
    fn test_infer_module_underscored_stem_kept_whole() {
        assert_eq!(
            infer_module(Path::new("module_4_access.txt")),
            "module_4_access"
        );
    }

    #[test]
    fn test_infer_module_missing() {
        assert_eq!(infer_module(Path::new("screening_steps.txt")), "Unknown");
    }
}
