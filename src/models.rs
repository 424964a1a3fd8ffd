//! Core data models used throughout the aggregator.
//!
//! Subject and question records are opaque JSON objects: whatever the source
//! files contain is passed through verbatim, and the aggregator only appends
//! (or overwrites) a handful of reserved keys. The `preserve_order` feature of
//! `serde_json` keeps source key order stable in the output.

use serde::Serialize;
use serde_json::{Map, Value};

/// Version string stamped on every generated document.
pub const DOCUMENT_VERSION: &str = "1.0.0";

/// An ordered JSON object read from a `subject.json` or `question.json`.
pub type Record = Map<String, Value>;

/// Key holding the subject's unique code.
pub const SUBJECT_CODE_KEY: &str = "code";
/// Key under which a subject's questions are attached.
pub const QUESTIONS_KEY: &str = "questions";
/// Question id, taken from the question directory name.
pub const QUESTION_ID_KEY: &str = "id";
/// Back-reference from a question to its subject's code.
pub const SUBJECT_CODE_REF_KEY: &str = "subjectCode";

/// Which field a question's main image is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
    /// A regular illustration, stored as `photo`.
    Photo,
    /// A quiz-specific image (file name starts with `quiz`), stored as `quizPhoto`.
    QuizPhoto,
}

impl ImageRole {
    pub const ALL: [ImageRole; 2] = [ImageRole::Photo, ImageRole::QuizPhoto];

    /// JSON key this role is written under.
    pub fn field_name(self) -> &'static str {
        match self {
            ImageRole::Photo => "photo",
            ImageRole::QuizPhoto => "quizPhoto",
        }
    }
}

/// Root of the generated `questions.json`.
///
/// Field order here is the serialized key order.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateDocument {
    pub subjects: Vec<Record>,
    /// Holds the output file name rather than a timestamp, so repeated runs
    /// over the same tree produce identical bytes.
    #[serde(rename = "generatedAt")]
    pub generated_at: String,
    pub version: String,
}

impl AggregateDocument {
    pub fn new(subjects: Vec<Record>, generated_at: impl Into<String>) -> Self {
        Self {
            subjects,
            generated_at: generated_at.into(),
            version: DOCUMENT_VERSION.to_string(),
        }
    }
}

/// Counters reported at the end of an aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateSummary {
    /// Subjects written to the document.
    pub subjects: usize,
    /// Questions written across all subjects.
    pub questions: usize,
    /// Questions that received a `photo` or `quizPhoto` field.
    pub images: usize,
    /// Embedded images that fell back to their raw bytes.
    pub degraded_images: usize,
    /// `question.json` files skipped because they did not parse.
    pub skipped_questions: Vec<std::path::PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_field_names() {
        assert_eq!(ImageRole::Photo.field_name(), "photo");
        assert_eq!(ImageRole::QuizPhoto.field_name(), "quizPhoto");
    }

    #[test]
    fn test_document_key_order() {
        let doc = AggregateDocument::new(Vec::new(), "questions.json");
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(
            json,
            r#"{"subjects":[],"generatedAt":"questions.json","version":"1.0.0"}"#
        );
    }
}
