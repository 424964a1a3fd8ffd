//! Aggregation pipeline orchestration.
//!
//! Walks the questions root, loads every subject and its questions, attaches
//! the materialized image field and writes one pretty-printed JSON document.
//!
//! ```text
//! <root>/<subject>/subject.json
//! <root>/<subject>/questions/<question>/question.json
//! <root>/<subject>/questions/<question>/<image>
//! ```
//!
//! Error handling is asymmetric: a malformed `subject.json` aborts the run
//! before anything is written, while a malformed `question.json` only drops
//! that question.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Serializer, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::images::resolve_main_image;
use crate::materialize::{materialize, relative_image_path, ImageMode};
use crate::models::{
    AggregateDocument, AggregateSummary, ImageRole, Record, QUESTIONS_KEY, QUESTION_ID_KEY,
    SUBJECT_CODE_KEY, SUBJECT_CODE_REF_KEY,
};

/// Subject metadata file name.
pub const SUBJECT_FILE: &str = "subject.json";
/// Question metadata file name.
pub const QUESTION_FILE: &str = "question.json";
/// Folder inside a subject that holds one directory per question.
pub const QUESTIONS_DIR: &str = "questions";

/// Folders next to the subjects that never hold subject data.
pub fn default_excluded_dirs() -> Vec<String> {
    vec!["web".to_string(), "scripts".to_string(), "misc".to_string()]
}

/// Everything one aggregation run needs.
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Directory containing one folder per subject.
    pub root: PathBuf,
    /// Where the document is written.
    pub output: PathBuf,
    pub mode: ImageMode,
    /// Subject-level folder names to skip.
    pub exclude: Vec<String>,
}

impl AggregateOptions {
    pub fn new(root: impl Into<PathBuf>, output: impl Into<PathBuf>, mode: ImageMode) -> Self {
        Self {
            root: root.into(),
            output: output.into(),
            mode,
            exclude: default_excluded_dirs(),
        }
    }
}

/// Runs the full pipeline and writes the output file.
///
/// Nothing is written if any fatal error occurs while building the document.
pub fn run_aggregate(options: &AggregateOptions) -> Result<AggregateSummary> {
    let (document, summary) = build_document(options)?;
    write_document(&document, &options.output)?;

    println!(
        "Successfully generated {} with {} subjects.",
        options.output.display(),
        summary.subjects
    );
    info!(
        subjects = summary.subjects,
        questions = summary.questions,
        images = summary.images,
        degraded_images = summary.degraded_images,
        skipped_questions = summary.skipped_questions.len(),
        "aggregation finished"
    );

    Ok(summary)
}

/// Builds the document in memory without writing it.
pub fn build_document(options: &AggregateOptions) -> Result<(AggregateDocument, AggregateSummary)> {
    let root = &options.root;
    if !root.is_dir() {
        bail!("Questions root does not exist: {}", root.display());
    }

    let mut summary = AggregateSummary::default();
    let mut subjects = Vec::new();

    for subject_dir in sorted_subdirs(root)? {
        let name = dir_name(&subject_dir);
        if name.starts_with('.') || options.exclude.iter().any(|e| *e == name) {
            debug!(dir = %subject_dir.display(), "skipping non-subject folder");
            continue;
        }

        let subject_file = subject_dir.join(SUBJECT_FILE);
        if !subject_file.is_file() {
            if subject_dir.join(QUESTIONS_DIR).exists() {
                warn!(dir = %subject_dir.display(), "no {} found", SUBJECT_FILE);
            }
            continue;
        }

        let subject = load_subject(&subject_dir, &subject_file, &options.mode, &mut summary)?;
        subjects.push(subject);
    }

    summary.subjects = subjects.len();
    let generated_at = options
        .output
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok((AggregateDocument::new(subjects, generated_at), summary))
}

fn load_subject(
    subject_dir: &Path,
    subject_file: &Path,
    mode: &ImageMode,
    summary: &mut AggregateSummary,
) -> Result<Record> {
    let mut subject = read_record(subject_file)
        .with_context(|| format!("Invalid subject metadata: {}", subject_file.display()))?;
    let subject_code = subject
        .get(SUBJECT_CODE_KEY)
        .cloned()
        .unwrap_or(Value::Null);
    let subject_name = dir_name(subject_dir);

    let mut questions = Vec::new();
    let questions_dir = subject_dir.join(QUESTIONS_DIR);
    if questions_dir.is_dir() {
        for question_dir in sorted_subdirs(&questions_dir)? {
            let question_file = question_dir.join(QUESTION_FILE);
            if !question_file.is_file() {
                continue;
            }

            let mut question = match read_record(&question_file) {
                Ok(q) => q,
                Err(e) => {
                    error!(path = %question_file.display(), error = %e, "error decoding question");
                    summary.skipped_questions.push(question_file);
                    continue;
                }
            };

            let question_id = dir_name(&question_dir);
            question.insert(QUESTION_ID_KEY.to_string(), Value::String(question_id.clone()));
            question.insert(SUBJECT_CODE_REF_KEY.to_string(), subject_code.clone());

            // Image fields are reserved: source values never survive next to ours.
            question.retain(|key, _| {
                !ImageRole::ALL.iter().any(|role| role.field_name() == key.as_str())
            });

            if let Some(image) = resolve_main_image(&question_dir)? {
                let rel = relative_image_path(&subject_name, &question_id, &image.file_name);
                let materialized = materialize(&image, &rel, mode)?;
                question.insert(
                    image.role.field_name().to_string(),
                    Value::String(materialized.value),
                );
                summary.images += 1;
                if materialized.degraded {
                    summary.degraded_images += 1;
                }
            }

            questions.push(Value::Object(question));
        }
    }

    debug!(subject = %subject_name, questions = questions.len(), "loaded subject");
    summary.questions += questions.len();
    subject.insert(QUESTIONS_KEY.to_string(), Value::Array(questions));
    Ok(subject)
}

/// Parses a JSON file that must contain an object.
fn read_record(path: &Path) -> Result<Record> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    match serde_json::from_str::<Value>(&content)? {
        Value::Object(map) => Ok(map),
        other => bail!("expected a JSON object, found {}", json_kind(&other)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Immediate subdirectories of `dir`, sorted by name.
fn sorted_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        if entry.path().is_dir() {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Serializes with 4-space indentation, leaving non-ASCII text unescaped.
pub fn to_pretty_json(document: &AggregateDocument) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = Serializer::with_formatter(&mut out, formatter);
    document.serialize(&mut ser)?;
    Ok(out)
}

/// Writes the document next to `path` and renames it into place.
pub fn write_document(document: &AggregateDocument, path: &Path) -> Result<()> {
    let json = to_pretty_json(document)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    std::fs::write(&tmp_path, &json)
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to move output into place: {}", path.display()))?;

    Ok(())
}
