//! Locating the questions directory when none is given on the command line.
//!
//! The tool is usually run from the project root, from inside the questions
//! folder itself, or from a `scripts/` folder nested one level below it.

use std::path::{Path, PathBuf};

use crate::aggregate::{QUESTIONS_DIR, SUBJECT_FILE};

/// Default output file name, written inside the questions directory.
pub const DEFAULT_OUTPUT_FILE: &str = "questions.json";

/// `questions.json` inside `questions_dir`.
pub fn default_output(questions_dir: &Path) -> PathBuf {
    questions_dir.join(DEFAULT_OUTPUT_FILE)
}

/// Works out the questions directory relative to `start`.
pub fn locate(start: &Path) -> PathBuf {
    if looks_like_questions_root(start) {
        return start.to_path_buf();
    }

    if start.join(QUESTIONS_DIR).is_dir() {
        return start.join(QUESTIONS_DIR);
    }

    let project_root = match start.file_name().and_then(|n| n.to_str()) {
        Some("scripts") => parent_or_self(&parent_or_self(start)),
        Some(QUESTIONS_DIR) => parent_or_self(start),
        _ => start.to_path_buf(),
    };
    project_root.join(QUESTIONS_DIR)
}

/// A questions root holds subject folders but is not a subject itself.
fn looks_like_questions_root(dir: &Path) -> bool {
    if dir.join(SUBJECT_FILE).exists() {
        return false;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries
        .filter_map(|e| e.ok())
        .any(|e| e.path().join(SUBJECT_FILE).is_file())
}

fn parent_or_self(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(path)
        .to_path_buf()
}
