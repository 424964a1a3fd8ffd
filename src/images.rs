//! Image discovery for a single question directory.
//!
//! A question may ship any number of image files next to its
//! `question.json`, but only one of them ends up in the document. This module
//! picks that image and decides which field it belongs under.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::models::ImageRole;

/// Lower-case file extensions treated as images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "svg", "webp"];

/// File name that always wins when present (compared case-insensitively).
const PREFERRED_IMAGE: &str = "quiz.png";

/// The image chosen to represent a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImage {
    pub path: PathBuf,
    pub file_name: String,
    pub role: ImageRole,
}

/// Returns `true` if the path carries one of the [`IMAGE_EXTENSIONS`].
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Lists image files directly inside `dir`, sorted by file name.
pub fn image_candidates(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut candidates = Vec::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();
    for entry in walker {
        let entry =
            entry.with_context(|| format!("Failed to list question directory: {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() && is_image_file(path) {
            candidates.push(path.to_path_buf());
        }
    }

    Ok(candidates)
}

/// Picks the main image of a question directory, if it has any.
///
/// `quiz.png` (any case) is preferred; otherwise the first candidate in file
/// name order is used. Having no images is not an error.
pub fn resolve_main_image(dir: &Path) -> Result<Option<SelectedImage>> {
    let candidates = image_candidates(dir)?;

    let main = candidates
        .iter()
        .find(|p| file_name_lower(p) == PREFERRED_IMAGE)
        .or_else(|| candidates.first());

    Ok(main.map(|path| {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        SelectedImage {
            path: path.clone(),
            role: role_for(&file_name),
            file_name,
        }
    }))
}

/// `quizPhoto` for names starting with `quiz` (any case), `photo` otherwise.
pub fn role_for(file_name: &str) -> ImageRole {
    if file_name.to_lowercase().starts_with("quiz") {
        ImageRole::QuizPhoto
    } else {
        ImageRole::Photo
    }
}

fn file_name_lower(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
