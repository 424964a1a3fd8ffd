//! Turning a selected image into the string stored on a question.
//!
//! Two modes are supported:
//!
//! | Mode | Output | Reads the file? |
//! |------|--------|-----------------|
//! | [`ImageMode::Reference`] | `<base_url>/<subject>/questions/<question>/<file>` or the bare relative path | no |
//! | [`ImageMode::Embed`] | `data:<mime>;base64,<payload>` | yes |
//!
//! In embed mode, SVG files are inlined verbatim. Raster images are decoded
//! and re-encoded: at quality 100 in their own format with the strongest
//! lossless settings, below 100 as lossy WebP. When decoding or re-encoding
//! fails the original bytes are embedded instead, so a question never loses
//! its image field because of a bad file.

use anyhow::{Context, Result};
use base64::Engine;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};

use crate::images::SelectedImage;

/// Quality at (and above) which raster images are re-saved losslessly.
pub const LOSSLESS_QUALITY: u8 = 100;

const MIME_SVG: &str = "image/svg+xml";
const MIME_WEBP: &str = "image/webp";

/// How image fields are produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageMode {
    /// Store a path or URL pointing at the image.
    Reference { base_url: Option<String> },
    /// Store the image itself as a data URI.
    Embed { quality: u8 },
}

impl Default for ImageMode {
    fn default() -> Self {
        ImageMode::Reference { base_url: None }
    }
}

/// Bytes ready to be base64-encoded, tagged by how they were produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddedImage {
    /// Successfully decoded and re-encoded.
    Encoded { bytes: Vec<u8>, mime: String },
    /// The file's original bytes, with a best-effort mime type.
    Raw { bytes: Vec<u8>, mime: String },
}

impl EmbeddedImage {
    pub fn bytes(&self) -> &[u8] {
        match self {
            EmbeddedImage::Encoded { bytes, .. } | EmbeddedImage::Raw { bytes, .. } => bytes,
        }
    }

    pub fn mime(&self) -> &str {
        match self {
            EmbeddedImage::Encoded { mime, .. } | EmbeddedImage::Raw { mime, .. } => mime,
        }
    }

    /// Renders `data:<mime>;base64,<payload>`.
    pub fn to_data_uri(&self) -> String {
        let payload = base64::engine::general_purpose::STANDARD.encode(self.bytes());
        format!("data:{};base64,{}", self.mime(), payload)
    }
}

/// Why a raster image could not be re-encoded.
#[derive(Debug)]
pub enum EncodeError {
    Decode(String),
    Encode(String),
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodeError::Decode(e) => write!(f, "decode failed: {}", e),
            EncodeError::Encode(e) => write!(f, "encode failed: {}", e),
        }
    }
}

impl std::error::Error for EncodeError {}

/// Value stored on a question, plus whether it had to fall back to raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedImage {
    pub value: String,
    pub degraded: bool,
}

/// Path of an image relative to the questions root, always `/`-separated.
pub fn relative_image_path(subject_dir: &str, question_dir: &str, file_name: &str) -> String {
    format!("{}/questions/{}/{}", subject_dir, question_dir, file_name)
}

/// Joins a base URL and a relative path, ignoring trailing slashes on the base.
pub fn reference_url(base_url: Option<&str>, relative_path: &str) -> String {
    match base_url {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), relative_path),
        None => relative_path.to_string(),
    }
}

/// Produces the image field value for `image` according to `mode`.
///
/// Only I/O errors reading the file in embed mode are returned; codec
/// failures degrade to the raw bytes.
pub fn materialize(
    image: &SelectedImage,
    relative_path: &str,
    mode: &ImageMode,
) -> Result<MaterializedImage> {
    match mode {
        ImageMode::Reference { base_url } => Ok(MaterializedImage {
            value: reference_url(base_url.as_deref(), relative_path),
            degraded: false,
        }),
        ImageMode::Embed { quality } => {
            let embedded = embed_image(&image.path, *quality)?;
            let degraded = is_degraded(&image.path, &embedded);
            Ok(MaterializedImage {
                value: embedded.to_data_uri(),
                degraded,
            })
        }
    }
}

/// Reads and (for raster images) re-encodes the file at `path`.
pub fn embed_image(path: &Path, quality: u8) -> Result<EmbeddedImage> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read image: {}", path.display()))?;

    if is_svg(path) {
        return Ok(EmbeddedImage::Raw {
            bytes,
            mime: MIME_SVG.to_string(),
        });
    }

    match reencode(&bytes, quality) {
        Ok((encoded, mime)) => {
            debug!(
                path = %path.display(),
                original = bytes.len(),
                encoded = encoded.len(),
                "re-encoded image"
            );
            Ok(EmbeddedImage::Encoded {
                bytes: encoded,
                mime: mime.to_string(),
            })
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "could not process image, embedding original bytes"
            );
            Ok(EmbeddedImage::Raw {
                bytes,
                mime: guess_mime(path),
            })
        }
    }
}

/// Decodes a raster image and encodes it again.
///
/// `quality >= 100` keeps the detected format (PNG when undetectable);
/// anything lower produces lossy WebP at that quality.
pub fn reencode(bytes: &[u8], quality: u8) -> Result<(Vec<u8>, &'static str), EncodeError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| EncodeError::Decode(e.to_string()))?;
    let format = reader.format().unwrap_or(ImageFormat::Png);
    let img = reader
        .decode()
        .map_err(|e| EncodeError::Decode(e.to_string()))?;

    if quality >= LOSSLESS_QUALITY {
        let out = encode_lossless(&img, format)?;
        Ok((out, format.to_mime_type()))
    } else {
        let out = encode_webp(&img, quality)?;
        Ok((out, MIME_WEBP))
    }
}

fn encode_lossless(img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    if format == ImageFormat::Png {
        let encoder =
            PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
        img.write_with_encoder(encoder)
            .map_err(|e| EncodeError::Encode(e.to_string()))?;
    } else {
        img.write_to(&mut Cursor::new(&mut out), format)
            .map_err(|e| EncodeError::Encode(e.to_string()))?;
    }
    Ok(out)
}

fn encode_webp(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, EncodeError> {
    // libwebp only accepts 8-bit RGB or RGBA buffers.
    let img = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };
    let encoder = webp::Encoder::from_image(&img).map_err(|e| EncodeError::Encode(e.to_string()))?;
    let memory = encoder
        .encode_simple(false, f32::from(quality))
        .map_err(|e| EncodeError::Encode(format!("{:?}", e)))?;
    Ok(memory.to_vec())
}

fn is_svg(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("svg"))
}

/// Mime type from the file extension; empty when unknown.
fn guess_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or_default()
        .to_string()
}

fn is_degraded(path: &Path, embedded: &EmbeddedImage) -> bool {
    matches!(embedded, EmbeddedImage::Raw { .. }) && !is_svg(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageRole;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn textured_png(dir: &Path, name: &str) -> std::path::PathBuf {
        let img = RgbImage::from_fn(96, 96, |x, y| {
            let h = x.wrapping_mul(2654435761) ^ y.wrapping_mul(40503).rotate_left(13);
            let h = h ^ (h >> 15);
            Rgb([h as u8, (h >> 8) as u8, (h >> 16) as u8])
        });
        let path = dir.join(name);
        img.save_with_format(&path, ImageFormat::Png).unwrap();
        path
    }

    fn selected(path: &Path) -> SelectedImage {
        SelectedImage {
            path: path.to_path_buf(),
            file_name: path.file_name().unwrap().to_string_lossy().to_string(),
            role: ImageRole::Photo,
        }
    }

    fn decode_data_uri(uri: &str) -> (String, Vec<u8>) {
        let rest = uri.strip_prefix("data:").unwrap();
        let (mime, payload) = rest.split_once(";base64,").unwrap();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .unwrap();
        (mime.to_string(), bytes)
    }

    #[test]
    fn test_reference_url_with_base() {
        let rel = relative_image_path("math", "q1", "quiz.png");
        assert_eq!(
            reference_url(Some("https://x/y"), &rel),
            "https://x/y/math/questions/q1/quiz.png"
        );
        assert_eq!(
            reference_url(Some("https://x/y/"), &rel),
            "https://x/y/math/questions/q1/quiz.png"
        );
    }

    #[test]
    fn test_reference_url_without_base() {
        let rel = relative_image_path("math", "q1", "a.jpg");
        assert_eq!(reference_url(None, &rel), "math/questions/q1/a.jpg");
    }

    #[test]
    fn test_reference_mode_does_not_touch_file() {
        let image = selected(Path::new("/does/not/exist/quiz.png"));
        let mode = ImageMode::Reference {
            base_url: Some("https://cdn.example".into()),
        };
        let out = materialize(&image, "s/questions/q/quiz.png", &mode).unwrap();
        assert_eq!(out.value, "https://cdn.example/s/questions/q/quiz.png");
        assert!(!out.degraded);
    }

    #[test]
    fn test_embed_lossless_png_roundtrips_pixels() {
        let tmp = TempDir::new().unwrap();
        let path = textured_png(tmp.path(), "quiz.png");

        let out = materialize(&selected(&path), "", &ImageMode::Embed { quality: 100 }).unwrap();
        assert!(!out.degraded);
        let (mime, bytes) = decode_data_uri(&out.value);
        assert_eq!(mime, "image/png");

        let original = image::open(&path).unwrap().to_rgb8();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_embed_lossy_is_smaller_webp() {
        let tmp = TempDir::new().unwrap();
        let path = textured_png(tmp.path(), "photo.png");

        let lossless = embed_image(&path, 100).unwrap();
        let lossy = embed_image(&path, 50).unwrap();

        assert_eq!(lossy.mime(), "image/webp");
        assert!(matches!(lossy, EmbeddedImage::Encoded { .. }));
        assert!(lossy.bytes().len() < lossless.bytes().len());
    }

    #[test]
    fn test_embed_svg_verbatim() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("diagram.SVG");
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><rect width="1" height="1"/></svg>"#;
        std::fs::write(&path, svg).unwrap();

        let out = materialize(&selected(&path), "", &ImageMode::Embed { quality: 10 }).unwrap();
        assert!(!out.degraded);
        let (mime, bytes) = decode_data_uri(&out.value);
        assert_eq!(mime, "image/svg+xml");
        assert_eq!(bytes, svg.as_bytes());
    }

    #[test]
    fn test_corrupt_image_falls_back_to_raw() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let embedded = embed_image(&path, 80).unwrap();
        assert_eq!(
            embedded,
            EmbeddedImage::Raw {
                bytes: b"definitely not a png".to_vec(),
                mime: "image/png".to_string(),
            }
        );

        let out = materialize(&selected(&path), "", &ImageMode::Embed { quality: 80 }).unwrap();
        assert!(out.degraded);
        assert!(out.value.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_reencode_rejects_garbage() {
        assert!(matches!(
            reencode(b"garbage", 100),
            Err(EncodeError::Decode(_))
        ));
    }

    #[test]
    fn test_embed_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        assert!(embed_image(&tmp.path().join("gone.png"), 100).is_err());
    }
}
