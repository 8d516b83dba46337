//! Page file naming and path segment sanitization.

use std::path::{Component, Path};

use url::Url;

/// Extension used when neither the content type nor the URI names one.
pub const DEFAULT_IMAGE_EXTENSION: &str = "jpg";

/// Formats a 1-based page number as a file stem, zero-padded to two digits.
///
/// Padding only guarantees a minimum width: page 100 is `"100"`.
#[must_use]
pub fn format_image_name(page_number: usize) -> String {
    format!("{page_number:02}")
}

/// Maps an image Content-Type to a file extension (without the dot).
///
/// Returns `None` for non-image or unknown types so callers can fall back to
/// the URI.
#[must_use]
pub fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    match mime.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/avif" => Some("avif"),
        "image/bmp" => Some("bmp"),
        "image/svg+xml" => Some("svg"),
        "image/tiff" => Some("tiff"),
        "image/heic" => Some("heic"),
        "image/jxl" => Some("jxl"),
        _ => None,
    }
}

/// Returns the decoded `name.ext` trailing segment of a URI, if it has one.
#[must_use]
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    let decoded = urlencoding::decode(last).ok()?.into_owned();
    let (stem, ext) = decoded.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    let name = sanitize_path_segment(&decoded);
    (!name.is_empty()).then_some(name)
}

/// Returns the lowercase extension of the URI's trailing segment.
#[must_use]
pub fn extension_from_url(url: &str) -> Option<String> {
    let name = filename_from_url(url)?;
    let (_, ext) = name.rsplit_once('.')?;
    if ext.len() > 8 || !ext.chars().all(char::is_alphanumeric) {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Sanitizes a title or chapter name for use as one path segment.
///
/// Replaces characters that are invalid on common filesystems
/// (`/ \ : * ? " < > |` and control characters), trims surrounding
/// whitespace and rewrites `.`/`..` so the result never escapes its parent.
#[must_use]
pub fn sanitize_path_segment(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let sanitized = sanitized.trim().trim_end_matches('.').to_string();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_path_segment(&sanitized) {
        sanitized
    } else {
        sanitized.replace('.', "_")
    }
}

/// Truncates a title to at most `max_chars` characters.
#[must_use]
pub fn truncate_title(title: &str, max_chars: Option<usize>) -> String {
    match max_chars {
        Some(max) if max > 0 => title.chars().take(max).collect(),
        _ => title.to_string(),
    }
}

fn is_safe_path_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}
