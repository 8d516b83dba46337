//! `ComicInfo.xml` metadata records.
//!
//! A serie's metadata is a flat key/value record rendered into the
//! `ComicInfo.xml` format understood by comic readers (Komga, Kavita, ...).
//! The record is written either as an archive entry or as a sidecar file next
//! to the downloaded pages.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::download::sanitize_path_segment;
use crate::site::SerieInfo;

/// File name of the metadata entry inside archives and chapter folders.
pub const COMIC_INFO_FILENAME: &str = "ComicInfo.xml";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const COMIC_INFO_OPEN: &str = r#"<ComicInfo xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema">"#;
const COMIC_INFO_CLOSE: &str = "</ComicInfo>";

/// Errors produced while writing metadata files.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// I/O error creating the folder or writing the file.
    #[error("IO error writing metadata to {path}: {source}")]
    Io {
        /// Path being written.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Serie metadata in the `ComicInfo` schema.
///
/// The well-known keys are typed fields; anything an adapter wants to add on
/// top lands in [`ComicInfo::extra`]. Absent keys are never rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComicInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serie: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penciller: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// `YesAndRightToLeft` for right-to-left manga.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manga: Option<String>,
    /// Publication status (`Ongoing`, `End`, `Abandoned`, `Hiatus`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Adapter-specific extension keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// Right-to-left reading marker for the `Manga` key.
pub const MANGA_RIGHT_TO_LEFT: &str = "YesAndRightToLeft";

impl ComicInfo {
    /// Returns the present entries, well-known keys first, then extension keys.
    #[must_use]
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let known = [
            ("Serie", &self.serie),
            ("Summary", &self.summary),
            ("Writer", &self.writer),
            ("Penciller", &self.penciller),
            ("Language", &self.language),
            ("Genre", &self.genre),
            ("Year", &self.year),
            ("Month", &self.month),
            ("Day", &self.day),
            ("Location", &self.location),
            ("Count", &self.count),
            ("Tags", &self.tags),
            ("Web", &self.web),
            ("Note", &self.note),
            ("Manga", &self.manga),
            ("Status", &self.status),
        ];
        known
            .into_iter()
            .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
            .chain(
                self.extra
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            )
            .collect()
    }

    /// Returns true when no key is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Renders the record as a `ComicInfo.xml` document.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(XML_DECLARATION);
        xml.push('\n');
        xml.push_str(COMIC_INFO_OPEN);
        xml.push('\n');
        for (key, value) in self.entries() {
            if !is_element_name(key) {
                debug!(key, "Skipping metadata key that is not an XML element name");
                continue;
            }
            let flattened: String = value.chars().filter(|c| !matches!(c, '\n' | '\r')).collect();
            let escaped = quick_xml::escape::escape(flattened.as_str());
            xml.push_str(&format!("\t<{key}>{escaped}</{key}>\n"));
        }
        xml.push_str(COMIC_INFO_CLOSE);
        xml.push('\n');
        xml
    }
}

/// Letter or `_` first, then letters, digits, `-`, `_` or `.`.
fn is_element_name(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Writes `<output>/<rename or serie title>/ComicInfo.xml` for a serie.
///
/// Returns `Ok(None)` when the serie carries no metadata.
///
/// # Errors
///
/// Returns [`MetadataError::Io`] if the folder or the file cannot be written.
#[instrument(skip(serie), fields(title = %serie.title))]
pub async fn write_comic_info(
    serie: &SerieInfo,
    output: &Path,
    rename: Option<&str>,
) -> Result<Option<PathBuf>, MetadataError> {
    let Some(info) = &serie.info else {
        debug!("serie has no metadata, nothing to write");
        return Ok(None);
    };

    let folder = output.join(sanitize_path_segment(rename.unwrap_or(&serie.title)));
    tokio::fs::create_dir_all(&folder)
        .await
        .map_err(|source| MetadataError::Io {
            path: folder.clone(),
            source,
        })?;

    let path = folder.join(COMIC_INFO_FILENAME);
    tokio::fs::write(&path, info.to_xml())
        .await
        .map_err(|source| MetadataError::Io {
            path: path.clone(),
            source,
        })?;

    debug!(path = %path.display(), "ComicInfo written");
    Ok(Some(path))
}
