//! Presets: JSON files of partial option objects.
//!
//! A presets file is an array of camelCase objects. Objects without `module`
//! apply to every site; objects with `module` apply to that site only. Values
//! merge in order general presets, site presets, then command-line values.

use std::path::{Path, PathBuf};

use comic_dl_core::{ArchiveMode, SiteRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::cli::Options;

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("cannot read presets file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid presets file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One preset object. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<ArchiveMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silence: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yes: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_title_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(rename = "override", skip_serializing_if = "Option::is_none")]
    pub override_existing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_chapters: Option<bool>,
}

impl Preset {
    /// Defaults written as the general entry of a generated presets file.
    pub fn general_defaults() -> Self {
        Self {
            output: Some(PathBuf::from(".")),
            batch: Some(10),
            timeout: Some(10_000),
            zip_level: Some(5),
            retry: Some(1),
            ..Self::default()
        }
    }

    /// Overlays `other` onto `self`; fields set in `other` win.
    fn overlay(&mut self, other: &Self) {
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(if other.$field.is_some() {
                    self.$field.clone_from(&other.$field);
                })*
            };
        }
        take!(
            module, output, cookie, from, to, archive, timeout, silence, batch, verbose, yes,
            max_title_length, zip_level, retry, info, format, override_existing, auth, group,
            indexed_chapters,
        );
    }

    /// Fills every option not given on the command line.
    pub fn apply_to(&self, options: &mut Options) {
        fn fill<T: Clone>(slot: &mut Option<T>, preset: Option<&T>) {
            if slot.is_none() {
                *slot = preset.cloned();
            }
        }
        fill(&mut options.module, self.module.as_ref());
        fill(&mut options.output, self.output.as_ref());
        fill(&mut options.cookie, self.cookie.as_ref());
        fill(&mut options.from, self.from.as_ref());
        fill(&mut options.to, self.to.as_ref());
        fill(&mut options.archive, self.archive.as_ref());
        fill(&mut options.timeout, self.timeout.as_ref());
        fill(&mut options.batch, self.batch.as_ref());
        fill(&mut options.max_title_length, self.max_title_length.as_ref());
        fill(&mut options.zip_level, self.zip_level.as_ref());
        fill(&mut options.retry, self.retry.as_ref());
        fill(&mut options.format, self.format.as_ref());
        fill(&mut options.auth, self.auth.as_ref());
        fill(&mut options.group, self.group.as_ref());

        options.silence |= self.silence.unwrap_or(false);
        options.yes |= self.yes.unwrap_or(false);
        options.info |= self.info.unwrap_or(false);
        options.override_existing |= self.override_existing.unwrap_or(false);
        options.indexed_chapters |= self.indexed_chapters.unwrap_or(false);
        if options.verbose == 0 && self.verbose.unwrap_or(false) {
            options.verbose = 1;
        }
    }
}

/// Reads a presets file.
pub fn load_presets(path: &Path) -> Result<Vec<Preset>, PresetError> {
    let contents = std::fs::read_to_string(path).map_err(|source| PresetError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| PresetError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merges the general presets, then the presets of `module`.
pub fn merge_presets(presets: &[Preset], module: Option<&str>) -> Preset {
    let mut merged = Preset::default();
    for preset in presets.iter().filter(|preset| preset.module.is_none()) {
        merged.overlay(preset);
    }
    if let Some(module) = module {
        for preset in presets
            .iter()
            .filter(|preset| preset.module.as_deref() == Some(module))
        {
            merged.overlay(preset);
        }
    }
    // The module a preset was selected by is not an option to carry over.
    merged.module = None;
    merged
}

/// Builds a presets document: general defaults plus each site's preferences.
pub fn generate_presets(registry: &SiteRegistry) -> Value {
    let mut entries = vec![serde_json::to_value(Preset::general_defaults()).unwrap_or(Value::Null)];
    for adapter in registry.iter() {
        let mut entry = serde_json::Map::new();
        entry.insert(
            "module".to_string(),
            Value::String(adapter.site_name().to_string()),
        );
        entry.extend(adapter.preferred_presets());
        entries.push(Value::Object(entry));
    }
    Value::Array(entries)
}
