//! Builds the run context: merged options, site configuration, adapter and URL.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use comic_dl_core::download::{ComicDownloader, DownloadConfig};
use comic_dl_core::site::{
    DEFAULT_TIMEOUT_MS, SiteAdapter, SiteConfig, SiteRegistry, build_default_site_registry,
};
use tracing::{debug, info};

use crate::app::presets::{load_presets, merge_presets};
use crate::app::terminal::{self, SpinnerObserver, StdinConfirm};
use crate::cli::Options;

/// Folder under the home directory holding per-site cookie files.
const COOKIE_DIR: &str = "~/.comic-dl/cookies";
const HISTORY_FILENAME: &str = "history.txt";
const DEFAULT_CHAPTER_NAME: &str = "Untitled";

/// State shared by the command handlers of one URL.
pub(crate) struct RunContext {
    pub(crate) options: Options,
    pub(crate) output: PathBuf,
    pub(crate) adapter: Arc<dyn SiteAdapter>,
    pub(crate) url: String,
}

impl RunContext {
    /// Merges presets, builds the site registry and picks the adapter.
    pub(crate) fn build(options: Options) -> Result<Self> {
        let options = merge_options(options)?;
        let registry = build_default_site_registry(&site_config(&options)?)
            .context("failed to initialize site adapters")?;
        let adapter = resolve_adapter(&registry, &options)?;
        if !options.silence || options.verbose > 0 {
            info!(site = adapter.site_name(), "Using {}.", adapter.site_name());
        }
        let url = complete_url(adapter.as_ref(), &options)?;
        let output = expand_tilde(options.output.as_deref().unwrap_or(Path::new(".")));
        Ok(Self {
            options,
            output,
            adapter,
            url,
        })
    }

    pub(crate) fn downloader(&self) -> ComicDownloader {
        let mut downloader = ComicDownloader::new(
            Arc::clone(&self.adapter),
            self.output.clone(),
            download_config(&self.options),
        )
        .with_confirm(Arc::new(StdinConfirm));
        let use_spinner = terminal::should_use_spinner(
            std::io::IsTerminal::is_terminal(&std::io::stderr()),
            self.options.silence,
            terminal::is_dumb_terminal(),
        );
        if use_spinner {
            downloader = downloader.with_observer(Arc::new(SpinnerObserver::new()));
        }
        downloader
    }

    pub(crate) fn chapter_name(&self) -> String {
        self.options
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_CHAPTER_NAME.to_string())
    }

    /// History file path: explicit `--history PATH`, else `<output>/history.txt`.
    pub(crate) fn history_path(&self) -> Option<PathBuf> {
        let history = self.options.history.as_ref()?;
        if history.as_os_str().is_empty() {
            Some(self.output.join(HISTORY_FILENAME))
        } else {
            Some(expand_tilde(history))
        }
    }
}

/// Expands a leading `~` to the home directory.
pub(crate) fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME").filter(|home| !home.is_empty()) {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}

/// Applies the presets file (if any) under the command-line values.
pub(crate) fn merge_options(mut options: Options) -> Result<Options> {
    let Some(presets_path) = options.presets.clone().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(options);
    };
    let presets = load_presets(&expand_tilde(&presets_path))?;
    let module = match &options.module {
        Some(module) => Some(module.clone()),
        None => options.url.as_deref().and_then(|url| {
            build_default_site_registry(&SiteConfig::default())
                .ok()?
                .detect(url)
                .map(|adapter| adapter.site_name().to_string())
        }),
    };
    debug!(presets = presets.len(), module = ?module, "Merging presets");
    merge_presets(&presets, module.as_deref()).apply_to(&mut options);
    Ok(options)
}

/// Connection settings for the adapters.
pub(crate) fn site_config(options: &Options) -> Result<SiteConfig> {
    let cookie = match &options.cookie {
        Some(path) => {
            let path = expand_tilde(path);
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read cookie file {}", path.display()))?;
            Some(contents)
        }
        None => None,
    };
    Ok(SiteConfig {
        timeout: Duration::from_millis(options.timeout.unwrap_or(DEFAULT_TIMEOUT_MS)),
        cookie,
        cookie_dir: Some(expand_tilde(Path::new(COOKIE_DIR))),
        auth: options.auth.clone(),
        format: options.format.clone(),
        group: options.group.clone(),
        ..SiteConfig::default()
    })
}

pub(crate) fn download_config(options: &Options) -> DownloadConfig {
    let defaults = DownloadConfig::default();
    DownloadConfig {
        batch_size: options.batch.map_or(defaults.batch_size, usize::from),
        archive: options.archive.unwrap_or(defaults.archive),
        zip_level: options.zip_level.unwrap_or(defaults.zip_level),
        indexed_chapters: options.indexed_chapters,
        max_title_length: options.max_title_length,
        silence: options.silence && options.verbose == 0,
        verbose: options.verbose > 0,
    }
}

/// Adapter named by `--module`, else the one recognizing the URL.
pub(crate) fn resolve_adapter(
    registry: &SiteRegistry,
    options: &Options,
) -> Result<Arc<dyn SiteAdapter>> {
    let adapter = match options.module.as_deref().filter(|m| !m.is_empty()) {
        Some(module) => registry.find(module),
        None => options.url.as_deref().and_then(|url| registry.detect(url)),
    };
    match adapter {
        Some(adapter) => Ok(adapter),
        None => bail!(
            "Module not found. Available modules: {}",
            registry.names().join(", ")
        ),
    }
}

/// Full URL from `--shorthand-url` or `--url`.
pub(crate) fn complete_url(adapter: &dyn SiteAdapter, options: &Options) -> Result<String> {
    if let Some(shorthand) = options.shorthand_url.as_deref().filter(|s| !s.is_empty()) {
        return Ok(adapter.url_completion(shorthand.trim()));
    }
    match options.url.as_deref().map(str::trim).filter(|url| !url.is_empty()) {
        Some(url) => Ok(url.to_string()),
        None => bail!("Please provide a URL (--url or --shorthand-url)."),
    }
}

/// Appends `url` to the history file unless already recorded. Returns true when written.
pub(crate) fn write_history(path: &Path, url: &str) -> Result<bool> {
    let existing = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(error) => {
            return Err(error).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    if existing.lines().any(|line| line.trim() == url) {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut contents = existing;
    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    contents.push_str(url);
    contents.push('\n');
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}

/// Non-empty trimmed lines of a URL list file.
pub(crate) fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read URL list {}", path.display()))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect())
}
