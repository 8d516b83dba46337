//! Subcommand handlers: list, download, chapter and generate.

use std::path::Path;

use anyhow::{Context, Result, bail};
use comic_dl_core::download::{ChapterDownloadOptions, SerieDownloadOptions, SerieSummary};
use comic_dl_core::metadata::write_comic_info;
use comic_dl_core::site::{AdapterOptions, SerieInfo, SiteConfig, build_default_site_registry};
use tracing::{debug, error, info, warn};

use crate::ProcessExit;
use crate::app::presets::generate_presets;
use crate::app::runtime::{self, RunContext};
use crate::app::templates;
use crate::cli::Options;

/// `list`: prints title, chapters and metadata; writes ComicInfo.xml with `--output`.
pub(crate) async fn run_list(options: Options) -> Result<ProcessExit> {
    let ctx = RunContext::build(options)?;
    let downloader = ctx.downloader();
    let serie = match downloader.serie_info(&ctx.url).await {
        Ok(serie) => serie,
        Err(error) => {
            report_failure(&ctx.options, "Failed to get serie info.", &error);
            return Ok(ProcessExit::Failure);
        }
    };

    if !ctx.options.silence {
        print!("{}", format_serie_listing(&serie));
    }

    if ctx.options.output.is_some() {
        let written = write_comic_info(&serie, &ctx.output, ctx.options.name.as_deref())
            .await
            .context("failed to write ComicInfo.xml")?;
        if let Some(path) = written {
            info!(path = %path.display(), "Saved ComicInfo.xml");
        }
    }
    Ok(ProcessExit::Success)
}

/// Text printed by `list`.
pub(crate) fn format_serie_listing(serie: &SerieInfo) -> String {
    let mut out = format!("Title: {}\n----\n", serie.title);
    for chapter in &serie.chapters {
        out.push_str(&format!(
            "{}  {}\n{}\n----\n",
            chapter.index,
            chapter.name,
            chapter.uri.as_deref().unwrap_or("-")
        ));
    }
    if let Some(info) = &serie.info {
        for (key, value) in info.entries() {
            out.push_str(&format!("{key}: {value}\n"));
        }
    }
    out
}

/// `download`: one serie, or every entry of `--list`.
pub(crate) async fn run_download(options: Options) -> Result<ProcessExit> {
    let Some(list_path) = options.list.clone() else {
        return download_one(options).await;
    };

    let entries = runtime::read_url_list(&runtime::expand_tilde(&list_path))?;
    info!(entries = entries.len(), "Downloading from URL list");
    let mut outcome = ProcessExit::Success;
    for entry in entries {
        let mut options = options.clone();
        options.list = None;
        if options.shorthand_url.is_some() {
            options.shorthand_url = Some(entry);
        } else {
            options.url = Some(entry);
        }
        let exit = match download_one(options).await {
            Ok(exit) => exit,
            Err(error) => {
                error!(error = %format!("{error:#}"), "Download Failed.");
                ProcessExit::Failure
            }
        };
        outcome = outcome.combine(exit);
    }
    Ok(outcome)
}

async fn download_one(options: Options) -> Result<ProcessExit> {
    let ctx = RunContext::build(options)?;
    if let Some(history) = ctx.history_path()
        && runtime::write_history(&history, &ctx.url)?
    {
        debug!(path = %history.display(), "Recorded serie in history");
    }

    let serie_options = serie_options(&ctx.options);
    let summary = match ctx.downloader().download_serie(&ctx.url, &serie_options).await {
        Ok(summary) => summary,
        Err(error) => {
            report_failure(&ctx.options, "Download Failed.", &error);
            if !ctx.options.silence {
                eprintln!(
                    "No chapter is downloaded, please check the availability of the module (site) or your Internet connection."
                );
            }
            return Ok(ProcessExit::Failure);
        }
    };

    if !summary.aborted
        && !ctx.options.silence
        && let Some(hint) = resume_hint(&summary, ctx.options.to)
    {
        eprintln!("{hint}");
    }
    Ok(ProcessExit::from_summary(&summary))
}

pub(crate) fn serie_options(options: &Options) -> SerieDownloadOptions {
    SerieDownloadOptions {
        start: options.from,
        end: options.to,
        chapters: options.chapters.clone(),
        confirm: !options.yes,
        rename: options.name.clone(),
        retry: options.retry.unwrap_or(0),
        info: options.info,
        override_existing: options.override_existing,
    }
}

/// Remediation line for a run that left chapters incomplete.
pub(crate) fn resume_hint(summary: &SerieSummary, to: Option<u32>) -> Option<String> {
    let first = summary.first_incomplete()?;
    let index = first.index?;
    let to = to.map(|to| format!(" -t {to}")).unwrap_or_default();
    Some(format!(
        "Latest incomplete chapter: [{index}] {} ({}, {} pages not downloaded). Resume with: -f {index}{to}",
        first.name, first.status, first.failed_count
    ))
}

/// `chapter`: one chapter into the output folder.
pub(crate) async fn run_chapter(options: Options) -> Result<ProcessExit> {
    let ctx = RunContext::build(options)?;
    let downloader = ctx.downloader();

    let info = if ctx.options.output.is_some() {
        match downloader.serie_info(&ctx.url).await {
            Ok(serie) => serie.info,
            Err(error) => {
                debug!(error = %error, "No serie metadata for this chapter");
                None
            }
        }
    } else {
        None
    };

    let name = ctx.chapter_name();
    let chapter_options = ChapterDownloadOptions {
        override_existing: ctx.options.override_existing,
        info,
        ..ChapterDownloadOptions::default()
    };
    match downloader
        .download_chapter(&name, Some(&ctx.url), &chapter_options, &AdapterOptions::new())
        .await
    {
        Ok(progress) if progress.failed_count > 0 => {
            warn!(failed = progress.failed_count, "Chapter downloaded with missing pages");
            Ok(ProcessExit::Partial)
        }
        Ok(_) => Ok(ProcessExit::Success),
        Err(error) => {
            report_failure(&ctx.options, &format!("Failed to download {name}."), &error);
            Ok(ProcessExit::Failure)
        }
    }
}

/// `generate`: adapter skeleton with `--module`, presets JSON with `--presets`.
pub(crate) async fn run_generate(options: &Options) -> Result<ProcessExit> {
    if let Some(module) = options.module.as_deref().filter(|m| !m.is_empty()) {
        let output = runtime::expand_tilde(options.output.as_deref().unwrap_or(Path::new(".")));
        let path = generate_module(module, &output).await?;
        println!("Module {module} is created at {}", path.display());
        return Ok(ProcessExit::Success);
    }
    if options.presets.is_some() {
        let registry = build_default_site_registry(&SiteConfig::default())
            .context("failed to initialize site adapters")?;
        println!("{}", serde_json::to_string_pretty(&generate_presets(&registry))?);
        return Ok(ProcessExit::Success);
    }
    bail!(
        "The generate command creates a module or a presets file, please use the --module or --presets flag."
    )
}

pub(crate) async fn generate_module(module: &str, output: &Path) -> Result<std::path::PathBuf> {
    tokio::fs::create_dir_all(output)
        .await
        .with_context(|| format!("failed to create {}", output.display()))?;
    let path = output.join(templates::adapter_file_name(module));
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        bail!("{} already exists", path.display());
    }
    tokio::fs::write(&path, templates::adapter_source(module))
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// One-line failure, or the full error chain with `--verbose`.
fn report_failure(options: &Options, message: &str, error: &(dyn std::error::Error + 'static)) {
    if options.verbose > 0 {
        let mut chain = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push_str(&format!("\n  caused by: {cause}"));
            source = cause.source();
        }
        error!("{message}\n{chain}");
    } else {
        error!("{message} (Use -v or --verbose flag for detailed error messages.)");
    }
}
