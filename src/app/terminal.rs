//! Terminal concerns: tracing setup, chapter spinners and the confirmation prompt.

use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use comic_dl_core::download::{Confirm, DownloadProgress, ProgressObserver, ProgressStatus};
use indicatif::{ProgressBar, ProgressStyle};

/// Default log level from the verbosity flags. `--verbose` overrides `--silence`.
pub(crate) fn default_log_level(verbose: u8, silence: bool) -> &'static str {
    match (verbose, silence) {
        (0, true) => "error",
        (0, false) => "info",
        (1, _) => "debug",
        _ => "trace",
    }
}

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

pub(crate) fn should_use_spinner(stderr_is_terminal: bool, silence: bool, dumb_terminal: bool) -> bool {
    stderr_is_terminal && !silence && !dumb_terminal
}

/// Installs the stderr subscriber. `RUST_LOG` wins over `default_level`.
pub(crate) fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_ansi(!is_dumb_terminal() && io::stderr().is_terminal())
        .with_env_filter(filter)
        .try_init();
}

/// Shows one spinner per chapter while it downloads.
pub(crate) struct SpinnerObserver {
    current: Mutex<Option<ProgressBar>>,
}

impl SpinnerObserver {
    pub(crate) fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    fn take(&self) -> Option<ProgressBar> {
        self.current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
    }
}

impl ProgressObserver for SpinnerObserver {
    fn on_start(&self, index: Option<u32>, name: &str) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message(match index {
            Some(index) => format!("[{index}] Downloading {name}..."),
            None => format!("Downloading {name}..."),
        });
        if let Some(previous) = self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .replace(spinner)
        {
            previous.finish_and_clear();
        }
    }

    fn on_progress(&self, progress: &DownloadProgress) {
        let message = progress_line(progress);
        match self.take() {
            Some(spinner) => spinner.finish_with_message(message),
            None => eprintln!("{message}"),
        }
    }
}

/// One-line description of a finished chapter.
pub(crate) fn progress_line(progress: &DownloadProgress) -> String {
    let label = match progress.index {
        Some(index) => format!("[{index}] {}", progress.name),
        None => progress.name.clone(),
    };
    match progress.status {
        ProgressStatus::Completed if progress.failed_count == 0 => format!("{label}: completed"),
        ProgressStatus::Completed => format!(
            "{label}: completed, {} pages not downloaded",
            progress.failed_count
        ),
        ProgressStatus::Skipped => format!("{label}: skipped (already downloaded)"),
        ProgressStatus::Failed => format!("{label}: failed"),
    }
}

/// Asks on stdin; an empty answer or anything starting with `y` proceeds.
pub(crate) struct StdinConfirm;

#[async_trait]
impl Confirm for StdinConfirm {
    async fn confirm(&self, prompt: &str) -> bool {
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || {
            let mut stderr = io::stderr();
            let _ = write!(stderr, "{prompt} ");
            let _ = stderr.flush();
            let mut answer = String::new();
            if io::stdin().lock().read_line(&mut answer).is_err() {
                return false;
            }
            is_affirmative(&answer)
        })
        .await
        .unwrap_or(false)
    }
}

pub(crate) fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim().to_ascii_lowercase();
    answer.is_empty() || answer.starts_with('y')
}
