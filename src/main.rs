//! CLI entry point for comic-dl.

use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use comic_dl_core::download::SerieSummary;
use tracing::{debug, error};

mod app;
mod cli;

use app::{commands, terminal};
use cli::{Cli, Command};

/// Process outcome, mapped to the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    Success,
    /// Some chapters or pages could not be downloaded.
    Partial,
    Failure,
}

impl ProcessExit {
    pub(crate) fn from_summary(summary: &SerieSummary) -> Self {
        if summary.aborted || summary.is_success() {
            Self::Success
        } else if summary.results.iter().any(|p| !p.is_incomplete()) {
            Self::Partial
        } else {
            Self::Failure
        }
    }

    /// Worst of two outcomes.
    pub(crate) fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::Failure, _) | (_, Self::Failure) => Self::Failure,
            (Self::Partial, _) | (_, Self::Partial) => Self::Partial,
            _ => Self::Success,
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Partial => 2,
            Self::Failure => 1,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    terminal::init_tracing(terminal::default_log_level(
        cli.options.verbose,
        cli.options.silence,
    ));
    debug!(?cli, "CLI arguments parsed");

    match run(cli).await {
        Ok(exit) => ExitCode::from(exit.code()),
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(ProcessExit::Failure.code())
        }
    }
}

async fn run(cli: Cli) -> Result<ProcessExit> {
    let mut options = cli.options;
    if let Some(target) = cli.command.as_ref().and_then(Command::target) {
        options.url = Some(target.to_string());
    }

    match cli.command {
        Some(Command::List { .. }) => commands::run_list(options).await,
        Some(Command::Download { .. }) => commands::run_download(options).await,
        Some(Command::Chapter { .. }) => commands::run_chapter(options).await,
        Some(Command::Generate) => commands::run_generate(&options).await,
        None if options.url.is_some() || options.shorthand_url.is_some() || options.list.is_some() => {
            commands::run_download(options).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(ProcessExit::Success)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ProcessExit;

    #[test]
    fn test_combine_keeps_worst_outcome() {
        assert_eq!(ProcessExit::Success.combine(ProcessExit::Success), ProcessExit::Success);
        assert_eq!(ProcessExit::Success.combine(ProcessExit::Partial), ProcessExit::Partial);
        assert_eq!(ProcessExit::Partial.combine(ProcessExit::Failure), ProcessExit::Failure);
    }
}
