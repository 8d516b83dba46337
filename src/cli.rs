//! CLI argument definitions using clap derive macros.
//!
//! Options are global so they can be given before or after the subcommand.
//! Fields that presets may fill are `Option`s; defaults are applied after
//! presets are merged.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use comic_dl_core::ArchiveMode;

/// Download comic series chapter by chapter.
///
/// Chapters are saved as image folders or zip/cbz archives, optionally with
/// a ComicInfo.xml metadata file.
#[derive(Parser, Debug)]
#[command(name = "comic-dl")]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub options: Options,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List all chapters of a serie
    #[command(visible_aliases = ["l", "ls"])]
    List {
        /// Serie URL (same as --url)
        target: Option<String>,
    },

    /// Download chapters from a serie
    #[command(visible_aliases = ["d", "dl", "serie"])]
    Download {
        /// Serie URL (same as --url)
        target: Option<String>,
    },

    /// Download the images of one chapter
    #[command(visible_aliases = ["c", "ch"])]
    Chapter {
        /// Chapter URL (same as --url)
        target: Option<String>,
    },

    /// Generate an adapter skeleton (--module) or a presets file (--presets)
    #[command(visible_aliases = ["g", "gen"])]
    Generate,
}

impl Command {
    /// Positional URL given to the subcommand, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::List { target } | Self::Download { target } | Self::Chapter { target } => {
                target.as_deref().filter(|target| !target.is_empty())
            }
            Self::Generate => None,
        }
    }
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// Site module name; detected from the URL when omitted
    #[arg(short, long, global = true)]
    pub module: Option<String>,

    /// URL of the serie or the chapter
    #[arg(short, long, global = true)]
    pub url: Option<String>,

    /// Serie folder name (or chapter name for `chapter`)
    #[arg(short, long, global = true)]
    pub name: Option<String>,

    /// Where files are saved [default: .]; with `list`, writes ComicInfo.xml there
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Text file holding the cookie header
    #[arg(short, long, global = true)]
    pub cookie: Option<PathBuf>,

    /// First chapter index to download [default: 0]
    #[arg(short, long, global = true)]
    pub from: Option<u32>,

    /// Last chapter index to download [default: last chapter]
    #[arg(short, long, global = true)]
    pub to: Option<u32>,

    /// Archive chapters as zip or cbz (`-a` alone means zip)
    #[arg(short, long, global = true, num_args = 0..=1, default_missing_value = "zip")]
    pub archive: Option<ArchiveMode>,

    /// Request timeout in milliseconds [default: 10000]
    #[arg(short = 'T', long, global = true)]
    pub timeout: Option<u64>,

    /// Silence console output, including the confirmation prompt
    #[arg(short, long, global = true, visible_alias = "quiet", visible_short_alias = 'q')]
    pub silence: bool,

    /// Images downloaded simultaneously [default: 10]
    #[arg(short, long, global = true, value_parser = clap::value_parser!(u16).range(1..))]
    pub batch: Option<u16>,

    /// Detailed errors (-v for debug, -vv for trace); overrides --silence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Skip the confirmation prompt
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Maximum length of the serie folder name
    #[arg(short = 'M', long, global = true)]
    pub max_title_length: Option<usize>,

    /// Archive compression level, 0-9 [default: 5]
    #[arg(short, long, global = true, value_parser = clap::value_parser!(u8).range(0..=9))]
    pub zip_level: Option<u8>,

    /// Re-download chapters with failed images, up to N times (`-r` alone means 1)
    #[arg(short, long, global = true, num_args = 0..=1, default_missing_value = "1")]
    pub retry: Option<u32>,

    /// Only download these chapter indices, e.g. `-C 1,2,4,7`
    #[arg(short = 'C', long, global = true, value_delimiter = ',')]
    pub chapters: Option<Vec<u32>>,

    /// Write ComicInfo.xml with every chapter
    #[arg(short, long, global = true)]
    pub info: bool,

    /// Image format for sites serving several, e.g. webp or jpg
    #[arg(short = 'F', long, global = true)]
    pub format: Option<String>,

    /// Re-download chapters that already exist
    #[arg(short = 'O', long = "override", global = true)]
    pub override_existing: bool,

    /// JSON presets file; with `generate`, print a presets file instead
    #[arg(short, long, global = true, num_args = 0..=1, default_missing_value = "")]
    pub presets: Option<PathBuf>,

    /// Raw cookie or token string
    #[arg(short = 'A', long, global = true)]
    pub auth: Option<String>,

    /// Chapter group for sites that publish series in groups [default: default]
    #[arg(short, long, global = true)]
    pub group: Option<String>,

    /// Prefix chapter folders and archives with the chapter index
    #[arg(short = 'I', long, global = true)]
    pub indexed_chapters: bool,

    /// Append the serie URL to a history file [default: <output>/history.txt]
    #[arg(short = 'H', long, global = true, num_args = 0..=1, default_missing_value = "")]
    pub history: Option<PathBuf>,

    /// Site shorthand for the serie (usually its id)
    #[arg(short = 'S', long, global = true)]
    pub shorthand_url: Option<String>,

    /// Text file with one URL (or shorthand) per line
    #[arg(short, long, global = true)]
    pub list: Option<PathBuf>,
}
