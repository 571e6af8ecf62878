use std::path::PathBuf;

use clap::Parser;
use directories::ProjectDirs;
use log::LevelFilter;

use crate::file_list::SortPolicy;

const STATE_FILE_NAME: &str = "current_indexes.json";

#[derive(Debug, Parser)]
#[command(name = "flipbook", version, about = "Read images, folders and zip archives one page at a time")]
pub struct Cli {
    /// Images, zip archives or folders to open right away
    pub paths: Vec<PathBuf>,

    /// File holding the last page read for each file set
    #[arg(long, value_name = "FILE")]
    pub state_file: Option<PathBuf>,

    /// Do not remember reading positions between runs
    #[arg(long, conflicts_with = "state_file")]
    pub no_state: bool,

    /// Page order applied after archives are expanded
    #[arg(long, value_enum, default_value_t = SortPolicy::AsIs)]
    pub sort: SortPolicy,

    /// Start in fullscreen
    #[arg(long)]
    pub fullscreen: bool,

    /// Log more (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Settings resolved from the command line and the platform.
#[derive(Debug, Clone)]
pub struct Config {
    pub initial_paths: Vec<PathBuf>,
    /// `None` keeps positions in memory only.
    pub state_file: Option<PathBuf>,
    pub sort: SortPolicy,
    pub fullscreen: bool,
    pub log_level: LevelFilter,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Self {
        let state_file = if cli.no_state {
            None
        } else {
            cli.state_file.or_else(default_state_file)
        };
        let log_level = match cli.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        };
        Self {
            initial_paths: cli.paths,
            state_file,
            sort: cli.sort,
            fullscreen: cli.fullscreen,
            log_level,
        }
    }
}

fn default_state_file() -> Option<PathBuf> {
    ProjectDirs::from("", "", "flipbook").map(|dirs| dirs.data_dir().join(STATE_FILE_NAME))
}
