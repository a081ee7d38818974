use std::path::PathBuf;

use clap::Parser;

/// Color mode for result output in the demo CLI.
#[derive(Debug, Clone, Copy)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

impl std::str::FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorMode::Auto),
            "always" => Ok(ColorMode::Always),
            "never" => Ok(ColorMode::Never),
            other => Err(format!("Unknown color mode: {}", other)),
        }
    }
}

/// fsindex, a live, whole-filesystem name index.
///
/// Walks `root` once, then watches it for changes and answers prefix,
/// substring, and fuzzy name queries read line-by-line from stdin.
#[derive(Parser, Debug)]
#[command(name = "fsindex")]
#[command(about = "Live whole-filesystem name index with incremental refresh")]
pub struct Args {
    /// Root directory to index and watch
    pub root: PathBuf,

    /// Glob pattern a path must match to be indexed (repeatable). Empty means "everything".
    #[arg(long = "include")]
    pub include: Vec<String>,

    /// Glob pattern that excludes a path from the index (repeatable)
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,

    /// Color output for query results: auto, always, never
    #[arg(long, default_value = "auto")]
    pub color: ColorMode,

    /// Worker threads for the initial parallel directory walk (default: physical cores)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Bounded capacity of the merged change-event/query-request queue
    #[arg(long, default_value_t = 256)]
    pub queue_capacity: usize,
}

pub fn parse_args() -> Args {
    Args::parse()
}
