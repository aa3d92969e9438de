use std::path::PathBuf;

use clap::Parser;
use folder_tree::{
    default_workers, BuildMethod, Config, DEFAULT_MAX_FORK_DEPTH, DEFAULT_PARALLEL_THRESHOLD,
};

/// Build an in-memory folder tree and run counting and word-search queries over it
#[derive(Parser, Debug, Clone)]
#[command(
    name = "folder_tree",
    version,
    after_help = "EXAMPLES:\n    \
        folder_tree ./works --word the --word cat\n    \
        folder_tree ./works -m par -c --word love -i\n    \
        folder_tree ./works -m conc -w 8 -e '^\\..*' --json"
)]
pub struct CliArgs {
    /// Directory to build the tree for
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Build method: seq, conc or par
    #[arg(short = 'm', long = "method", default_value = "seq", value_name = "METHOD")]
    pub build_method: BuildMethod,

    /// Worker threads for the concurrent build
    #[arg(short = 'w', long, default_value_t = default_workers(), value_name = "NUM")]
    pub workers: usize,

    /// Skip entries whose name matches this regex
    #[arg(short = 'e', long = "exclude", value_name = "PATTERN")]
    pub exclude_pattern: Option<String>,

    /// Directories with fewer entries are not forked by the parallel build
    #[arg(long, default_value_t = DEFAULT_PARALLEL_THRESHOLD, value_name = "NUM")]
    pub parallel_threshold: usize,

    /// Depth from which the parallel build stops forking
    #[arg(long, default_value_t = DEFAULT_MAX_FORK_DEPTH, value_name = "NUM")]
    pub max_fork_depth: usize,

    /// Word to search for (can be repeated)
    #[arg(long = "word", value_name = "WORD", action = clap::ArgAction::Append)]
    pub words: Vec<String>,

    /// Run the queries concurrently
    #[arg(short = 'c', long)]
    pub concurrent: bool,

    /// Match words regardless of case
    #[arg(short = 'i', long)]
    pub ignore_case: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Debug logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl CliArgs {
    pub fn to_config(&self) -> Config {
        Config {
            path: self.path.clone(),
            build_method: self.build_method,
            workers: self.workers,
            parallel_threshold: self.parallel_threshold,
            max_fork_depth: self.max_fork_depth,
            exclude_pattern: self.exclude_pattern.clone(),
        }
    }
}
