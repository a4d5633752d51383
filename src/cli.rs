use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::alloc::Strategy;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,   // global --quiet
    pub verbose: bool, // global --verbose
    pub dry_run: bool, // global --dry-run
}

#[derive(Parser)]
#[command(name = "tracetag")]
#[command(
    about = "Instruments embedded C/C++ trees with numeric trace-log IDs and keeps the decode catalogs in sync"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Report every rewrite and conflict
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress the final modification summary
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without writing files or catalogs
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Normalize call sites, assign fresh IDs, and sync the catalogs
    Update(UpdateArgs),

    /// Seed the catalogs from an already-tagged tree (read-only)
    Refresh(RefreshArgs),

    /// Reset every wrapper numeral in the tree to 0
    Zero(ScrubArgs),

    /// Remove every ID wrapper from the tree
    Clean(ScrubArgs),

    /// Initialize a tracetag.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Parser)]
pub struct UpdateArgs {
    /// Source roots (files or directories)
    #[arg(default_value = ".")]
    pub src: Vec<PathBuf>,

    /// Format catalog artifact (default from config, til.json)
    #[arg(long)]
    pub til: Option<PathBuf>,

    /// Location catalog artifact (default from config, li.json)
    #[arg(long)]
    pub li: Option<PathBuf>,

    /// Smallest ID the allocator may hand out
    #[arg(long)]
    pub id_min: Option<i32>,

    /// Largest ID the allocator may hand out
    #[arg(long)]
    pub id_max: Option<i32>,

    /// Search strategy for fresh IDs
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Timestamp width in bits (0, 16 or 32) for newly inserted wrappers
    #[arg(long)]
    pub stamp_size: Option<u32>,

    /// Extend bare macro names with a parameter-count suffix
    #[arg(long, action = ArgAction::Set)]
    pub extend_names: Option<bool>,

    /// Additional glob patterns to ignore
    #[arg(short, long)]
    pub ignore: Vec<String>,
}

#[derive(Parser)]
pub struct RefreshArgs {
    /// Source roots (files or directories)
    #[arg(default_value = ".")]
    pub src: Vec<PathBuf>,

    /// Format catalog artifact (default from config, til.json)
    #[arg(long)]
    pub til: Option<PathBuf>,

    /// Location catalog artifact (default from config, li.json)
    #[arg(long)]
    pub li: Option<PathBuf>,

    /// Additional glob patterns to ignore
    #[arg(short, long)]
    pub ignore: Vec<String>,
}

#[derive(Parser)]
pub struct ScrubArgs {
    /// Source roots (files or directories)
    #[arg(default_value = ".")]
    pub src: Vec<PathBuf>,

    /// Additional glob patterns to ignore
    #[arg(short, long)]
    pub ignore: Vec<String>,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
