//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// debhub - APT repository for GitHub release assets
///
/// Reads the control data of `.deb` files attached to releases and
/// renders them as a package index.
#[derive(Parser, Debug)]
#[command(name = "debhub")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DEBHUB_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a single package and show its index entry
    Inspect(InspectArgs),

    /// Build a package index from release asset URLs
    Index(IndexArgs),
}

/// Output format for inspect
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Index entry as served
    #[default]
    Text,
    /// JSON object
    Json,
}

/// Arguments for the inspect command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Package URL (http/https) or local .deb path
    pub source: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Arguments for the index command
#[derive(Parser, Debug)]
pub struct IndexArgs {
    /// Release asset download URLs
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Include the repository name in Filename paths
    #[arg(long)]
    pub organization_wide: bool,
}
