//! CLI argument structures

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Run yt-dlp under supervision
#[derive(Parser, Debug)]
#[command(name = "ytdlp-supervisor")]
#[command(about = "ytdlp-supervisor - Run yt-dlp with progress reporting and cancellation", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download a URL, showing progress
    Download(DownloadArgs),

    /// Print metadata for a URL as JSON
    Info {
        /// Media URL
        url: String,

        /// Print the compact form instead of pretty JSON
        #[arg(long)]
        compact: bool,
    },
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct DownloadArgs {
    /// Media URL
    pub url: String,

    /// Invocation identifier (defaults to a generated UUID)
    #[arg(long)]
    pub id: Option<String>,

    /// Format selector passed through as --format
    #[arg(short = 'f', long)]
    pub format: Option<String>,

    /// Output template passed through as --output
    #[arg(short = 'o', long)]
    pub output: Option<String>,

    /// Use ffmpeg as the downloader
    #[arg(long)]
    pub ffmpeg: bool,

    /// Extra tool options, after `--`
    #[arg(last = true, value_name = "TOOL_ARGS")]
    pub extra: Vec<String>,
}

/// Tracing filter for a `-v` count
pub fn get_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        2 => "trace",
        _ => "trace,sysinfo=debug",
    }
}
