//! Command-line front end
//!
//! - `args` - clap argument structures
//! - `commands` - download and info handlers
//! - `display` - indicatif progress rendering

pub mod args;
pub mod commands;
pub mod display;

pub use args::{get_log_level, Cli, Commands, DownloadArgs};
pub use commands::{build_download_request, run_download, run_info};
pub use display::DownloadProgress;
