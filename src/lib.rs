//! # ytdlp-supervisor
//!
//! Run yt-dlp through a bundled interpreter and keep it under control: both
//! output streams are drained concurrently, download progress is parsed from
//! stdout, an ffmpeg child is tracked when it does the transfer, and any
//! invocation can be canceled by identifier.
//!
//! ```no_run
//! use ytdlp_supervisor::{runtime, CommandRequest, InvocationOptions, Supervisor, SupervisorConfig};
//!
//! # async fn demo() -> ytdlp_supervisor::Result<()> {
//! runtime::init(&SupervisorConfig::default())?;
//! let supervisor = Supervisor::new();
//! let (options, mut progress) = InvocationOptions::new()
//!     .with_id("job-1")
//!     .with_progress_channel();
//! tokio::spawn(async move {
//!     while let Some(sample) = progress.recv().await {
//!         println!("{:.1}% eta {}s", sample.percent, sample.eta_seconds);
//!     }
//! });
//! let result = supervisor
//!     .execute(CommandRequest::new("https://example.com/video"), options)
//!     .await?;
//! println!("exit {}", result.exit_code);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - `cli` - command-line front end
//! - `config` - configuration file, environment overrides and runtime layout
//! - `error` - error type and numeric codes
//! - `runtime` - one-time process-wide setup
//! - `subprocess` - process spawning, stream draining and progress parsing
//! - `supervisor` - invocation lifecycle, registry and cancellation
//! - `tracker` - subsidiary ffmpeg discovery and diagnostics
pub mod cli;
pub mod config;
pub mod error;
pub mod runtime;
pub mod subprocess;
pub mod supervisor;
pub mod tracker;

pub use config::{ConfigLoader, RuntimeLayout, SupervisorConfig};
pub use error::{ErrorCode, Result, SupervisorError};
pub use subprocess::{LineClassifier, ProgressListener, ProgressSample};
pub use supervisor::{
    CommandRequest, InvocationOptions, InvocationResult, ProcessRegistry, Supervisor, VideoInfo,
};
pub use tracker::{ProcessInspector, SysinfoInspector};
