//! Child process plumbing: command description, spawning into a private
//! process group, group termination and concurrent output draining.

pub mod builder;
pub mod error;
pub mod runner;
pub mod streaming;

pub use builder::ProcessCommandBuilder;
pub use error::ProcessError;
pub use runner::{kill_process_group, ExitStatus, ProcessCommand, SupervisedChild};
pub use streaming::{
    ChannelListener, DrainMode, DrainedStream, LineClassifier, LoggingListener, ProgressListener,
    ProgressSample, SharedListener, StreamDrainer, StreamSource,
};
