//! Concurrent draining of subprocess output
//!
//! Each child stream is read by its own task with a fixed-size buffer.
//! Completed lines are classified into [`ProgressSample`]s and handed to a
//! [`ProgressListener`]; the full text is accumulated for the final result.

pub mod classifier;
pub mod drainer;
pub mod listener;
pub mod types;


pub use classifier::LineClassifier;
pub use drainer::StreamDrainer;
pub use listener::{ChannelListener, LoggingListener, ProgressListener, SharedListener};
pub use types::{DrainMode, DrainedStream, ProgressSample, StreamSource};
