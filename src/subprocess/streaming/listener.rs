//! Progress listener trait and implementations

use std::sync::Arc;

use tokio::sync::mpsc;

use super::types::ProgressSample;

/// Receives progress samples from the reader tasks.
///
/// Called on the reader task itself, so implementations must be quick. Use
/// [`ChannelListener`] to consume samples on a task of your choosing.
pub trait ProgressListener: Send + Sync {
    fn on_progress(&self, sample: &ProgressSample);
}

pub type SharedListener = Arc<dyn ProgressListener>;

impl<F> ProgressListener for F
where
    F: Fn(&ProgressSample) + Send + Sync,
{
    fn on_progress(&self, sample: &ProgressSample) {
        self(sample)
    }
}

/// Forwards samples into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelListener {
    sender: mpsc::UnboundedSender<ProgressSample>,
}

impl ChannelListener {
    pub fn new(sender: mpsc::UnboundedSender<ProgressSample>) -> Self {
        Self { sender }
    }

    /// Create a listener together with the receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressSample>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl ProgressListener for ChannelListener {
    fn on_progress(&self, sample: &ProgressSample) {
        // A closed receiver only means the caller stopped listening
        let _ = self.sender.send(sample.clone());
    }
}

/// Logs every sample at debug level
#[derive(Debug, Clone)]
pub struct LoggingListener {
    label: String,
}

impl LoggingListener {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl ProgressListener for LoggingListener {
    fn on_progress(&self, sample: &ProgressSample) {
        if sample.has_percent() {
            tracing::debug!(
                "[{}] {:.1}% eta {}s: {}",
                self.label,
                sample.percent,
                sample.eta_seconds,
                sample.line
            );
        } else {
            tracing::debug!("[{}] {}", self.label, sample.line);
        }
    }
}
