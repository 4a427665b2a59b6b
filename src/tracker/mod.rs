//! Subsidiary process tracking
//!
//! yt-dlp hands muxing and some downloads to an ffmpeg child. That child's
//! diagnostic output never reaches our pipes, so the tracker polls the
//! process table for children of the tool, opens the child's fd 2 and
//! forwards its lines as raw progress samples. It can also kill the child
//! alone, which cancellation relies on.

pub mod inspector;
pub mod mock;


pub use inspector::{DiagnosticStream, ProcessInspector, SysinfoInspector};
pub use mock::{InspectorCall, MockProcessInspector};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

use crate::subprocess::{DrainMode, SharedListener, StreamDrainer, StreamSource};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Why the tracking loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A subsidiary was seen and a later poll found none
    SubsidiaryExited,
    /// The tracked process exited or became a zombie
    ParentGone,
    /// `stop()` was requested, or every handle was dropped
    Stopped,
}

/// Summary returned by the tracking task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerReport {
    /// Every distinct subsidiary pid observed, in discovery order
    pub subsidiaries: Vec<u32>,
    pub lines: usize,
    pub stop_reason: StopReason,
}

pub struct SubsidiaryTracker {
    parent_pid: u32,
    inspector: Arc<dyn ProcessInspector>,
    listener: Option<SharedListener>,
    poll_interval: Duration,
}

impl SubsidiaryTracker {
    pub fn new(parent_pid: u32, inspector: Arc<dyn ProcessInspector>) -> Self {
        Self {
            parent_pid,
            inspector,
            listener: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_listener(mut self, listener: Option<SharedListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Start polling on a background task
    pub fn start(self) -> TrackerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let control = TrackerControl {
            parent_pid: self.parent_pid,
            inspector: Arc::clone(&self.inspector),
            stop_tx: Arc::new(stop_tx),
        };
        tracing::debug!("Tracking subsidiary processes of pid {}", self.parent_pid);
        let task = tokio::spawn(self.run(stop_rx));
        TrackerHandle { control, task }
    }

    async fn run(self, mut stop_rx: watch::Receiver<bool>) -> TrackerReport {
        let mut subsidiaries: Vec<u32> = Vec::new();
        let mut lines = 0usize;

        let stop_reason = loop {
            if *stop_rx.borrow() {
                break StopReason::Stopped;
            }
            if !self.inspector.is_alive(self.parent_pid).await {
                break StopReason::ParentGone;
            }

            // Re-resolved every iteration; the subsidiary can be replaced
            let children = self.inspector.children_of(self.parent_pid).await;
            match children.first().copied() {
                Some(child) => {
                    if !subsidiaries.contains(&child) {
                        tracing::debug!(
                            "Found subsidiary process {} of pid {}",
                            child,
                            self.parent_pid
                        );
                        subsidiaries.push(child);
                    }
                    match self.inspector.open_diagnostic_stream(child).await {
                        Ok(stream) => {
                            let drainer = StreamDrainer::new(StreamSource::Subsidiary, DrainMode::Raw)
                                .with_listener(self.listener.clone());
                            tokio::select! {
                                drained = drainer.drain(stream) => lines += drained.lines,
                                _ = stop_rx.changed() => break StopReason::Stopped,
                            }
                        }
                        Err(e) => {
                            tracing::debug!("Cannot open diagnostic stream of pid {}: {}", child, e);
                        }
                    }
                }
                None if !subsidiaries.is_empty() => break StopReason::SubsidiaryExited,
                None => {}
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = stop_rx.changed() => break StopReason::Stopped,
            }
        };

        tracing::debug!(
            "Stopped tracking pid {} ({:?}, {} lines)",
            self.parent_pid,
            stop_reason,
            lines
        );
        TrackerReport {
            subsidiaries,
            lines,
            stop_reason,
        }
    }
}

/// Cloneable control surface of a running tracker
#[derive(Clone)]
pub struct TrackerControl {
    parent_pid: u32,
    inspector: Arc<dyn ProcessInspector>,
    stop_tx: Arc<watch::Sender<bool>>,
}

impl TrackerControl {
    pub fn parent_pid(&self) -> u32 {
        self.parent_pid
    }

    /// Ask the tracking loop to end at its next suspension point
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }

    /// Point-in-time query; the answer may be stale immediately
    pub async fn has_subsidiary(&self) -> bool {
        !self.inspector.children_of(self.parent_pid).await.is_empty()
    }

    /// Kill the current subsidiary only. Returns false when there was none.
    pub async fn kill_subsidiary(&self) -> bool {
        let children = self.inspector.children_of(self.parent_pid).await;
        match children.first().copied() {
            Some(child) => {
                tracing::debug!("Killing subsidiary process {}", child);
                self.inspector.terminate(child).await
            }
            None => false,
        }
    }

    /// Kill the subsidiary, then the tracked process, then stop tracking
    pub async fn force_stop(&self) {
        self.kill_subsidiary().await;
        if self.inspector.is_alive(self.parent_pid).await {
            self.inspector.terminate(self.parent_pid).await;
        }
        self.stop();
    }
}

/// A running tracker: its control surface plus the background task
pub struct TrackerHandle {
    control: TrackerControl,
    task: JoinHandle<TrackerReport>,
}

impl TrackerHandle {
    pub fn control(&self) -> &TrackerControl {
        &self.control
    }

    pub fn stop(&self) {
        self.control.stop()
    }

    pub async fn has_subsidiary(&self) -> bool {
        self.control.has_subsidiary().await
    }

    pub async fn kill_subsidiary(&self) -> bool {
        self.control.kill_subsidiary().await
    }

    pub async fn force_stop(&self) {
        self.control.force_stop().await
    }

    /// Wait for the tracking loop to end
    pub async fn join(self) -> Result<TrackerReport, JoinError> {
        self.task.await
    }

    pub fn into_parts(self) -> (TrackerControl, JoinHandle<TrackerReport>) {
        (self.control, self.task)
    }
}
