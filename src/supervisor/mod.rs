//! Process supervisor
//!
//! [`Supervisor::execute`] runs one tool invocation to completion:
//!
//! 1. reserve the identifier in the [`ProcessRegistry`]
//! 2. append managed options and spawn `[interpreter, tool, ...args]`
//! 3. drain stdout (classified) and stderr (captured) on their own tasks,
//!    plus a [`SubsidiaryTracker`] when ffmpeg is the downloader
//! 4. wait for the readers, then for exit, servicing cancel requests throughout
//! 5. apply the exit policy and release the identifier
//!
//! The child process is owned by the task running `execute`. Other tasks
//! reach it only through [`Supervisor::cancel`], which sends a request over
//! the handle's control channel.

pub mod info;
pub mod options;
pub mod registry;
pub mod request;
pub mod response;

#[cfg(test)]
mod tests;

pub use info::{VideoFormat, VideoInfo, VideoThumbnail};
pub use options::InvocationOptions;
pub use registry::{ControlRequest, ProcessHandle, ProcessRegistry};
pub use request::CommandRequest;
pub use response::InvocationResult;

use std::sync::Arc;
use std::time::Instant;

use futures::future::OptionFuture;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinError};
use uuid::Uuid;

use crate::config::RuntimeLayout;
use crate::error::{Result, SupervisorError};
use crate::runtime;
use crate::subprocess::{
    kill_process_group, DrainMode, DrainedStream, ProcessCommand, ProcessCommandBuilder,
    StreamDrainer, StreamSource, SupervisedChild,
};
use crate::tracker::{ProcessInspector, SubsidiaryTracker, SysinfoInspector, TrackerControl};

#[derive(Clone)]
enum LayoutSource {
    /// Read from [`runtime::init`] at execution time
    Global,
    Fixed(Arc<RuntimeLayout>),
}

#[derive(Clone)]
pub struct Supervisor {
    registry: Arc<ProcessRegistry>,
    inspector: Arc<dyn ProcessInspector>,
    layout: LayoutSource,
}

impl Supervisor {
    /// Supervisor using the process-wide layout from [`runtime::init`]
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ProcessRegistry::new()),
            inspector: Arc::new(SysinfoInspector::new()),
            layout: LayoutSource::Global,
        }
    }

    /// Supervisor bound to an explicit layout, independent of global setup
    pub fn with_layout(layout: RuntimeLayout) -> Self {
        Self {
            layout: LayoutSource::Fixed(Arc::new(layout)),
            ..Self::new()
        }
    }

    pub fn with_inspector(mut self, inspector: Arc<dyn ProcessInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    pub fn with_registry(mut self, registry: Arc<ProcessRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &Arc<ProcessRegistry> {
        &self.registry
    }

    /// Number of registered invocations. Advisory: may change immediately.
    pub fn active_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.registry.contains(id)
    }

    fn resolve_layout(&self) -> Result<Arc<RuntimeLayout>> {
        match &self.layout {
            LayoutSource::Fixed(layout) => Ok(Arc::clone(layout)),
            LayoutSource::Global => runtime::layout().ok_or(SupervisorError::NotInitialized),
        }
    }

    /// Cancel a running invocation.
    ///
    /// Returns true when the process was alive and has been destroyed; its
    /// `execute` call then fails with [`SupervisorError::Canceled`]. Returns
    /// false for unknown identifiers and for processes that already exited.
    pub async fn cancel(&self, id: &str) -> bool {
        match self.registry.get(id) {
            Some(handle) => {
                tracing::debug!("Cancel requested for {}", id);
                handle.request_cancel().await
            }
            None => false,
        }
    }

    /// Run the tool with `request` and wait for it to finish
    pub async fn execute(
        &self,
        mut request: CommandRequest,
        options: InvocationOptions,
    ) -> Result<InvocationResult> {
        let layout = self.resolve_layout()?;
        let InvocationOptions {
            id,
            listener,
            on_start,
            on_end,
        } = options;
        let id = id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let (control_tx, mut control_rx) = mpsc::unbounded_channel();
        let handle = Arc::new(ProcessHandle::new(id.clone(), control_tx));
        self.registry.register(Arc::clone(&handle))?;
        let mut guard = InvocationGuard::new(Arc::clone(&self.registry), Arc::clone(&handle));

        request.apply_managed_options(&layout);
        let command = build_process_command(&request, &layout);
        let argv = command.argv();

        let started = Instant::now();
        let mut child = SupervisedChild::spawn(&command)?;
        let pid = child.pid();
        handle.set_pid(pid);
        guard.pid = Some(pid);
        tracing::debug!("Invocation {} running as pid {}", id, pid);

        if let Some(hook) = on_start {
            hook(&id);
        }

        let stdout_task = tokio::spawn(
            StreamDrainer::new(StreamSource::Stdout, DrainMode::Classify)
                .with_listener(listener.clone())
                .drain(child.take_stdout()?),
        );
        let stderr_task = tokio::spawn(
            StreamDrainer::new(StreamSource::Stderr, DrainMode::Capture).drain(child.take_stderr()?),
        );
        guard.tasks.push(stdout_task.abort_handle());
        guard.tasks.push(stderr_task.abort_handle());

        let (tracker, tracker_task) = if request.uses_ffmpeg_downloader() {
            let (control, task) = SubsidiaryTracker::new(pid, Arc::clone(&self.inspector))
                .with_listener(listener)
                .with_poll_interval(layout.poll_interval)
                .start()
                .into_parts();
            guard.tasks.push(task.abort_handle());
            (Some(control), Some(task))
        } else {
            (None, None)
        };

        let mut canceled = false;
        let readers = async {
            tokio::join!(stdout_task, stderr_task, OptionFuture::from(tracker_task))
        };
        tokio::pin!(readers);

        let (stdout, stderr, tracked) = loop {
            tokio::select! {
                Some(ControlRequest::Cancel { reply }) = control_rx.recv() => {
                    let destroyed = self.handle_cancel(&mut child, tracker.as_ref(), &handle).await;
                    canceled |= destroyed;
                    let _ = reply.send(destroyed);
                }
                outputs = &mut readers => break outputs,
            }
        };

        let stdout = reader_output(stdout, &id, "stdout")?;
        let stderr = reader_output(stderr, &id, "stderr")?;
        if let Some(Err(e)) = tracked {
            tracing::warn!("Subsidiary tracker for {} failed: {}", id, e);
        }

        let status = loop {
            tokio::select! {
                Some(ControlRequest::Cancel { reply }) = control_rx.recv() => {
                    let destroyed = self.handle_cancel(&mut child, tracker.as_ref(), &handle).await;
                    canceled |= destroyed;
                    let _ = reply.send(destroyed);
                }
                status = child.wait() => break status,
            }
        };
        let status = status.map_err(|e| SupervisorError::Interrupted {
            id: id.clone(),
            reason: format!("waiting for exit failed: {e}"),
        })?;

        if let Some(tracker) = &tracker {
            tracker.stop();
        }
        let elapsed = started.elapsed();
        let still_registered = self.registry.is_current(&handle);
        guard.finish();

        let exit_code = status.code();
        tracing::debug!(
            "Invocation {} exited with {:?} after {:?}",
            id,
            status,
            elapsed
        );

        if !status.success() {
            if canceled || !still_registered {
                return Err(SupervisorError::Canceled(id));
            }
            if !(request.tolerates_errors() && !stdout.text.is_empty()) {
                return Err(SupervisorError::ToolExecution {
                    exit_code,
                    stderr: stderr.text,
                });
            }
            tracing::debug!("Tolerating exit {:?} for {} with metadata output", exit_code, id);
        }

        let result = InvocationResult {
            id,
            command: argv,
            exit_code: exit_code.unwrap_or(-1),
            elapsed,
            stdout: stdout.text,
            stderr: stderr.text,
        };
        if let Some(hook) = on_end {
            hook(&result);
        }
        Ok(result)
    }

    /// Fetch metadata for `url` without downloading
    pub async fn get_info(&self, url: &str) -> Result<VideoInfo> {
        self.get_info_with(CommandRequest::new(url), InvocationOptions::default())
            .await
    }

    /// Run `request` with `--dump-json` and decode the printed document
    pub async fn get_info_with(
        &self,
        mut request: CommandRequest,
        options: InvocationOptions,
    ) -> Result<VideoInfo> {
        request.add_option("--dump-json");
        let result = self.execute(request, options).await?;
        VideoInfo::from_dump(&result.stdout).map_err(|source| SupervisorError::MetadataDecode {
            source,
            stderr: result.stderr,
        })
    }

    async fn handle_cancel(
        &self,
        child: &mut SupervisedChild,
        tracker: Option<&TrackerControl>,
        handle: &Arc<ProcessHandle>,
    ) -> bool {
        match tracker {
            Some(tracker) => {
                tracker.kill_subsidiary().await;
            }
            None => {
                if let Some(&subsidiary) = self.inspector.children_of(child.pid()).await.first() {
                    self.inspector.terminate(subsidiary).await;
                }
            }
        }

        if !child.is_running() {
            tracing::debug!("Cancel for {}: process already exited", handle.id());
            return false;
        }

        child.destroy().await;
        self.registry.remove(handle);
        tracing::info!("Canceled invocation {}", handle.id());
        true
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

fn build_process_command(request: &CommandRequest, layout: &RuntimeLayout) -> ProcessCommand {
    let parent_path = std::env::var("PATH").ok();
    ProcessCommandBuilder::new(&layout.interpreter)
        .arg(layout.tool.display().to_string())
        .args(request.build_command())
        .envs(layout.environment(parent_path.as_deref()))
        .build()
}

fn reader_output(
    joined: std::result::Result<DrainedStream, JoinError>,
    id: &str,
    stream: &str,
) -> Result<DrainedStream> {
    joined.map_err(|e| SupervisorError::Interrupted {
        id: id.to_string(),
        reason: format!("{stream} reader failed: {e}"),
    })
}

/// Releases an invocation's resources unless it completed normally: kills the
/// process group, aborts reader tasks and drops the registry entry. Covers
/// early returns and the `execute` future being dropped.
struct InvocationGuard {
    registry: Arc<ProcessRegistry>,
    handle: Arc<ProcessHandle>,
    pid: Option<u32>,
    tasks: Vec<AbortHandle>,
    armed: bool,
}

impl InvocationGuard {
    fn new(registry: Arc<ProcessRegistry>, handle: Arc<ProcessHandle>) -> Self {
        Self {
            registry,
            handle,
            pid: None,
            tasks: Vec::new(),
            armed: true,
        }
    }

    fn finish(&mut self) {
        self.armed = false;
        self.registry.remove(&self.handle);
    }
}

impl Drop for InvocationGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(pid) = self.pid {
            tracing::debug!("Destroying interrupted invocation {} (pid {})", self.handle.id(), pid);
            kill_process_group(pid);
        }
        for task in &self.tasks {
            task.abort();
        }
        self.registry.remove(&self.handle);
    }
}
