use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::process::{Child, ChildStderr, ChildStdout};

use super::error::ProcessError;

/// Grace period between SIGTERM and SIGKILL when destroying a process group
const TERMINATION_GRACE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct ProcessCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

impl ProcessCommand {
    /// Full argument vector, program first
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect()
    }

    pub fn display(&self) -> String {
        self.argv().join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Error(i32),
    Signal(i32),
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Success)
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitStatus::Success => Some(0),
            ExitStatus::Error(code) => Some(*code),
            ExitStatus::Signal(_) => None,
        }
    }

    fn from_std(status: std::process::ExitStatus) -> Self {
        if status.success() {
            ExitStatus::Success
        } else if let Some(code) = status.code() {
            ExitStatus::Error(code)
        } else {
            Self::parse_signal_status(status)
        }
    }

    #[cfg(unix)]
    fn parse_signal_status(status: std::process::ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;
        match status.signal() {
            Some(signal) => ExitStatus::Signal(signal),
            None => ExitStatus::Error(1),
        }
    }

    #[cfg(not(unix))]
    fn parse_signal_status(_status: std::process::ExitStatus) -> Self {
        ExitStatus::Error(1)
    }
}

/// A started child process with piped output, in its own process group
#[derive(Debug)]
pub struct SupervisedChild {
    child: Child,
    pid: u32,
}

impl SupervisedChild {
    pub fn spawn(command: &ProcessCommand) -> Result<Self, ProcessError> {
        Self::log_command_start(command);

        let mut cmd = Self::configure_command(command);
        let child = cmd
            .spawn()
            .map_err(|e| Self::map_spawn_error(e, command))?;
        let pid = child.id().ok_or(ProcessError::MissingPid)?;

        tracing::debug!("Spawned pid {} for {}", pid, command.program.display());
        Ok(Self { child, pid })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn take_stdout(&mut self) -> Result<ChildStdout, ProcessError> {
        self.child
            .stdout
            .take()
            .ok_or(ProcessError::MissingPipe("stdout"))
    }

    pub fn take_stderr(&mut self) -> Result<ChildStderr, ProcessError> {
        self.child
            .stderr
            .take()
            .ok_or(ProcessError::MissingPipe("stderr"))
    }

    /// Wait for exit. Cancel safe, so it may sit in a `select!` loop.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await.map(ExitStatus::from_std)
    }

    /// True while the process has not exited (and has not been reaped)
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Terminate the whole process group: SIGTERM, a short grace period, then SIGKILL.
    pub async fn destroy(&mut self) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{self, Signal};
            use nix::unistd::Pid;

            let pgid = Pid::from_raw(-(self.pid as i32));
            if let Err(e) = signal::kill(pgid, Signal::SIGTERM) {
                tracing::debug!("SIGTERM to process group {} failed: {}", self.pid, e);
            }

            tokio::time::sleep(TERMINATION_GRACE).await;

            if self.is_running() {
                let _ = signal::kill(pgid, Signal::SIGKILL);
            }
        }

        if let Err(e) = self.child.start_kill() {
            if e.kind() != std::io::ErrorKind::InvalidInput {
                tracing::warn!("Failed to kill pid {}: {}", self.pid, e);
            }
        }
    }

    fn configure_command(command: &ProcessCommand) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&command.program);

        // Own process group so a kill reaches the tool and anything it spawned
        #[cfg(unix)]
        cmd.process_group(0);

        cmd.args(&command.args)
            .envs(&command.env)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn log_command_start(command: &ProcessCommand) {
        tracing::debug!("Executing subprocess: {}", command.display());
        if !command.env.is_empty() {
            tracing::trace!("Environment overrides: {:?}", command.env);
        }
    }

    fn map_spawn_error(error: std::io::Error, command: &ProcessCommand) -> ProcessError {
        tracing::error!("Failed to spawn {}: {}", command.program.display(), error);
        if error.kind() == std::io::ErrorKind::NotFound {
            ProcessError::CommandNotFound(command.program.display().to_string())
        } else {
            ProcessError::Io(error)
        }
    }
}

/// Send SIGKILL to a process group without waiting. Usable from `Drop`.
#[cfg(unix)]
pub fn kill_process_group(pid: u32) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let _ = signal::kill(Pid::from_raw(-(pid as i32)), Signal::SIGKILL);
}

#[cfg(not(unix))]
pub fn kill_process_group(_pid: u32) {}
