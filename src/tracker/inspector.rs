//! Process-table access for the subsidiary tracker

use async_trait::async_trait;
use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};
use tokio::io::AsyncRead;

pub type DiagnosticStream = Box<dyn AsyncRead + Send + Unpin>;

/// Read-only view of the OS process table plus the one write we need (kill).
#[async_trait]
pub trait ProcessInspector: Send + Sync {
    /// Live direct children of `pid`, lowest pid first
    async fn children_of(&self, pid: u32) -> Vec<u32>;

    /// False once the process is gone or only a zombie remains
    async fn is_alive(&self, pid: u32) -> bool;

    /// Open the diagnostic (fd 2) stream of a foreign process
    async fn open_diagnostic_stream(&self, pid: u32) -> std::io::Result<DiagnosticStream>;

    /// Kill a single process. Returns whether the signal was delivered.
    async fn terminate(&self, pid: u32) -> bool;
}

/// Production inspector backed by `sysinfo` and `/proc`
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoInspector;

impl SysinfoInspector {
    pub fn new() -> Self {
        Self
    }

    fn scan_children(parent: u32) -> Vec<u32> {
        let parent = Pid::from_u32(parent);
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);

        let mut children: Vec<u32> = system
            .processes()
            .iter()
            .filter(|(_, process)| {
                process.parent() == Some(parent)
                    && process.thread_kind().is_none()
                    && process.status() != ProcessStatus::Zombie
            })
            .map(|(pid, _)| pid.as_u32())
            .collect();
        children.sort_unstable();
        children
    }

    fn scan_alive(pid: u32) -> bool {
        let pid = Pid::from_u32(pid);
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        system
            .process(pid)
            .is_some_and(|process| process.status() != ProcessStatus::Zombie)
    }

    fn diagnostic_path(pid: u32) -> std::path::PathBuf {
        std::path::PathBuf::from(format!("/proc/{pid}/fd/2"))
    }
}

#[async_trait]
impl ProcessInspector for SysinfoInspector {
    async fn children_of(&self, pid: u32) -> Vec<u32> {
        tokio::task::spawn_blocking(move || Self::scan_children(pid))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Process table scan for children of {} failed: {}", pid, e);
                Vec::new()
            })
    }

    async fn is_alive(&self, pid: u32) -> bool {
        tokio::task::spawn_blocking(move || Self::scan_alive(pid))
            .await
            .unwrap_or(false)
    }

    async fn open_diagnostic_stream(&self, pid: u32) -> std::io::Result<DiagnosticStream> {
        let file = tokio::fs::File::open(Self::diagnostic_path(pid)).await?;
        Ok(Box::new(file))
    }

    #[cfg(unix)]
    async fn terminate(&self, pid: u32) -> bool {
        use nix::sys::signal::{self, Signal};

        match signal::kill(nix::unistd::Pid::from_raw(pid as i32), Signal::SIGKILL) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to kill pid {}: {}", pid, e);
                false
            }
        }
    }

    #[cfg(not(unix))]
    async fn terminate(&self, _pid: u32) -> bool {
        false
    }
}
