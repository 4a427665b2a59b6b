//! Identifier → running invocation map

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};

use crate::error::{Result, SupervisorError};

/// Requests serviced by the task that owns an invocation's child process
#[derive(Debug)]
pub enum ControlRequest {
    /// Kill the subsidiary, then the process if still alive. Replies whether
    /// the process was destroyed.
    Cancel { reply: oneshot::Sender<bool> },
}

/// Registry entry for one running invocation
#[derive(Debug)]
pub struct ProcessHandle {
    id: String,
    pid: OnceLock<u32>,
    control: mpsc::UnboundedSender<ControlRequest>,
    registered_at: Instant,
}

impl ProcessHandle {
    pub fn new(id: impl Into<String>, control: mpsc::UnboundedSender<ControlRequest>) -> Self {
        Self {
            id: id.into(),
            pid: OnceLock::new(),
            control,
            registered_at: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// OS pid, once the process has started
    pub fn pid(&self) -> Option<u32> {
        self.pid.get().copied()
    }

    pub(crate) fn set_pid(&self, pid: u32) {
        let _ = self.pid.set(pid);
    }

    pub fn registered_at(&self) -> Instant {
        self.registered_at
    }

    /// Ask the owning task to cancel. False if the task is already gone.
    pub async fn request_cancel(&self) -> bool {
        let (reply, answer) = oneshot::channel();
        if self.control.send(ControlRequest::Cancel { reply }).is_err() {
            return false;
        }
        answer.await.unwrap_or(false)
    }
}

#[derive(Debug, Default)]
pub struct ProcessRegistry {
    entries: Mutex<HashMap<String, Arc<ProcessHandle>>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<ProcessHandle>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert if absent; an existing entry is left untouched
    pub fn register(&self, handle: Arc<ProcessHandle>) -> Result<()> {
        let mut entries = self.lock();
        if entries.contains_key(handle.id()) {
            return Err(SupervisorError::DuplicateIdentifier(handle.id().to_string()));
        }
        entries.insert(handle.id().to_string(), handle);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<ProcessHandle>> {
        self.lock().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    /// True while `handle` itself (not a later reuse of its id) is registered
    pub fn is_current(&self, handle: &Arc<ProcessHandle>) -> bool {
        self.lock()
            .get(handle.id())
            .is_some_and(|entry| Arc::ptr_eq(entry, handle))
    }

    /// Remove `handle` if it is still the entry for its id. Only the first
    /// caller gets `true`.
    pub fn remove(&self, handle: &Arc<ProcessHandle>) -> bool {
        let mut entries = self.lock();
        match entries.get(handle.id()) {
            Some(entry) if Arc::ptr_eq(entry, handle) => {
                entries.remove(handle.id());
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }
}
