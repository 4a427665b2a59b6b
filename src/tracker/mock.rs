use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use super::inspector::{DiagnosticStream, ProcessInspector};

/// Calls observed by [`MockProcessInspector`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectorCall {
    ChildrenOf(u32),
    IsAlive(u32),
    OpenDiagnosticStream(u32),
    Terminate(u32),
}

/// Scripted process table for tracker tests.
///
/// `children_of` answers from a queue of scripted polls; once the queue is
/// drained the last answer repeats. Terminated pids disappear from every
/// later answer.
#[derive(Clone, Default)]
pub struct MockProcessInspector {
    state: Arc<Mutex<MockState>>,
    call_history: Arc<Mutex<Vec<InspectorCall>>>,
}

#[derive(Default)]
struct MockState {
    child_polls: HashMap<u32, VecDeque<Vec<u32>>>,
    last_children: HashMap<u32, Vec<u32>>,
    alive: HashSet<u32>,
    streams: HashMap<u32, Vec<u8>>,
    terminated: Vec<u32>,
}

pub struct MockProcessConfig {
    inspector: MockProcessInspector,
    pid: u32,
    polls: Vec<Vec<u32>>,
    output: Option<Vec<u8>>,
}

impl MockProcessInspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a live process
    pub fn expect_process(&self, pid: u32) -> MockProcessConfig {
        MockProcessConfig {
            inspector: self.clone(),
            pid,
            polls: Vec::new(),
            output: None,
        }
    }

    pub fn set_alive(&self, pid: u32, alive: bool) {
        let mut state = self.state.lock().unwrap();
        if alive {
            state.alive.insert(pid);
        } else {
            state.alive.remove(&pid);
        }
    }

    pub fn terminated(&self) -> Vec<u32> {
        self.state.lock().unwrap().terminated.clone()
    }

    pub fn get_call_history(&self) -> Vec<InspectorCall> {
        self.call_history.lock().unwrap().clone()
    }

    pub fn verify_called(&self, call: &InspectorCall, times: usize) -> bool {
        let history = self.call_history.lock().unwrap();
        history.iter().filter(|c| *c == call).count() == times
    }

    fn record(&self, call: InspectorCall) {
        self.call_history.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ProcessInspector for MockProcessInspector {
    async fn children_of(&self, pid: u32) -> Vec<u32> {
        self.record(InspectorCall::ChildrenOf(pid));

        let mut state = self.state.lock().unwrap();
        let next = state.child_polls.get_mut(&pid).and_then(VecDeque::pop_front);
        let answer = match next {
            Some(children) => {
                state.last_children.insert(pid, children.clone());
                children
            }
            None => state.last_children.get(&pid).cloned().unwrap_or_default(),
        };
        answer
            .into_iter()
            .filter(|child| !state.terminated.contains(child))
            .collect()
    }

    async fn is_alive(&self, pid: u32) -> bool {
        self.record(InspectorCall::IsAlive(pid));
        self.state.lock().unwrap().alive.contains(&pid)
    }

    async fn open_diagnostic_stream(&self, pid: u32) -> std::io::Result<DiagnosticStream> {
        self.record(InspectorCall::OpenDiagnosticStream(pid));
        let output = self.state.lock().unwrap().streams.get(&pid).cloned();
        match output {
            Some(bytes) => Ok(Box::new(std::io::Cursor::new(bytes))),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no diagnostic stream scripted for pid {pid}"),
            )),
        }
    }

    async fn terminate(&self, pid: u32) -> bool {
        self.record(InspectorCall::Terminate(pid));
        let mut state = self.state.lock().unwrap();
        let was_alive = state.alive.remove(&pid);
        state.terminated.push(pid);
        was_alive
    }
}

impl MockProcessConfig {
    /// Answer for one `children_of` poll, in call order
    pub fn then_children(mut self, children: &[u32]) -> Self {
        self.polls.push(children.to_vec());
        self
    }

    /// Bytes returned when the diagnostic stream is opened
    pub fn with_diagnostic_output(mut self, output: &str) -> Self {
        self.output = Some(output.as_bytes().to_vec());
        self
    }

    pub fn finish(self) {
        let mut state = self.inspector.state.lock().unwrap();
        state.alive.insert(self.pid);
        state
            .child_polls
            .entry(self.pid)
            .or_default()
            .extend(self.polls);
        if let Some(output) = self.output {
            state.streams.insert(self.pid, output);
        }
    }
}
