use serde::Serialize;
use std::time::Duration;

/// Outcome of a successful or error-tolerated invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationResult {
    pub id: String,
    /// Full argv, interpreter first
    pub command: Vec<String>,
    pub exit_code: i32,
    pub elapsed: Duration,
    pub stdout: String,
    pub stderr: String,
}

impl InvocationResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}
