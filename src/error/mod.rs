use std::path::PathBuf;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

use crate::subprocess::ProcessError;

/// Errors surfaced by the supervisor to its callers
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("[E{:04}] Runtime layout not initialized; call runtime::init first", ErrorCode::SETUP_NOT_INITIALIZED)]
    NotInitialized,

    #[error("[E{:04}] Bundled binary missing: {}", ErrorCode::SETUP_BINARY_MISSING, path.display())]
    BinaryMissing { path: PathBuf },

    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{:04}] Process ID already exists: {id}", ErrorCode::REGISTRY_DUPLICATE_ID, id = .0)]
    DuplicateIdentifier(String),

    #[error("[E{:04}] Failed to start process: {source}", source.code())]
    ProcessStart {
        #[source]
        source: ProcessError,
    },

    #[error("[E{:04}] {}", tool_failure_code(*exit_code), tool_failure_message(*exit_code, stderr))]
    ToolExecution {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("[E{:04}] Invocation {id} was canceled", ErrorCode::EXEC_CANCELED, id = .0)]
    Canceled(String),

    #[error("[E{:04}] Invocation {id} interrupted while waiting: {reason}", ErrorCode::EXEC_INTERRUPTED)]
    Interrupted { id: String, reason: String },

    #[error("[E{:04}] Unable to parse video information: {source}", ErrorCode::METADATA_DECODE_FAILED)]
    MetadataDecode {
        #[source]
        source: serde_json::Error,
        stderr: String,
    },
}

fn tool_failure_code(exit_code: Option<i32>) -> u16 {
    match exit_code {
        Some(_) => ErrorCode::EXEC_TOOL_FAILED,
        None => ErrorCode::EXEC_SIGNAL_RECEIVED,
    }
}

fn tool_failure_message(exit_code: Option<i32>, stderr: &str) -> String {
    let stderr = stderr.trim();
    match (exit_code, stderr.is_empty()) {
        (Some(code), true) => format!("Tool exited with code {code}"),
        (Some(code), false) => format!("Tool exited with code {code}: {stderr}"),
        (None, true) => "Tool terminated by signal".to_string(),
        (None, false) => format!("Tool terminated by signal: {stderr}"),
    }
}

impl SupervisorError {
    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::CONFIG_INVALID_VALUE,
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error to a configuration error
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        if let Self::Config { source: src, .. } = &mut self {
            *src = Some(source.into());
        }
        self
    }

    /// Stable numeric code for programmatic handling
    pub fn code(&self) -> u16 {
        match self {
            Self::NotInitialized => ErrorCode::SETUP_NOT_INITIALIZED,
            Self::BinaryMissing { .. } => ErrorCode::SETUP_BINARY_MISSING,
            Self::Config { code, .. } => *code,
            Self::DuplicateIdentifier(_) => ErrorCode::REGISTRY_DUPLICATE_ID,
            Self::ProcessStart { source } => source.code(),
            Self::ToolExecution { exit_code, .. } => tool_failure_code(*exit_code),
            Self::Canceled(_) => ErrorCode::EXEC_CANCELED,
            Self::Interrupted { .. } => ErrorCode::EXEC_INTERRUPTED,
            Self::MetadataDecode { .. } => ErrorCode::METADATA_DECODE_FAILED,
        }
    }

    /// True when the caller stopped the invocation, as opposed to it failing
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled(_))
    }

    /// Diagnostic text captured from the tool, when the error carries any
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::ToolExecution { stderr, .. } | Self::MetadataDecode { stderr, .. } => {
                Some(stderr)
            }
            _ => None,
        }
    }
}

impl From<ProcessError> for SupervisorError {
    fn from(source: ProcessError) -> Self {
        Self::ProcessStart { source }
    }
}

impl From<toml::de::Error> for SupervisorError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_with_code(ErrorCode::CONFIG_PARSE_ERROR, "Invalid configuration file")
            .with_source(err)
    }
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
