//! Core types for streaming infrastructure

use serde::Serialize;

/// Size of the fixed read buffer used by every drainer
pub const READ_BUFFER_SIZE: usize = 8192;

/// Stream source identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSource {
    Stdout,
    Stderr,
    /// Diagnostic stream of the subsidiary (ffmpeg) process
    Subsidiary,
}

impl std::fmt::Display for StreamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamSource::Stdout => f.write_str("stdout"),
            StreamSource::Stderr => f.write_str("stderr"),
            StreamSource::Subsidiary => f.write_str("subsidiary"),
        }
    }
}

/// What a drainer does with each completed line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainMode {
    /// Accumulate and run each line through the progress classifier
    Classify,
    /// Accumulate only, no per-line delivery
    Capture,
    /// Accumulate and forward each line unparsed
    Raw,
}

/// One progress observation derived from an output line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSample {
    /// Percent complete, or [`ProgressSample::UNKNOWN_PERCENT`]
    pub percent: f32,
    /// Seconds remaining, or [`ProgressSample::UNKNOWN_ETA`]
    pub eta_seconds: i64,
    pub line: String,
}

impl ProgressSample {
    pub const UNKNOWN_PERCENT: f32 = -1.0;
    pub const UNKNOWN_ETA: i64 = -1;

    pub fn new(percent: f32, eta_seconds: i64, line: impl Into<String>) -> Self {
        Self {
            percent,
            eta_seconds,
            line: line.into(),
        }
    }

    /// A sample that carries a line but no parsed progress
    pub fn raw(line: impl Into<String>) -> Self {
        Self::new(Self::UNKNOWN_PERCENT, Self::UNKNOWN_ETA, line)
    }

    pub fn has_percent(&self) -> bool {
        self.percent >= 0.0
    }
}

/// Everything a drainer read before EOF or an unrecoverable read error
#[derive(Debug, Default)]
pub struct DrainedStream {
    pub text: String,
    pub bytes: usize,
    pub lines: usize,
    pub error: Option<std::io::Error>,
}
