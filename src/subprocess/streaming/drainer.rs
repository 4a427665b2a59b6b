//! Reading a child stream to EOF while delivering completed lines

use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt};

use super::classifier::LineClassifier;
use super::listener::SharedListener;
use super::types::{DrainMode, DrainedStream, ProgressSample, StreamSource, READ_BUFFER_SIZE};

/// Drains one stream. Build one per stream per invocation.
pub struct StreamDrainer {
    source: StreamSource,
    mode: DrainMode,
    listener: Option<SharedListener>,
    classifier: LineClassifier,
}

impl StreamDrainer {
    pub fn new(source: StreamSource, mode: DrainMode) -> Self {
        Self {
            source,
            mode,
            listener: None,
            classifier: LineClassifier::new(),
        }
    }

    pub fn with_listener(mut self, listener: Option<SharedListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Read until EOF. Read errors end the drain but are not propagated:
    /// everything read so far is returned along with the error.
    pub async fn drain<R>(mut self, mut reader: R) -> DrainedStream
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let mut captured = Vec::new();
        let mut splitter = LineSplitter::default();
        let mut lines = 0usize;
        let mut error = None;

        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    let chunk = &buf[..n];
                    captured.extend_from_slice(chunk);
                    if self.mode != DrainMode::Capture {
                        for line in splitter.push(chunk) {
                            lines += 1;
                            self.deliver(&line);
                        }
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("Error reading {}: {}", self.source, e);
                    error = Some(e);
                    break;
                }
            }
        }

        if self.mode != DrainMode::Capture {
            if let Some(line) = splitter.finish() {
                lines += 1;
                self.deliver(&line);
            }
        }

        tracing::trace!(
            "Drained {} bytes ({} lines) from {}",
            captured.len(),
            lines,
            self.source
        );

        DrainedStream {
            bytes: captured.len(),
            text: String::from_utf8_lossy(&captured).into_owned(),
            lines,
            error,
        }
    }

    fn deliver(&mut self, line: &str) {
        tracing::trace!("{}: {}", self.source, line);
        let sample = match self.mode {
            DrainMode::Classify => self.classifier.classify(line),
            DrainMode::Raw => ProgressSample::raw(line),
            DrainMode::Capture => return,
        };
        if let Some(listener) = &self.listener {
            listener.on_progress(&sample);
        }
    }
}

/// Splits a byte stream on `\r` or `\n`; a `\r\n` pair ends a single line.
/// Empty lines are dropped.
#[derive(Debug, Default)]
struct LineSplitter {
    pending: Vec<u8>,
    after_cr: bool,
}

impl LineSplitter {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut out = Vec::new();
        for &byte in chunk {
            match byte {
                b'\n' if self.after_cr => self.after_cr = false,
                b'\n' | b'\r' => {
                    self.after_cr = byte == b'\r';
                    if let Some(line) = self.take() {
                        out.push(line);
                    }
                }
                _ => {
                    self.after_cr = false;
                    self.pending.push(byte);
                }
            }
        }
        out
    }

    fn finish(&mut self) -> Option<String> {
        self.take()
    }

    fn take(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(line)
    }
}
