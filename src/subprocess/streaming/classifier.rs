//! Progress classification of yt-dlp output lines
//!
//! Two mutually exclusive line grammars are recognised:
//!
//! - the native downloader: `[download]  42.5% of 10MiB at 1MiB/s ETA 00:12`
//! - aria2c summary lines: `[#2089b0 400KiB/10MiB(3%) CN:1 DL:115KiB ETA:1m25s]`
//!
//! The last recognised percent and ETA are sticky: a line that matches
//! neither grammar reports the previous values alongside its own text.

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::ProgressSample;

static DOWNLOAD_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[download\]\s+(\d+\.\d)% .* ETA (\d+):(\d+)").expect("Invalid regex pattern")
});

static ARIA2C_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[#\w{6}.*\((\d*\.*\d+)%\).*?((\d+)m)*((\d+)s)*\]")
        .expect("Invalid regex pattern")
});

/// Per-invocation line classifier. Never share one across invocations.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    percent: f32,
    eta_seconds: i64,
}

impl LineClassifier {
    pub fn new() -> Self {
        Self {
            percent: ProgressSample::UNKNOWN_PERCENT,
            eta_seconds: ProgressSample::UNKNOWN_ETA,
        }
    }

    pub fn classify(&mut self, line: &str) -> ProgressSample {
        if let Some((percent, eta)) = Self::parse_download(line).or_else(|| Self::parse_aria2c(line))
        {
            self.percent = percent;
            self.eta_seconds = eta;
        }
        ProgressSample::new(self.percent, self.eta_seconds, line)
    }

    /// Last recognised values, `(-1.0, -1)` before the first match
    pub fn current(&self) -> (f32, i64) {
        (self.percent, self.eta_seconds)
    }

    fn parse_download(line: &str) -> Option<(f32, i64)> {
        let caps = DOWNLOAD_LINE.captures(line)?;
        let percent = caps[1].parse::<f32>().ok()?;
        let minutes = caps[2].parse::<i64>().ok()?;
        let seconds = caps[3].parse::<i64>().ok()?;
        Some((percent, eta_seconds(minutes, seconds)?))
    }

    fn parse_aria2c(line: &str) -> Option<(f32, i64)> {
        let caps = ARIA2C_LINE.captures(line)?;
        let percent = caps[1].parse::<f32>().ok()?;
        // A present but unparsable component rejects the line.
        let minutes = match caps.get(3) {
            Some(m) => m.as_str().parse::<i64>().ok()?,
            None => 0,
        };
        let seconds = match caps.get(5) {
            Some(s) => s.as_str().parse::<i64>().ok()?,
            None => 0,
        };
        Some((percent, eta_seconds(minutes, seconds)?))
    }
}

/// `None` when the total does not fit, which the caller treats as no match
fn eta_seconds(minutes: i64, seconds: i64) -> Option<i64> {
    minutes.checked_mul(60)?.checked_add(seconds)
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new()
    }
}
