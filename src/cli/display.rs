//! Terminal progress for a running download

use indicatif::{ProgressBar, ProgressStyle};

use crate::subprocess::ProgressSample;

/// Bar resolution: percent is tracked in tenths
const BAR_LENGTH: u64 = 1000;

pub struct DownloadProgress {
    bar: ProgressBar,
}

impl DownloadProgress {
    pub fn new(label: &str) -> Self {
        let bar = ProgressBar::new(BAR_LENGTH);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% {msg}")
        {
            bar.set_style(style.progress_chars("█▓▒░ "));
        }
        bar.set_message(format!("starting {label}"));
        Self { bar }
    }

    /// Progress that draws nothing
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn update(&self, sample: &ProgressSample) {
        if sample.has_percent() {
            self.bar.set_position(position_for(sample.percent));
            self.bar.set_message(format_eta(sample.eta_seconds));
        } else {
            self.bar.set_message(sample.line.clone());
        }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self, message: impl Into<String>) {
        self.bar.finish_with_message(message.into());
    }

    pub fn abandon(&self, message: impl Into<String>) {
        self.bar.abandon_with_message(message.into());
    }
}

fn position_for(percent: f32) -> u64 {
    (percent.clamp(0.0, 100.0) * 10.0).round() as u64
}

fn format_eta(eta_seconds: i64) -> String {
    if eta_seconds < 0 {
        return String::new();
    }
    let minutes = eta_seconds / 60;
    let seconds = eta_seconds % 60;
    if minutes >= 60 {
        format!("ETA {}:{:02}:{:02}", minutes / 60, minutes % 60, seconds)
    } else {
        format!("ETA {minutes:02}:{seconds:02}")
    }
}
