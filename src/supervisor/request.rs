//! Argument building for one tool invocation

use std::fmt::Display;

use crate::config::RuntimeLayout;

/// Ordered option list plus target URLs.
///
/// Options keep their first-insertion order. Adding an option that already
/// exists appends another value; each value is emitted after its own copy
/// of the flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandRequest {
    urls: Vec<String>,
    options: Vec<(String, Vec<String>)>,
}

impl CommandRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_urls([url.into()])
    }

    pub fn with_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            options: Vec::new(),
        }
    }

    /// Request with no URL, e.g. for `--version`
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Add a flag without a value
    pub fn add_option(&mut self, option: &str) -> &mut Self {
        self.push(option, String::new())
    }

    pub fn add_option_with(&mut self, option: &str, value: impl Display) -> &mut Self {
        self.push(option, value.to_string())
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|(name, _)| name == option)
    }

    /// First value of `option`; `Some("")` for a bare flag
    pub fn get_option(&self, option: &str) -> Option<&str> {
        self.get_arguments(option)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn get_arguments(&self, option: &str) -> Option<&[String]> {
        self.options
            .iter()
            .find(|(name, _)| name == option)
            .map(|(_, values)| values.as_slice())
    }

    /// Flatten into the tool's argument list, URLs last
    pub fn build_command(&self) -> Vec<String> {
        let mut command = Vec::new();
        for (option, values) in &self.options {
            for value in values {
                command.push(option.clone());
                if !value.is_empty() {
                    command.push(value.clone());
                }
            }
        }
        command.extend(self.urls.iter().cloned());
        command
    }

    /// `--downloader ffmpeg` hands the transfer to an ffmpeg child
    pub fn uses_ffmpeg_downloader(&self) -> bool {
        self.get_option("--downloader") == Some("ffmpeg")
    }

    /// A non-zero exit still yields usable metadata in this mode
    pub fn tolerates_errors(&self) -> bool {
        self.has_option("--dump-json") && self.has_option("--ignore-errors")
    }

    /// Append the options the supervisor always manages
    pub(crate) fn apply_managed_options(&mut self, layout: &RuntimeLayout) {
        let explicit_cache = self
            .get_option("--cache-dir")
            .is_some_and(|dir| !dir.is_empty());
        if !explicit_cache {
            self.add_option("--no-cache-dir");
        }

        if self
            .build_command()
            .iter()
            .any(|arg| arg.contains("libaria2c.so"))
        {
            self.add_option_with("--external-downloader-args", "aria2c:--summary-interval=1");
            self.add_option_with(
                "--external-downloader-args",
                format!("aria2c:--ca-certificate={}", layout.cert_file.display()),
            );
        }

        self.add_option_with("--ffmpeg-location", layout.ffmpeg.display());
    }

    fn push(&mut self, option: &str, value: String) -> &mut Self {
        match self.options.iter_mut().find(|(name, _)| name == option) {
            Some((_, values)) => values.push(value),
            None => self.options.push((option.to_string(), vec![value])),
        }
        self
    }
}
