use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod layout;
pub mod loader;

pub use layout::RuntimeLayout;
pub use loader::ConfigLoader;

pub const ENV_PREFIX: &str = "YTDLP_SUPERVISOR_";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "ytdlp-supervisor", "ytdlp-supervisor")
}

/// Directory holding the bundled interpreter, tool and native packages
pub fn default_base_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".ytdlp-supervisor"))
}

/// Location of the user configuration file
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Where the bundled runtime lives and how it is driven.
///
/// Only `base_dir` is required in practice; every other path is derived
/// from it unless set explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    pub base_dir: PathBuf,
    /// Directory with the native executables; appended to the child's PATH
    pub bin_dir: Option<PathBuf>,
    pub packages_dir: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub interpreter: Option<PathBuf>,
    pub tool: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
    pub poll_interval_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            bin_dir: None,
            packages_dir: None,
            temp_dir: None,
            interpreter: None,
            tool: None,
            ffmpeg: None,
            poll_interval_ms: 1000,
        }
    }
}

impl SupervisorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration rooted at `base_dir` with everything else derived
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Apply `YTDLP_SUPERVISOR_*` overrides from the process environment
    pub fn merge_env_vars(&mut self) {
        self.merge_env_from(|key| std::env::var(key).ok());
    }

    fn merge_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.is_empty());

        if let Some(dir) = var("BASE_DIR") {
            self.base_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var("BIN_DIR") {
            self.bin_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = var("PACKAGES_DIR") {
            self.packages_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = var("TEMP_DIR") {
            self.temp_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = var("INTERPRETER") {
            self.interpreter = Some(PathBuf::from(path));
        }
        if let Some(path) = var("TOOL") {
            self.tool = Some(PathBuf::from(path));
        }
        if let Some(path) = var("FFMPEG") {
            self.ffmpeg = Some(PathBuf::from(path));
        }
        if let Some(ms) = var("POLL_INTERVAL_MS") {
            match ms.parse::<u64>() {
                Ok(value) => self.poll_interval_ms = value,
                Err(_) => tracing::warn!("Ignoring invalid {ENV_PREFIX}POLL_INTERVAL_MS: {ms}"),
            }
        }
    }
}
