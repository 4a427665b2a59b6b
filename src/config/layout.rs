use std::path::{Path, PathBuf};
use std::time::Duration;

use super::SupervisorConfig;
use crate::error::{ErrorCode, Result, SupervisorError};

const INTERPRETER_NAME: &str = "libpython.so";
const FFMPEG_NAME: &str = "libffmpeg.so";
const TOOL_DIR: &str = "yt-dlp";
const TOOL_NAME: &str = "yt-dlp";
const PACKAGES_DIR: &str = "packages";
const PYTHON_PACKAGE: &str = "python";
const FFMPEG_PACKAGE: &str = "ffmpeg";
const ARIA2C_PACKAGE: &str = "aria2c";

/// Every path the supervisor needs, resolved once from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeLayout {
    pub interpreter: PathBuf,
    pub tool: PathBuf,
    pub ffmpeg: PathBuf,
    pub bin_dir: PathBuf,
    /// Colon-joined native library directories of the bundled packages
    pub library_path: String,
    pub cert_file: PathBuf,
    pub python_home: PathBuf,
    pub temp_dir: PathBuf,
    pub poll_interval: Duration,
}

impl RuntimeLayout {
    pub fn from_config(config: &SupervisorConfig) -> Self {
        let base = &config.base_dir;
        let bin_dir = config.bin_dir.clone().unwrap_or_else(|| base.join("bin"));
        let packages = config
            .packages_dir
            .clone()
            .unwrap_or_else(|| base.join(PACKAGES_DIR));

        let python_dir = packages.join(PYTHON_PACKAGE);
        let library_path = [PYTHON_PACKAGE, FFMPEG_PACKAGE, ARIA2C_PACKAGE]
            .iter()
            .map(|pkg| packages.join(pkg).join("usr/lib").display().to_string())
            .collect::<Vec<_>>()
            .join(":");

        Self {
            interpreter: config
                .interpreter
                .clone()
                .unwrap_or_else(|| bin_dir.join(INTERPRETER_NAME)),
            tool: config
                .tool
                .clone()
                .unwrap_or_else(|| base.join(TOOL_DIR).join(TOOL_NAME)),
            ffmpeg: config
                .ffmpeg
                .clone()
                .unwrap_or_else(|| bin_dir.join(FFMPEG_NAME)),
            library_path,
            cert_file: python_dir.join("usr/etc/tls/cert.pem"),
            python_home: python_dir.join("usr"),
            temp_dir: config
                .temp_dir
                .clone()
                .unwrap_or_else(|| std::env::temp_dir().join("ytdlp-supervisor")),
            poll_interval: config.poll_interval(),
            bin_dir,
        }
    }

    /// Check the interpreter and tool exist and create the temp dir
    pub fn prepare(&self) -> Result<()> {
        for path in [&self.interpreter, &self.tool] {
            if !path.exists() {
                return Err(SupervisorError::BinaryMissing { path: path.clone() });
            }
        }
        std::fs::create_dir_all(&self.temp_dir).map_err(|e| {
            SupervisorError::config_with_code(
                ErrorCode::SETUP_IO_ERROR,
                format!("Cannot create temp dir {}", self.temp_dir.display()),
            )
            .with_source(e)
        })?;
        Ok(())
    }

    /// Environment overrides for the tool, given the parent's PATH
    pub fn environment(&self, parent_path: Option<&str>) -> Vec<(String, String)> {
        let path = match parent_path {
            Some(parent) if !parent.is_empty() => {
                format!("{}:{}", parent, self.bin_dir.display())
            }
            _ => self.bin_dir.display().to_string(),
        };
        let home = display(&self.python_home);

        vec![
            ("LD_LIBRARY_PATH".to_string(), self.library_path.clone()),
            ("SSL_CERT_FILE".to_string(), display(&self.cert_file)),
            ("PATH".to_string(), path),
            ("PYTHONHOME".to_string(), home.clone()),
            ("HOME".to_string(), home),
            ("TMPDIR".to_string(), display(&self.temp_dir)),
        ]
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
