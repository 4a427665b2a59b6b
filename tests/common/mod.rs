//! Shared helpers for integration tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use ytdlp_supervisor::SupervisorConfig;

/// A fake yt-dlp: a shell script run with `/bin/sh` as the interpreter
pub struct FakeTool {
    pub dir: TempDir,
    pub script: PathBuf,
}

impl FakeTool {
    pub fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let script = dir.path().join("yt-dlp");
        std::fs::write(&script, body).expect("write fake tool");
        Self { dir, script }
    }

    pub fn base_dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> SupervisorConfig {
        SupervisorConfig {
            interpreter: Some(PathBuf::from("/bin/sh")),
            tool: Some(self.script.clone()),
            temp_dir: Some(self.dir.path().join("tmp")),
            poll_interval_ms: 20,
            ..SupervisorConfig::with_base_dir(self.dir.path())
        }
    }

    /// Write the configuration as TOML and return its path
    pub fn write_config_file(&self) -> PathBuf {
        let path = self.dir.path().join("config.toml");
        let content = format!(
            "base_dir = \"{}\"\ninterpreter = \"/bin/sh\"\ntool = \"{}\"\ntemp_dir = \"{}\"\n",
            self.dir.path().display(),
            self.script.display(),
            self.dir.path().join("tmp").display()
        );
        std::fs::write(&path, content).expect("write config");
        path
    }
}

pub const INFO_SCRIPT: &str = r#"printf '{"id":"abc","title":"Fake video","duration":12.5,"formats":[{"format_id":"18","ext":"mp4"}]}\n'
"#;
